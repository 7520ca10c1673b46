use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("could not generate a unique room code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
}

/// The requested slot, or the whole room, belongs to other connections.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("room is full")]
pub struct RoomFull;
