use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use std::sync::Arc;
use tandem_core::{Role, RoomCode};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::room::Room;
use crate::signaling::ConnectionId;

/// How many candidate codes are tried before room creation gives up.
pub const MAX_CODE_ATTEMPTS: usize = 20;

/// In-memory map of live rooms, shared by the HTTP API and the relay.
///
/// Each room's slots are only touched while its map entry is held, so two
/// concurrent `join-room` requests can't both see the same empty slot.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomCode, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a code that no registered room is using right now.
    pub fn create_unique_code(&self) -> Result<RoomCode, RegistryError> {
        self.create_unique_code_with(random_code)
    }

    pub fn create_unique_code_with<F>(&self, mut next: F) -> Result<RoomCode, RegistryError>
    where
        F: FnMut() -> RoomCode,
    {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = next();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
            debug!("Room code {} already taken, retrying", code);
        }
        Err(RegistryError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Allocates a fresh code and registers an empty room under it.
    pub fn create_room(&self) -> Result<RoomCode, RegistryError> {
        self.create_room_with(random_code)
    }

    pub fn create_room_with<F>(&self, mut next: F) -> Result<RoomCode, RegistryError>
    where
        F: FnMut() -> RoomCode,
    {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = next();
            match self.rooms.entry(code.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Room::default());
                    info!("Created room {}", code);
                    return Ok(code);
                }
                Entry::Occupied(_) => debug!("Room code {} already taken, retrying", code),
            }
        }
        Err(RegistryError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Runs `f` on the room for `code`, creating an empty one first if needed.
    ///
    /// The room entry stays locked for the duration of `f`; don't call back
    /// into the registry from inside it.
    pub fn with_room<R>(&self, code: &RoomCode, f: impl FnOnce(&mut Room) -> R) -> R {
        let mut room = self.rooms.entry(code.clone()).or_insert_with(|| {
            info!("Creating new room: {}", code);
            Room::default()
        });
        f(&mut room)
    }

    pub fn peer_of(&self, code: &RoomCode, role: Role) -> Option<ConnectionId> {
        self.rooms.get(code).and_then(|room| room.peer_of(role))
    }

    /// Clears `id` from its slot and returns the remaining peer, if any.
    ///
    /// Rooms are never created here; the caller follows up with
    /// [`Self::release_if_empty`].
    pub fn unbind(&self, code: &RoomCode, role: Role, id: ConnectionId) -> Option<ConnectionId> {
        let mut room = self.rooms.get_mut(code)?;
        room.release(role, id);
        room.peer_of(role).filter(|peer| *peer != id)
    }

    /// Drops the room if both slots are empty.
    pub fn release_if_empty(&self, code: &RoomCode) -> bool {
        let removed = self.rooms.remove_if(code, |_, room| room.is_empty()).is_some();
        if removed {
            info!("Room {} is empty, removed", code);
        }
        removed
    }

    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn get(&self, code: &RoomCode) -> Option<Room> {
        self.rooms.get(code).map(|room| room.value().clone())
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

fn random_code() -> RoomCode {
    let mut rng = rand::thread_rng();
    RoomCode::generate(|bound| rng.gen_range(0..bound))
}
