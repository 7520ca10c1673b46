pub mod api;
pub mod config;
pub mod error;
pub mod room;
pub mod server;
pub mod signaling;

pub use api::{AppState, router};
pub use config::ServerConfig;
pub use error::{RegistryError, RoomFull};
pub use room::*;
pub use server::Server;
pub use signaling::*;
