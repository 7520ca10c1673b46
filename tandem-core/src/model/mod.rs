mod role;
mod room_code;
mod session;
mod signaling;

pub use role::{PeerRef, Role};
pub use room_code::RoomCode;
pub use session::{DEFAULT_STUN_ADDR, IceCandidate, IceServerConfig, SdpType, SessionDescription};
pub use signaling::{ErrorPayload, PeerJoinedPayload, RolePayload, SignalKind, SignalMessage};
