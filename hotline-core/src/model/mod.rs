mod candidate;
mod description;
mod ice;
mod role;
mod room;

pub use candidate::{CandidateLane, IceCandidate};
pub use description::{SdpType, SessionDescription};
pub use ice::IceServerConfig;
pub use role::CallRole;
pub use room::{RoomDocument, RoomId};
