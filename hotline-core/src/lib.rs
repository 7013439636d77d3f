pub mod model;

pub use model::{
    CallRole, CandidateLane, IceCandidate, IceServerConfig, RoomDocument, RoomId, SdpType,
    SessionDescription,
};
