mod coordinator;
mod error;
mod media;
mod session;
mod store;

pub use coordinator::RoomCoordinator;
pub use error::{CaptureError, NegotiationError, SessionError, StoreError};
pub use media::{
    LocalMedia, MediaConstraints, MediaGateway, PeerConnection, PeerEvent, StreamHandle,
    TrackHandle, TrackKind, TransportState,
};
pub use session::{CallState, PeerSession, SessionCommand, SessionController, SessionState};
pub use store::{RoomHandle, SignalingStore, StoreEvent, SubscriptionId};
