mod gateway;

pub use gateway::{
    LocalMedia, MediaConstraints, MediaGateway, PeerConnection, PeerEvent, StreamHandle,
    TrackHandle, TrackKind, TransportState,
};
