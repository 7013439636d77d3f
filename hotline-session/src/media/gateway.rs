use async_trait::async_trait;
use hotline_core::{IceCandidate, IceServerConfig, SessionDescription};
use tokio::sync::mpsc;

use crate::error::{CaptureError, NegotiationError};

/// Opaque reference to a media stream, handed to the presentation layer for
/// rendering. The session never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Opaque reference to one captured track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHandle {
    pub id: String,
    pub kind: TrackKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub fn audio_video() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Transport-level connectivity as reported by the underlying peer
/// connection. `Disconnected`/`Closed` is how the non-ending party learns the
/// call is over; the store is not consulted for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events emitted by a peer connection, delivered through the channel given
/// to `MediaGateway::create_peer_connection`. The stream ends when the
/// connection is closed.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A locally gathered candidate, ready to be published.
    CandidateGathered(IceCandidate),
    /// A live remote media stream became available.
    RemoteStream(StreamHandle),
    ConnectionState(TransportState),
}

/// Locally captured audio/video. Toggles are synchronous and idempotent.
pub trait LocalMedia: Send + Sync {
    fn stream(&self) -> StreamHandle;

    fn tracks(&self) -> Vec<TrackHandle>;

    fn set_audio_enabled(&self, enabled: bool);

    fn audio_enabled(&self) -> bool;

    /// Whether the capture device can flip between cameras. When `false`,
    /// `switch_camera` is a no-op.
    fn supports_camera_switch(&self) -> bool;

    fn switch_camera(&self);

    /// Stop all capture tracks. Idempotent.
    fn stop(&self);
}

/// One underlying peer connection. Transport mechanics (codec negotiation,
/// NAT traversal) live entirely behind this trait.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn add_track(&self, track: TrackHandle) -> Result<(), NegotiationError>;

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError>;

    /// Close the connection and end its event stream. Idempotent.
    async fn close(&self);
}

/// External capability providing capture and peer-connection primitives.
#[async_trait]
pub trait MediaGateway: Send + Sync {
    /// Acquire local capture. Permission-gated and one-shot: a failure is
    /// terminal for the session, never retried.
    async fn acquire_local_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Box<dyn LocalMedia>, CaptureError>;

    async fn create_peer_connection(
        &self,
        ice_servers: Vec<IceServerConfig>,
        event_tx: mpsc::Sender<PeerEvent>,
    ) -> Result<Box<dyn PeerConnection>, NegotiationError>;
}
