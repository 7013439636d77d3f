use hotline_core::RoomId;

use crate::media::StreamHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Initializing,
    Negotiating,
    Connected,
    Ended,
    Error,
}

/// Observable session snapshot consumed by the presentation layer. A fresh
/// copy is published on every observable mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub room_id: RoomId,
    pub call_state: CallState,
    pub local_stream: Option<StreamHandle>,
    pub remote_stream: Option<StreamHandle>,
    pub is_muted: bool,
    pub is_front_camera: bool,
    /// Human-readable failure message, set together with `CallState::Error`.
    pub error: Option<String>,
}

impl SessionState {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            call_state: CallState::Initializing,
            local_stream: None,
            remote_stream: None,
            is_muted: false,
            is_front_camera: true,
            error: None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(
            self.call_state,
            CallState::Initializing | CallState::Negotiating | CallState::Connected
        )
    }
}
