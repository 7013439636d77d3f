use serde::{Deserialize, Serialize};

/// Connectivity path descriptor, forwarded verbatim between the media gateway
/// and the signaling store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

/// The two append-only candidate collections of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateLane {
    Caller,
    Callee,
}

impl CandidateLane {
    /// Field name of the collection inside the room document.
    pub fn field_name(self) -> &'static str {
        match self {
            CandidateLane::Caller => "callerCandidates",
            CandidateLane::Callee => "calleeCandidates",
        }
    }
}
