use crate::model::candidate::CandidateLane;

/// Which side of the signaling exchange a session drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    Offerer,
    Answerer,
}

impl CallRole {
    /// Lane this role publishes its own gathered candidates into.
    pub fn local_lane(self) -> CandidateLane {
        match self {
            CallRole::Offerer => CandidateLane::Caller,
            CallRole::Answerer => CandidateLane::Callee,
        }
    }

    /// Lane this role consumes remote candidates from.
    pub fn remote_lane(self) -> CandidateLane {
        match self {
            CallRole::Offerer => CandidateLane::Callee,
            CallRole::Answerer => CandidateLane::Caller,
        }
    }
}
