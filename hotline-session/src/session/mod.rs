mod controller;
mod peer_session;
mod session_command;
mod session_state;

pub use controller::SessionController;
pub use peer_session::PeerSession;
pub use session_command::SessionCommand;
pub use session_state::{CallState, SessionState};
