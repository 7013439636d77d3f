use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::session::session_command::SessionCommand;
use crate::session::session_state::SessionState;

/// Presentation-facing handle to a running session.
///
/// Commands are fire-and-forget; once the session has finished they are
/// silently dropped. Dropping the last controller clone ends the call.
#[derive(Clone, Debug)]
pub struct SessionController {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
}

impl SessionController {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        state: watch::Receiver<SessionState>,
    ) -> Self {
        Self { commands, state }
    }

    /// Latest published session snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch channel for state changes, for callers that want to await them.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub async fn toggle_mute(&self) {
        self.send(SessionCommand::ToggleMute).await;
    }

    pub async fn switch_camera(&self) {
        self.send(SessionCommand::SwitchCamera).await;
    }

    pub async fn end_call(&self) {
        self.send(SessionCommand::EndCall).await;
    }

    async fn send(&self, command: SessionCommand) {
        if self.commands.send(command).await.is_err() {
            debug!("session already finished, command dropped");
        }
    }
}
