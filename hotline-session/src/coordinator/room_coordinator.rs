use hotline_core::{CallRole, IceServerConfig, RoomId, SessionDescription};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::error::SessionError;
use crate::media::MediaGateway;
use crate::session::{PeerSession, SessionController, SessionState};
use crate::store::{RoomHandle, SignalingStore};

const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Creates or joins rooms and wires each session to the store paths that
/// match its role. Both collaborators are injected; nothing in the crate
/// reaches for an ambient store or gateway.
#[derive(Clone)]
pub struct RoomCoordinator {
    store: Arc<dyn SignalingStore>,
    gateway: Arc<dyn MediaGateway>,
    ice_servers: Vec<IceServerConfig>,
}

impl RoomCoordinator {
    pub fn new(
        store: Arc<dyn SignalingStore>,
        gateway: Arc<dyn MediaGateway>,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        Self {
            store,
            gateway,
            ice_servers,
        }
    }

    /// Allocate a fresh room and start the offering side of a call.
    pub async fn create_room(&self) -> Result<SessionController, SessionError> {
        let room_id = self.store.create().await?;
        info!(room = %room_id, "room created");
        let room = RoomHandle::new(self.store.clone(), room_id);
        Ok(self.launch(CallRole::Offerer, room, None))
    }

    /// Join an existing room as the answering side.
    ///
    /// Blank ids are rejected before any store traffic. A missing room, or a
    /// room whose offer has not been written yet, yields `RoomNotFound`
    /// without a single write being performed.
    pub async fn join_room(&self, room_id: &str) -> Result<SessionController, SessionError> {
        let trimmed = room_id.trim();
        if trimmed.is_empty() {
            return Err(SessionError::RoomNotFound(room_id.to_string()));
        }

        let room_id = RoomId::from(trimmed);
        let offer = self
            .store
            .read(&room_id)
            .await?
            .and_then(|document| document.offer)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;

        info!(room = %room_id, "joining room");
        let room = RoomHandle::new(self.store.clone(), room_id);
        Ok(self.launch(CallRole::Answerer, room, Some(offer)))
    }

    fn launch(
        &self,
        role: CallRole,
        room: RoomHandle,
        pending_offer: Option<SessionDescription>,
    ) -> SessionController {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::new(room.id().clone()));

        let session = PeerSession::new(
            role,
            room,
            pending_offer,
            self.gateway.clone(),
            self.ice_servers.clone(),
            command_rx,
            state_tx,
        );
        tokio::spawn(session.run());

        SessionController::new(command_tx, state_rx)
    }
}
