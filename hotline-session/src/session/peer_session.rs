use hotline_core::{CallRole, IceServerConfig, SessionDescription};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::error::{NegotiationError, SessionError, StoreError};
use crate::media::{
    LocalMedia, MediaConstraints, MediaGateway, PeerConnection, PeerEvent, StreamHandle,
    TransportState,
};
use crate::session::session_command::SessionCommand;
use crate::session::session_state::{CallState, SessionState};
use crate::store::{RoomHandle, StoreEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything the negotiation phase produces.
struct Negotiated {
    connection: Box<dyn PeerConnection>,
    media: Box<dyn LocalMedia>,
}

/// One signaling exchange and one underlying peer connection, driven as a
/// single event loop.
///
/// Store subscription callbacks, gateway callbacks and user commands all
/// funnel into this loop as messages, so no two mutations of session state
/// can race each other.
pub struct PeerSession {
    role: CallRole,
    room: RoomHandle,
    gateway: Arc<dyn MediaGateway>,
    ice_servers: Vec<IceServerConfig>,
    /// Offer read by the coordinator's point read; answerer only.
    pending_offer: Option<SessionDescription>,
    command_rx: mpsc::Receiver<SessionCommand>,
    state_tx: watch::Sender<SessionState>,
    state: SessionState,
    remote_applied: bool,
    ending: bool,
}

impl PeerSession {
    pub fn new(
        role: CallRole,
        room: RoomHandle,
        pending_offer: Option<SessionDescription>,
        gateway: Arc<dyn MediaGateway>,
        ice_servers: Vec<IceServerConfig>,
        command_rx: mpsc::Receiver<SessionCommand>,
        state_tx: watch::Sender<SessionState>,
    ) -> Self {
        let state = SessionState::new(room.id().clone());
        Self {
            role,
            room,
            gateway,
            ice_servers,
            pending_offer,
            command_rx,
            state_tx,
            state,
            remote_applied: false,
            ending: false,
        }
    }

    pub async fn run(mut self) {
        info!(room = %self.room.id(), role = ?self.role, "session started");
        self.publish();

        let (peer_tx, peer_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let (setup_tx, setup_rx) = oneshot::channel();
        {
            let role = self.role;
            let room = self.room.clone();
            let gateway = self.gateway.clone();
            let ice_servers = self.ice_servers.clone();
            let pending_offer = self.pending_offer.take();
            let peer_tx = peer_tx.clone();
            tokio::spawn(async move {
                let result =
                    negotiate(role, room, gateway, ice_servers, pending_offer, peer_tx).await;
                let _ = setup_tx.send(result);
            });
        }

        let Some(negotiated) = self.wait_for_setup(setup_rx).await else {
            return;
        };

        self.drive(negotiated, peer_rx, peer_tx).await;

        info!(room = %self.room.id(), "session finished");
    }

    /// Drain commands while negotiation is in flight. An end issued here does
    /// not cancel the in-flight work; its result is disposed of when it
    /// lands, instead of being applied.
    async fn wait_for_setup(
        &mut self,
        mut setup_rx: oneshot::Receiver<Result<Negotiated, SessionError>>,
    ) -> Option<Negotiated> {
        loop {
            tokio::select! {
                result = &mut setup_rx => {
                    let result = result.unwrap_or_else(|_| {
                        Err(NegotiationError("negotiation task dropped".into()).into())
                    });
                    match result {
                        Ok(negotiated) if !self.ending => return Some(negotiated),
                        Ok(negotiated) => {
                            debug!(room = %self.room.id(), "discarding negotiation result after end");
                            negotiated.connection.close().await;
                            negotiated.media.stop();
                            self.cleanup_room().await;
                            self.finish(CallState::Ended);
                            return None;
                        }
                        Err(err) => {
                            self.cleanup_room().await;
                            if self.ending {
                                self.finish(CallState::Ended);
                            } else {
                                error!(room = %self.room.id(), %err, "negotiation failed");
                                self.state.error = Some(err.to_string());
                                self.finish(CallState::Error);
                            }
                            return None;
                        }
                    }
                }
                command = self.command_rx.recv(), if !self.ending => {
                    match command {
                        Some(SessionCommand::EndCall) | None => {
                            debug!(room = %self.room.id(), "end requested during negotiation");
                            self.ending = true;
                        }
                        // No media to act on yet.
                        Some(command) => {
                            debug!(?command, "command ignored before negotiation completes");
                        }
                    }
                }
            }
        }
    }

    async fn drive(
        &mut self,
        negotiated: Negotiated,
        mut peer_rx: mpsc::Receiver<PeerEvent>,
        _peer_guard: mpsc::Sender<PeerEvent>,
    ) {
        let Negotiated { connection, media } = negotiated;

        // The answerer applied the remote offer during negotiation.
        self.remote_applied = self.role == CallRole::Answerer;
        self.state.call_state = CallState::Negotiating;
        self.state.local_stream = Some(media.stream());
        self.state.is_muted = !media.audio_enabled();
        self.publish();

        let (store_tx, mut store_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let _store_guard = store_tx.clone();
        if let Err(err) = self.subscribe(store_tx).await {
            self.fail(err.into(), connection.as_ref(), media.as_ref()).await;
            return;
        }

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(SessionCommand::ToggleMute) => self.toggle_mute(media.as_ref()),
                        Some(SessionCommand::SwitchCamera) => self.switch_camera(media.as_ref()),
                        Some(SessionCommand::EndCall) | None => {
                            self.shutdown(connection.as_ref(), media.as_ref(), CallState::Ended)
                                .await;
                            return;
                        }
                    }
                }
                event = store_rx.recv() => {
                    // The guard sender keeps this arm from yielding `None`.
                    let Some(event) = event else { continue };
                    if let Err(err) = self.on_store_event(event, connection.as_ref()).await {
                        self.fail(err, connection.as_ref(), media.as_ref()).await;
                        return;
                    }
                }
                event = peer_rx.recv() => {
                    let Some(event) = event else { continue };
                    match event {
                        PeerEvent::RemoteStream(stream) => self.on_remote_stream(stream),
                        PeerEvent::ConnectionState(state) => match state {
                            TransportState::Disconnected | TransportState::Closed => {
                                info!(room = %self.room.id(), ?state, "remote side closed the call");
                                self.shutdown(connection.as_ref(), media.as_ref(), CallState::Ended)
                                    .await;
                                return;
                            }
                            TransportState::Failed => {
                                self.fail(
                                    NegotiationError("transport failed".into()).into(),
                                    connection.as_ref(),
                                    media.as_ref(),
                                )
                                .await;
                                return;
                            }
                            _ => debug!(room = %self.room.id(), ?state, "transport state"),
                        },
                        // Gathered candidates are published by the pump and
                        // never reach the loop.
                        PeerEvent::CandidateGathered(_) => {}
                    }
                }
            }
        }
    }

    async fn subscribe(&self, store_tx: mpsc::Sender<StoreEvent>) -> Result<(), StoreError> {
        match self.role {
            CallRole::Offerer => {
                self.room.subscribe_value(store_tx.clone()).await?;
                self.room
                    .subscribe_children(self.role.remote_lane(), store_tx)
                    .await?;
            }
            CallRole::Answerer => {
                self.room
                    .subscribe_children(self.role.remote_lane(), store_tx)
                    .await?;
            }
        }
        Ok(())
    }

    async fn on_store_event(
        &mut self,
        event: StoreEvent,
        connection: &dyn PeerConnection,
    ) -> Result<(), SessionError> {
        match event {
            StoreEvent::Snapshot(document) => {
                if self.remote_applied {
                    return Ok(());
                }
                let Some(answer) = document.answer else {
                    return Ok(());
                };
                info!(room = %self.room.id(), "answer received");
                connection.set_remote_description(answer).await?;
                self.remote_applied = true;
            }
            StoreEvent::CandidateAdded(lane, candidate) => {
                debug!(room = %self.room.id(), lane = lane.field_name(), "applying remote candidate");
                connection.add_ice_candidate(candidate).await?;
            }
        }
        Ok(())
    }

    fn on_remote_stream(&mut self, stream: StreamHandle) {
        // Only the first reported stream is captured.
        if self.state.remote_stream.is_some() {
            return;
        }
        info!(room = %self.room.id(), "remote stream available");
        self.state.remote_stream = Some(stream);
        if self.state.call_state == CallState::Negotiating {
            self.state.call_state = CallState::Connected;
        }
        self.publish();
    }

    fn toggle_mute(&mut self, media: &dyn LocalMedia) {
        let muted = !self.state.is_muted;
        media.set_audio_enabled(!muted);
        self.state.is_muted = muted;
        debug!(room = %self.room.id(), muted, "mute toggled");
        self.publish();
    }

    fn switch_camera(&mut self, media: &dyn LocalMedia) {
        if !media.supports_camera_switch() {
            debug!(room = %self.room.id(), "camera switch unsupported, ignoring");
            return;
        }
        media.switch_camera();
        self.state.is_front_camera = !self.state.is_front_camera;
        self.publish();
    }

    async fn fail(
        &mut self,
        err: SessionError,
        connection: &dyn PeerConnection,
        media: &dyn LocalMedia,
    ) {
        error!(room = %self.room.id(), %err, "session error");
        self.state.error = Some(err.to_string());
        self.shutdown(connection, media, CallState::Error).await;
    }

    /// Teardown in fixed order, every step attempted even if an earlier one
    /// fails: close the connection, release the room, stop capture, cancel
    /// subscriptions.
    async fn shutdown(
        &mut self,
        connection: &dyn PeerConnection,
        media: &dyn LocalMedia,
        terminal: CallState,
    ) {
        info!(room = %self.room.id(), ?terminal, "session shutting down");
        connection.close().await;
        if self.role == CallRole::Offerer {
            if let Err(err) = self.room.delete().await {
                warn!(room = %self.room.id(), %err, "room deletion failed");
            }
        }
        media.stop();
        self.room.unsubscribe_all().await;
        self.finish(terminal);
    }

    /// Store-side teardown for sessions that never got a connection: the
    /// room's creator deletes it, the answerer only walks away.
    async fn cleanup_room(&self) {
        if self.role == CallRole::Offerer {
            if let Err(err) = self.room.delete().await {
                warn!(room = %self.room.id(), %err, "room deletion failed");
            }
        }
        self.room.unsubscribe_all().await;
    }

    fn finish(&mut self, terminal: CallState) {
        self.state.call_state = terminal;
        self.state.local_stream = None;
        self.state.remote_stream = None;
        self.publish();
    }

    fn publish(&self) {
        let _ = self.state_tx.send(self.state.clone());
    }
}

async fn negotiate(
    role: CallRole,
    room: RoomHandle,
    gateway: Arc<dyn MediaGateway>,
    ice_servers: Vec<IceServerConfig>,
    pending_offer: Option<SessionDescription>,
    peer_tx: mpsc::Sender<PeerEvent>,
) -> Result<Negotiated, SessionError> {
    let media = gateway
        .acquire_local_media(MediaConstraints::audio_video())
        .await?;

    let (gateway_tx, gateway_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let connection = match gateway.create_peer_connection(ice_servers, gateway_tx).await {
        Ok(connection) => connection,
        Err(err) => {
            media.stop();
            return Err(err.into());
        }
    };

    spawn_candidate_pump(gateway_rx, room.clone(), role, peer_tx);

    let result =
        exchange_descriptions(role, &room, connection.as_ref(), media.as_ref(), pending_offer)
            .await;
    match result {
        Ok(()) => Ok(Negotiated { connection, media }),
        Err(err) => {
            connection.close().await;
            media.stop();
            Err(err)
        }
    }
}

async fn exchange_descriptions(
    role: CallRole,
    room: &RoomHandle,
    connection: &dyn PeerConnection,
    media: &dyn LocalMedia,
    pending_offer: Option<SessionDescription>,
) -> Result<(), SessionError> {
    for track in media.tracks() {
        connection.add_track(track).await?;
    }
    match role {
        CallRole::Offerer => {
            let offer = connection.create_offer().await?;
            connection.set_local_description(offer.clone()).await?;
            room.write_offer(offer).await?;
        }
        CallRole::Answerer => {
            let offer =
                pending_offer.ok_or_else(|| SessionError::RoomNotFound(room.id().to_string()))?;
            connection.set_remote_description(offer).await?;
            let answer = connection.create_answer().await?;
            connection.set_local_description(answer.clone()).await?;
            room.write_answer(answer).await?;
        }
    }
    Ok(())
}

/// Publishes locally gathered candidates straight into the session's own
/// lane and forwards the remaining gateway events into the session loop.
/// Candidate publication is fire-and-forget relative to the rest of
/// negotiation; the task exits when the closed connection drops its sender.
fn spawn_candidate_pump(
    mut gateway_rx: mpsc::Receiver<PeerEvent>,
    room: RoomHandle,
    role: CallRole,
    peer_tx: mpsc::Sender<PeerEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = gateway_rx.recv().await {
            match event {
                PeerEvent::CandidateGathered(candidate) => {
                    if let Err(err) = room.push_candidate(role.local_lane(), candidate).await {
                        // Expected once the room is deleted at call end.
                        debug!(room = %room.id(), %err, "candidate publish dropped");
                    }
                }
                other => {
                    if peer_tx.send(other).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}
