use hotline_core::{CandidateLane, IceCandidate, RoomDocument, RoomId, SessionDescription};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::error::StoreError;
use crate::store::signaling_store::{SignalingStore, StoreEvent, SubscriptionId};

/// Per-room facade over the injected store.
///
/// This is the entire store surface a `PeerSession` touches. Every
/// subscription taken out through the handle is tracked so `unsubscribe_all`
/// can cancel them as a unit during teardown.
#[derive(Clone)]
pub struct RoomHandle {
    store: Arc<dyn SignalingStore>,
    room_id: RoomId,
    subscriptions: Arc<Mutex<Vec<SubscriptionId>>>,
}

impl RoomHandle {
    pub fn new(store: Arc<dyn SignalingStore>, room_id: RoomId) -> Self {
        Self {
            store,
            room_id,
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.room_id
    }

    pub async fn read_once(&self) -> Result<Option<RoomDocument>, StoreError> {
        self.store.read(&self.room_id).await
    }

    pub async fn write_offer(&self, description: SessionDescription) -> Result<(), StoreError> {
        self.store.write_offer(&self.room_id, description).await
    }

    pub async fn write_answer(&self, description: SessionDescription) -> Result<(), StoreError> {
        self.store.write_answer(&self.room_id, description).await
    }

    pub async fn push_candidate(
        &self,
        lane: CandidateLane,
        candidate: IceCandidate,
    ) -> Result<(), StoreError> {
        self.store
            .push_candidate(&self.room_id, lane, candidate)
            .await
    }

    pub async fn subscribe_value(&self, tx: mpsc::Sender<StoreEvent>) -> Result<(), StoreError> {
        let id = self.store.subscribe_value(&self.room_id, tx).await?;
        self.subscriptions.lock().await.push(id);
        Ok(())
    }

    pub async fn subscribe_children(
        &self,
        lane: CandidateLane,
        tx: mpsc::Sender<StoreEvent>,
    ) -> Result<(), StoreError> {
        let id = self.store.subscribe_children(&self.room_id, lane, tx).await?;
        self.subscriptions.lock().await.push(id);
        Ok(())
    }

    pub async fn delete(&self) -> Result<(), StoreError> {
        self.store.delete(&self.room_id).await
    }

    /// Cancel every subscription taken out through this handle. Idempotent.
    pub async fn unsubscribe_all(&self) {
        let drained: Vec<SubscriptionId> = self.subscriptions.lock().await.drain(..).collect();
        for id in drained {
            debug!(room = %self.room_id, subscription = id.0, "unsubscribing");
            self.store.unsubscribe(id).await;
        }
    }
}
