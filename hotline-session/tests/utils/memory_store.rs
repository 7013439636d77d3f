use async_trait::async_trait;
use dashmap::DashMap;
use hotline_core::{CandidateLane, IceCandidate, RoomDocument, RoomId, SessionDescription};
use hotline_session::{SignalingStore, StoreError, StoreEvent, SubscriptionId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
struct RoomRecord {
    document: RoomDocument,
    caller_candidates: Vec<IceCandidate>,
    callee_candidates: Vec<IceCandidate>,
}

impl RoomRecord {
    fn lane(&self, lane: CandidateLane) -> &Vec<IceCandidate> {
        match lane {
            CandidateLane::Caller => &self.caller_candidates,
            CandidateLane::Callee => &self.callee_candidates,
        }
    }

    fn lane_mut(&mut self, lane: CandidateLane) -> &mut Vec<IceCandidate> {
        match lane {
            CandidateLane::Caller => &mut self.caller_candidates,
            CandidateLane::Callee => &mut self.callee_candidates,
        }
    }
}

enum SubscriptionKind {
    Value(RoomId),
    Children(RoomId, CandidateLane),
}

struct Subscription {
    kind: SubscriptionKind,
    tx: mpsc::Sender<StoreEvent>,
}

/// Deterministic in-memory `SignalingStore`.
///
/// Enforces the store contract the sessions rely on: offer/answer immutable
/// once written, writes against deleted rooms rejected, candidate replay in
/// insertion order, value listeners fired on every room mutation. Counts
/// writes and live subscriptions for the cleanup assertions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    rooms: DashMap<RoomId, RoomRecord>,
    subscriptions: DashMap<u64, Subscription>,
    next_subscription: AtomicU64,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.inner.subscriptions.len()
    }

    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub fn room_exists(&self, room: &RoomId) -> bool {
        self.inner.rooms.contains_key(room)
    }

    pub fn document(&self, room: &RoomId) -> Option<RoomDocument> {
        self.inner.rooms.get(room).map(|record| record.document.clone())
    }

    pub fn candidates(&self, room: &RoomId, lane: CandidateLane) -> Vec<IceCandidate> {
        self.inner
            .rooms
            .get(room)
            .map(|record| record.lane(lane).clone())
            .unwrap_or_default()
    }

    /// Poll until a lane holds at least `count` candidates.
    pub async fn wait_for_candidates(
        &self,
        room: &RoomId,
        lane: CandidateLane,
        count: usize,
        timeout_ms: u64,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        while tokio::time::Instant::now() < deadline {
            if self.candidates(room, lane).len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Seed a room the way a remote offerer would have left it.
    pub fn seed_room(&self, offer: SessionDescription) -> RoomId {
        let id = RoomId::generate();
        let record = RoomRecord {
            document: RoomDocument {
                offer: Some(offer),
                answer: None,
            },
            ..Default::default()
        };
        self.inner.rooms.insert(id.clone(), record);
        id
    }

    fn count_write(&self) {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
    }

    async fn notify_value(&self, room: &RoomId) {
        let document = match self.inner.rooms.get(room) {
            Some(record) => record.document.clone(),
            None => return,
        };
        let targets: Vec<mpsc::Sender<StoreEvent>> = self
            .inner
            .subscriptions
            .iter()
            .filter(|entry| matches!(&entry.kind, SubscriptionKind::Value(id) if id == room))
            .map(|entry| entry.tx.clone())
            .collect();
        for tx in targets {
            let _ = tx.send(StoreEvent::Snapshot(document.clone())).await;
        }
    }

    async fn notify_children(&self, room: &RoomId, lane: CandidateLane, candidate: &IceCandidate) {
        let targets: Vec<mpsc::Sender<StoreEvent>> = self
            .inner
            .subscriptions
            .iter()
            .filter(|entry| {
                matches!(&entry.kind, SubscriptionKind::Children(id, l) if id == room && *l == lane)
            })
            .map(|entry| entry.tx.clone())
            .collect();
        for tx in targets {
            let _ = tx
                .send(StoreEvent::CandidateAdded(lane, candidate.clone()))
                .await;
        }
    }

    fn register(&self, subscription: Subscription) -> SubscriptionId {
        let id = self.inner.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.inner.subscriptions.insert(id, subscription);
        SubscriptionId(id)
    }
}

#[async_trait]
impl SignalingStore for MemoryStore {
    async fn create(&self) -> Result<RoomId, StoreError> {
        let id = RoomId::generate();
        self.inner.rooms.insert(id.clone(), RoomRecord::default());
        self.count_write();
        Ok(id)
    }

    async fn read(&self, room: &RoomId) -> Result<Option<RoomDocument>, StoreError> {
        Ok(self.document(room))
    }

    async fn write_offer(
        &self,
        room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), StoreError> {
        {
            let mut record = self
                .inner
                .rooms
                .get_mut(room)
                .ok_or_else(|| StoreError::RoomGone(room.clone()))?;
            if record.document.offer.is_some() {
                return Err(StoreError::AlreadyWritten("offer"));
            }
            record.document.offer = Some(description);
        }
        self.count_write();
        self.notify_value(room).await;
        Ok(())
    }

    async fn write_answer(
        &self,
        room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), StoreError> {
        {
            let mut record = self
                .inner
                .rooms
                .get_mut(room)
                .ok_or_else(|| StoreError::RoomGone(room.clone()))?;
            if record.document.answer.is_some() {
                return Err(StoreError::AlreadyWritten("answer"));
            }
            record.document.answer = Some(description);
        }
        self.count_write();
        self.notify_value(room).await;
        Ok(())
    }

    async fn push_candidate(
        &self,
        room: &RoomId,
        lane: CandidateLane,
        candidate: IceCandidate,
    ) -> Result<(), StoreError> {
        {
            let mut record = self
                .inner
                .rooms
                .get_mut(room)
                .ok_or_else(|| StoreError::RoomGone(room.clone()))?;
            record.lane_mut(lane).push(candidate.clone());
        }
        self.count_write();
        self.notify_children(room, lane, &candidate).await;
        self.notify_value(room).await;
        Ok(())
    }

    async fn delete(&self, room: &RoomId) -> Result<(), StoreError> {
        self.inner
            .rooms
            .remove(room)
            .ok_or_else(|| StoreError::RoomGone(room.clone()))?;
        self.count_write();
        Ok(())
    }

    async fn subscribe_value(
        &self,
        room: &RoomId,
        tx: mpsc::Sender<StoreEvent>,
    ) -> Result<SubscriptionId, StoreError> {
        let document = self
            .document(room)
            .ok_or_else(|| StoreError::RoomGone(room.clone()))?;
        let id = self.register(Subscription {
            kind: SubscriptionKind::Value(room.clone()),
            tx: tx.clone(),
        });
        let _ = tx.send(StoreEvent::Snapshot(document)).await;
        Ok(id)
    }

    async fn subscribe_children(
        &self,
        room: &RoomId,
        lane: CandidateLane,
        tx: mpsc::Sender<StoreEvent>,
    ) -> Result<SubscriptionId, StoreError> {
        let existing = {
            let record = self
                .inner
                .rooms
                .get(room)
                .ok_or_else(|| StoreError::RoomGone(room.clone()))?;
            record.lane(lane).clone()
        };
        let id = self.register(Subscription {
            kind: SubscriptionKind::Children(room.clone(), lane),
            tx: tx.clone(),
        });
        for candidate in existing {
            let _ = tx.send(StoreEvent::CandidateAdded(lane, candidate)).await;
        }
        Ok(id)
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) {
        self.inner.subscriptions.remove(&subscription.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(tag: &str) -> IceCandidate {
        IceCandidate {
            candidate: tag.to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        }
    }

    #[tokio::test]
    async fn test_offer_is_immutable() {
        let store = MemoryStore::new();
        let room = store.create().await.unwrap();

        store
            .write_offer(&room, SessionDescription::offer("first"))
            .await
            .unwrap();
        let err = store
            .write_offer(&room, SessionDescription::offer("second"))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::AlreadyWritten("offer"));
    }

    #[tokio::test]
    async fn test_writes_rejected_after_delete() {
        let store = MemoryStore::new();
        let room = store.create().await.unwrap();
        store.delete(&room).await.unwrap();

        let err = store
            .push_candidate(&room, CandidateLane::Caller, candidate("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RoomGone(_)));
    }

    #[tokio::test]
    async fn test_children_replayed_in_insertion_order() {
        let store = MemoryStore::new();
        let room = store.create().await.unwrap();
        for tag in ["a", "b", "c"] {
            store
                .push_candidate(&room, CandidateLane::Callee, candidate(tag))
                .await
                .unwrap();
        }

        let (tx, mut rx) = mpsc::channel(16);
        store
            .subscribe_children(&room, CandidateLane::Callee, tx)
            .await
            .unwrap();

        for expected in ["a", "b", "c"] {
            match rx.recv().await.unwrap() {
                StoreEvent::CandidateAdded(lane, received) => {
                    assert_eq!(lane, CandidateLane::Callee);
                    assert_eq!(received.candidate, expected);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_value_subscription_sees_initial_and_updated_snapshots() {
        let store = MemoryStore::new();
        let room = store.create().await.unwrap();
        store
            .write_offer(&room, SessionDescription::offer("x"))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        store.subscribe_value(&room, tx).await.unwrap();

        match rx.recv().await.unwrap() {
            StoreEvent::Snapshot(document) => assert!(document.answer.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }

        store
            .write_answer(&room, SessionDescription::answer("y"))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            StoreEvent::Snapshot(document) => {
                assert_eq!(document.answer.unwrap().sdp, "y");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
