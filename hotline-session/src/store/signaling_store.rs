use async_trait::async_trait;
use hotline_core::{CandidateLane, IceCandidate, RoomDocument, RoomId, SessionDescription};
use tokio::sync::mpsc;

use crate::error::StoreError;

/// Handle for one active subscription, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Events delivered by store subscriptions.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Current value of the room document. Delivered once on subscription and
    /// again after every mutation of the room.
    Snapshot(RoomDocument),
    /// A candidate was appended to the given lane. Existing children are
    /// replayed in insertion order before live insertions are delivered.
    CandidateAdded(CandidateLane, IceCandidate),
}

/// Contract consumed from the ordered document store that relays signaling
/// artifacts between the two peers.
///
/// Implementations must preserve write order within a single lane when
/// delivering `CandidateAdded` events; no ordering is assumed across lanes or
/// between the snapshot and child streams.
#[async_trait]
pub trait SignalingStore: Send + Sync {
    /// Allocate a new, empty room and return its store-assigned id.
    async fn create(&self) -> Result<RoomId, StoreError>;

    /// Point read of a room document. `None` if the room does not exist.
    async fn read(&self, room: &RoomId) -> Result<Option<RoomDocument>, StoreError>;

    /// Write the room's offer. Fails if already written.
    async fn write_offer(
        &self,
        room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), StoreError>;

    /// Write the room's answer. Fails if already written.
    async fn write_answer(
        &self,
        room: &RoomId,
        description: SessionDescription,
    ) -> Result<(), StoreError>;

    /// Append a candidate to one of the room's lanes.
    async fn push_candidate(
        &self,
        room: &RoomId,
        lane: CandidateLane,
        candidate: IceCandidate,
    ) -> Result<(), StoreError>;

    /// Delete the room. Terminal: all further writes against the id fail.
    async fn delete(&self, room: &RoomId) -> Result<(), StoreError>;

    /// Subscribe to value snapshots of the room document.
    async fn subscribe_value(
        &self,
        room: &RoomId,
        tx: mpsc::Sender<StoreEvent>,
    ) -> Result<SubscriptionId, StoreError>;

    /// Subscribe to child insertions of one candidate lane.
    async fn subscribe_children(
        &self,
        room: &RoomId,
        lane: CandidateLane,
        tx: mpsc::Sender<StoreEvent>,
    ) -> Result<SubscriptionId, StoreError>;

    /// Cancel a subscription. Unknown ids are ignored.
    async fn unsubscribe(&self, subscription: SubscriptionId);
}
