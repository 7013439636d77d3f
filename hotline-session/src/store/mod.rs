mod room_handle;
mod signaling_store;

pub use room_handle::RoomHandle;
pub use signaling_store::{SignalingStore, StoreEvent, SubscriptionId};
