//! In-process change notification for the admin log viewers.
//!
//! Every write to the activity or session store publishes one event;
//! subscribers (the SSE endpoint) receive a best-effort stream. Lagged
//! or absent subscribers are never an error.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Activity,
    Sessions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreChange {
    pub store: StoreKind,
    pub op: ChangeOp,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    pub fn publish(&self, store: StoreKind, op: ChangeOp, id: impl Into<String>) {
        // No subscribers is fine; drop the event.
        let _ = self.tx.send(StoreChange {
            store,
            op,
            id: id.into(),
        });
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_changes() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        feed.publish(StoreKind::Activity, ChangeOp::Insert, "abc");

        let change = rx.recv().await.expect("receive change");
        assert_eq!(change.store, StoreKind::Activity);
        assert_eq!(change.op, ChangeOp::Insert);
        assert_eq!(change.id, "abc");
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let feed = ChangeFeed::new(8);
        feed.publish(StoreKind::Sessions, ChangeOp::Update, "xyz");
    }

    #[test]
    fn change_serializes_snake_case() {
        let json = serde_json::to_value(StoreChange {
            store: StoreKind::Sessions,
            op: ChangeOp::Delete,
            id: "s1".into(),
        })
        .unwrap();
        assert_eq!(json["store"], "sessions");
        assert_eq!(json["op"], "delete");
    }
}
