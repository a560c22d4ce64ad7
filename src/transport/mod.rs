//! Delivery of replies and alerts to owners.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::mpsc;

use crate::{db::OwnerId, intake::Reply, poller::Notification};

pub mod console;

pub use console::{spawn_stdin_reader, ConsoleSink, ConsoleTransport};

#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, owner_id: OwnerId, reply: Reply) -> Result<()>;
}

/// Forwards poller alerts to their owners until every sender is gone.
/// A failed delivery is logged and the alert dropped.
pub async fn dispatch_notifications(
    mut notifications: mpsc::UnboundedReceiver<Notification>,
    sink: Arc<dyn MessageSink>,
) {
    while let Some(notification) = notifications.recv().await {
        let owner_id = notification.owner_id;
        if let Err(err) = sink.send(owner_id, Reply::text(notification.message())).await {
            warn!(
                "failed to deliver alert for watch {} to {owner_id}: {err:#}",
                notification.entry.id
            );
        }
    }
    debug!("notification channel closed, dispatcher exiting");
}


#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::recording::RecordingSink;
    use super::*;
    use crate::{
        db::{Location, WatchEntry, WatchFilters},
        poller::Direction,
    };

    fn notification(owner_id: OwnerId, old_count: u64, new_count: u64) -> Notification {
        Notification {
            owner_id,
            entry: WatchEntry {
                id: 1,
                owner_id,
                location: Location::new("Leipzig", "l"),
                filters: WatchFilters::default(),
                last_count: Some(old_count),
            },
            direction: if new_count > old_count {
                Direction::Increased
            } else {
                Direction::Decreased
            },
            old_count,
            new_count,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_to_owner() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(notification(7, 2, 3)).unwrap();
        drop(tx);

        dispatch_notifications(rx, sink.clone()).await;

        assert_eq!(
            sink.sent(),
            vec![(
                7,
                Reply::text("ALERT! The flatcount for Leipzig (no filters) increased from 2 to 3")
            )]
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_dispatch() {
        let sink = Arc::new(RecordingSink::failing_for(1));
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(notification(1, 4, 1)).unwrap();
        tx.send(notification(2, 4, 1)).unwrap();
        drop(tx);

        dispatch_notifications(rx, sink.clone()).await;

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 2);
    }
}
