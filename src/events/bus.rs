//! # Notice bus for broadcasting membership activity.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking publishing from the context, its runners and the node driver.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Subscriber (one):
//!   Context ───┐
//!   Runner  ───┼──────► Bus ───────► node listener ────► SubscriberSet
//!   Node    ───┘  (broadcast chan)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent notices for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: notices are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::notice::Notice;

/// Broadcast channel for notices.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Notice>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Notice>(capacity);
        Self { tx }
    }

    /// Publishes a notice to all active receivers.
    pub fn publish(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }

    /// Creates a new receiver that will observe subsequent notices.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoticeKind;

    #[tokio::test]
    async fn test_receiver_sees_notices_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Notice::new(NoticeKind::ShutdownRequested));

        let mut rx = bus.subscribe();
        bus.publish(Notice::new(NoticeKind::AllStoppedWithin));
        let got = rx.recv().await.unwrap();
        assert_eq!(got.kind, NoticeKind::AllStoppedWithin);
    }
}
