//! Transfer progress fan-out
//!
//! The transfer service reports progress for every in-flight download through
//! one `ProgressHub`. Each download subscribes under its task id and only
//! receives its own events. Dropping the `ProgressSubscription` unsubscribes,
//! so release happens on success, failure and cancellation alike.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::models::ProgressEvent;

struct Subscriber {
    token: u64,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

#[derive(Default)]
struct HubInner {
    subscribers: Mutex<HashMap<String, Subscriber>>,
    next_token: AtomicU64,
}

/// Shared progress channel, routed by task id
#[derive(Clone, Default)]
pub struct ProgressHub {
    inner: Arc<HubInner>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for events tagged with `id`.
    ///
    /// A second subscription for the same id replaces the first.
    pub fn subscribe(&self, id: &str) -> ProgressSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .inner
            .subscribers
            .lock()
            .insert(id.to_string(), Subscriber { token, tx });
        if previous.is_some() {
            log::warn!("Replacing existing progress subscription for {}", id);
        }

        ProgressSubscription {
            id: id.to_string(),
            token,
            hub: self.inner.clone(),
            rx,
        }
    }

    /// Deliver `event` to the subscriber for its id, if any.
    ///
    /// Returns whether a subscriber received it.
    pub fn publish(&self, event: ProgressEvent) -> bool {
        let subscribers = self.inner.subscribers.lock();
        match subscribers.get(&event.id) {
            Some(subscriber) => subscriber.tx.send(event).is_ok(),
            None => {
                log::trace!("No listener for progress of {}", event.id);
                false
            }
        }
    }

    pub fn is_subscribed(&self, id: &str) -> bool {
        self.inner.subscribers.lock().contains_key(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Receiving end for one task's progress; unsubscribes on drop
pub struct ProgressSubscription {
    id: String,
    token: u64,
    hub: Arc<HubInner>,
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl ProgressSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next event. `None` once this subscription was replaced.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Next already-delivered event, without waiting
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        let mut subscribers = self.hub.subscribers.lock();
        // Only remove the entry if it is still ours
        if subscribers.get(&self.id).map(|s| s.token) == Some(self.token) {
            subscribers.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, bytes: u64) -> ProgressEvent {
        ProgressEvent {
            id: id.to_string(),
            bytes,
            content_length: 100,
        }
    }

    #[test]
    fn test_routes_by_id() {
        let hub = ProgressHub::new();
        let mut a = hub.subscribe("a");
        let mut b = hub.subscribe("b");

        assert!(hub.publish(event("a", 1)));
        assert!(hub.publish(event("b", 2)));
        assert!(!hub.publish(event("c", 3)));

        assert_eq!(a.try_recv().unwrap().bytes, 1);
        assert!(a.try_recv().is_none());
        assert_eq!(b.try_recv().unwrap().bytes, 2);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = ProgressHub::new();
        {
            let _sub = hub.subscribe("a");
            assert!(hub.is_subscribed("a"));
        }
        assert!(!hub.is_subscribed("a"));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_replaced_subscription_drop_keeps_newer() {
        let hub = ProgressHub::new();
        let old = hub.subscribe("a");
        let mut new = hub.subscribe("a");
        drop(old);
        assert!(hub.is_subscribed("a"));
        hub.publish(event("a", 5));
        assert_eq!(new.try_recv().unwrap().bytes, 5);
    }
}
