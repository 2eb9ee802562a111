//! Cross-tab eviction topic.
//!
//! A named broadcast channel shared by every page of a deployment. The
//! login surface publishes one message when an unauthenticated viewer
//! reaches it; authenticated pages subscribe. Delivery alone is the
//! useful side effect: engines that support it evict a frozen page's
//! snapshot when a message arrives for it, and for engines that do not,
//! the subscriber handler refreshes the guard's carryover data. No
//! ordering is guaranteed between a publish and any tab's own lifecycle
//! events, and the guard stays correct without the topic entirely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use bfguard_core::Error;

/// Capacity per topic; deliveries carry no payload and a lagged
/// subscriber still counts as having been delivered to.
const TOPIC_CAPACITY: usize = 16;

/// Registry of named broadcast topics within one simulated profile.
///
/// A topic is created implicitly by its first subscriber or publisher
/// and torn down when the last handle drops, like the underlying
/// browser channel.
#[derive(Debug, Clone, Default)]
pub struct TopicRegistry {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<()>>>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, name: &str) -> broadcast::Sender<()> {
        let mut topics = self.topics.lock().expect("topic registry poisoned");
        topics
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }

    /// Publish one message to the named topic.
    ///
    /// The payload is irrelevant by contract. Returns the number of
    /// subscribers the message was delivered to; zero subscribers is not
    /// an error.
    pub fn publish(&self, name: &str) -> usize {
        let sender = self.sender(name);
        sender.send(()).unwrap_or(0)
    }

    /// Subscribe to the named topic.
    pub fn subscribe(&self, name: &str) -> TopicSubscription {
        TopicSubscription { receiver: self.sender(name).subscribe() }
    }
}

/// One page instance's subscription to an eviction topic.
#[derive(Debug)]
pub struct TopicSubscription {
    receiver: broadcast::Receiver<()>,
}

impl TopicSubscription {
    /// Wait for the next delivery.
    ///
    /// A lagged subscriber is treated as delivered-to, since only the
    /// fact of delivery matters.
    ///
    /// # Errors
    ///
    /// Returns `Error::TopicUnavailable` when the topic is gone.
    pub async fn recv(&mut self) -> Result<(), Error> {
        match self.receiver.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => Ok(()),
            Err(broadcast::error::RecvError::Closed) => {
                Err(Error::TopicUnavailable("topic closed".to_string()))
            }
        }
    }

    /// Drain pending deliveries without waiting.
    ///
    /// Returns true if at least one message had been delivered since the
    /// last check. Used by single-threaded page loops that poll between
    /// lifecycle events.
    pub fn try_drain(&mut self) -> bool {
        let mut delivered = false;
        loop {
            match self.receiver.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => delivered = true,
                Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                    return delivered;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber_regardless_of_payload() {
        let registry = TopicRegistry::new();
        let mut subscription = registry.subscribe("bfguard_login");

        let delivered = registry.publish("bfguard_login");
        assert_eq!(delivered, 1);
        assert!(subscription.recv().await.is_ok());
    }

    #[test]
    fn test_publish_without_subscribers_is_not_an_error() {
        let registry = TopicRegistry::new();
        assert_eq!(registry.publish("bfguard_login"), 0);
    }

    #[test]
    fn test_topics_are_isolated_by_name() {
        let registry = TopicRegistry::new();
        let mut login = registry.subscribe("bfguard_login");
        let mut other = registry.subscribe("other_topic");

        registry.publish("bfguard_login");

        assert!(login.try_drain());
        assert!(!other.try_drain());
    }

    #[test]
    fn test_try_drain_collapses_multiple_deliveries() {
        let registry = TopicRegistry::new();
        let mut subscription = registry.subscribe("bfguard_login");

        registry.publish("bfguard_login");
        registry.publish("bfguard_login");

        assert!(subscription.try_drain());
        assert!(!subscription.try_drain());
    }

    #[tokio::test]
    async fn test_overflowed_subscriber_still_counts_as_delivered() {
        let registry = TopicRegistry::new();
        let mut subscription = registry.subscribe("bfguard_login");

        for _ in 0..(TOPIC_CAPACITY + 4) {
            registry.publish("bfguard_login");
        }

        assert!(subscription.recv().await.is_ok());
    }
}
