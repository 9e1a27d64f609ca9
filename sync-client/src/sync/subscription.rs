//! Subscription Manager - topic interest owned by one session
//!
//! Tracks which push topics the session currently cares about and issues
//! subscribe/unsubscribe calls as interest changes. Topic naming is opaque
//! here; sessions supply topics fully formed.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::message::EventClient;

pub struct SubscriptionManager {
    client: EventClient,
    topics: Mutex<HashSet<String>>,
}

impl SubscriptionManager {
    pub fn new(client: EventClient) -> Self {
        Self {
            client,
            topics: Mutex::new(HashSet::new()),
        }
    }

    /// Subscribe to each topic not already subscribed. Idempotent.
    ///
    /// A failed subscribe (broker down) is logged and the session continues
    /// in pull-only mode; the topic still enters the interest set so the
    /// later deactivate stays symmetric.
    pub async fn activate(&self, topics: &[String]) {
        for topic in topics {
            let already = self.topics.lock().unwrap().contains(topic);
            if already {
                continue;
            }

            match self.client.subscribe(topic).await {
                Ok(()) => tracing::debug!(topic = %topic, "Subscribed"),
                Err(e) => {
                    tracing::warn!(topic = %topic, "Subscribe failed, continuing pull-only: {}", e)
                }
            }
            self.topics.lock().unwrap().insert(topic.clone());
        }
    }

    /// Unsubscribe from each topic we hold. Idempotent.
    pub async fn deactivate(&self, topics: &[String]) {
        for topic in topics {
            let held = self.topics.lock().unwrap().remove(topic);
            if !held {
                continue;
            }

            match self.client.unsubscribe(topic).await {
                Ok(()) => tracing::debug!(topic = %topic, "Unsubscribed"),
                Err(e) => tracing::warn!(topic = %topic, "Unsubscribe failed: {}", e),
            }
        }
    }

    /// Topics currently held, sorted for stable output
    pub fn active_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.lock().unwrap().iter().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.topics.lock().unwrap().contains(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{BusMessage, EventType, SubscribePayload};
    use tokio::sync::broadcast;

    fn manager_with_wire() -> (SubscriptionManager, broadcast::Receiver<BusMessage>) {
        let (broker_tx, _) = broadcast::channel(16);
        let (client_tx, wire_rx) = broadcast::channel(16);
        let client = EventClient::memory(&broker_tx, &client_tx);
        (SubscriptionManager::new(client), wire_rx)
    }

    #[tokio::test]
    async fn test_activate_subscribes_once() {
        let (manager, mut wire_rx) = manager_with_wire();
        let topics = vec!["devices".to_string()];

        manager.activate(&topics).await;
        manager.activate(&topics).await;

        let frame = wire_rx.recv().await.unwrap();
        assert_eq!(frame.event_type, EventType::Subscribe);
        let payload: SubscribePayload = frame.parse_payload().unwrap();
        assert_eq!(payload.topic, "devices");

        // Second activate was a no-op; nothing else on the wire
        assert!(wire_rx.try_recv().is_err());
        assert!(manager.is_subscribed("devices"));
    }

    #[tokio::test]
    async fn test_deactivate_is_idempotent() {
        let (manager, mut wire_rx) = manager_with_wire();
        let topics = vec!["device-id-3".to_string()];

        manager.activate(&topics).await;
        let _ = wire_rx.recv().await.unwrap();

        manager.deactivate(&topics).await;
        let frame = wire_rx.recv().await.unwrap();
        assert_eq!(frame.event_type, EventType::Unsubscribe);

        // Already removed; no further frames
        manager.deactivate(&topics).await;
        assert!(wire_rx.try_recv().is_err());
        assert!(manager.active_topics().is_empty());
    }
}
