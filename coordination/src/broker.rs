//! Message broker: topic pub/sub, direct, and broadcast delivery.
//!
//! Delivery is best-effort. Recipients are resolved through the registry at
//! delivery time, so an unregistered agent simply stops receiving; nothing
//! is retried or queued on its behalf.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use agent_runtime::AgentRegistry;
use common::Message;

/// Tunables for the broker.
#[derive(Debug, Clone)]
pub struct MessageBrokerConfig {
    /// Number of recent messages retained for inspection.
    pub history_capacity: usize,
}

impl Default for MessageBrokerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
        }
    }
}

/// Outcome of a best-effort direct delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// Recipient absent from the registry, or its inbox already shut down.
    RecipientNotFound,
}

impl DeliveryStatus {
    pub fn is_delivered(self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }
}

pub struct MessageBroker {
    registry: Arc<AgentRegistry>,
    // topic -> subscriber agent ids, in subscription order
    subscribers: DashMap<String, Vec<String>>,
    history: Mutex<VecDeque<Message>>,
    config: MessageBrokerConfig,
}

impl MessageBroker {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self::with_config(registry, MessageBrokerConfig::default())
    }

    pub fn with_config(registry: Arc<AgentRegistry>, config: MessageBrokerConfig) -> Self {
        info!(history_capacity = config.history_capacity, "message broker initialized");
        Self {
            registry,
            subscribers: DashMap::new(),
            history: Mutex::new(VecDeque::new()),
            config,
        }
    }

    /// Deliver to every current subscriber of `topic`, then record the
    /// message in the history ring. Returns the number of inboxes reached.
    pub async fn publish(&self, topic: &str, message: Message) -> usize {
        let subscriber_ids: Vec<String> = self
            .subscribers
            .get(topic)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        let mut delivered = 0;
        for id in &subscriber_ids {
            match self.registry.get(id) {
                Some(agent) => {
                    if agent.deliver_message(message.clone()) {
                        delivered += 1;
                    }
                }
                None => debug!(topic, agent_id = %id, "subscriber no longer registered"),
            }
        }
        info!(
            topic,
            message_id = %message.id,
            sender = %message.sender,
            delivered,
            "message published"
        );
        self.record(message).await;
        delivered
    }

    /// Subscribe an agent to a topic. Subscribing twice is a no-op.
    pub fn subscribe(&self, topic: &str, agent_id: &str) {
        let mut ids = self.subscribers.entry(topic.to_string()).or_default();
        if !ids.iter().any(|known| known == agent_id) {
            ids.push(agent_id.to_string());
            info!(topic, agent_id, "subscribed to topic");
        }
    }

    pub fn unsubscribe(&self, topic: &str, agent_id: &str) {
        if let Some(mut ids) = self.subscribers.get_mut(topic) {
            ids.retain(|known| known != agent_id);
        }
        info!(topic, agent_id, "unsubscribed from topic");
    }

    /// Deliver to every registered agent, optionally skipping the sender.
    /// Returns the number of inboxes reached.
    pub fn broadcast(&self, message: Message, exclude_sender: bool) -> usize {
        let mut delivered = 0;
        for agent in self.registry.all_agents() {
            if exclude_sender && agent.id() == message.sender {
                continue;
            }
            if agent.deliver_message(message.clone()) {
                delivered += 1;
            }
        }
        info!(
            message_id = %message.id,
            sender = %message.sender,
            delivered,
            "message broadcast"
        );
        delivered
    }

    /// Best-effort point-to-point delivery.
    pub fn direct_message(&self, recipient_id: &str, message: Message) -> DeliveryStatus {
        let Some(agent) = self.registry.get(recipient_id) else {
            warn!(
                recipient = recipient_id,
                sender = %message.sender,
                message_id = %message.id,
                "direct message failed, recipient not registered"
            );
            return DeliveryStatus::RecipientNotFound;
        };
        if agent.deliver_message(message.clone()) {
            debug!(recipient = recipient_id, message_id = %message.id, "direct message delivered");
            DeliveryStatus::Delivered
        } else {
            warn!(recipient = recipient_id, message_id = %message.id, "recipient inbox closed");
            DeliveryStatus::RecipientNotFound
        }
    }

    /// The most recent `limit` published messages, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<Message> {
        let history = self.history.lock().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers.get(topic).map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn subscription_counts(&self) -> HashMap<String, usize> {
        self.subscribers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect()
    }

    async fn record(&self, message: Message) {
        if self.config.history_capacity == 0 {
            return;
        }
        let mut history = self.history.lock().await;
        while history.len() >= self.config.history_capacity {
            history.pop_front();
        }
        history.push_back(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn broker_with_capacity(capacity: usize) -> MessageBroker {
        MessageBroker::with_config(
            Arc::new(AgentRegistry::new()),
            MessageBrokerConfig {
                history_capacity: capacity,
            },
        )
    }

    #[tokio::test]
    async fn test_history_evicts_oldest() {
        let broker = broker_with_capacity(3);
        for i in 0..5 {
            let message = Message::direct("a", "b", format!("m{i}"), json!({}));
            broker.publish("updates", message).await;
        }
        let history = broker.history(10).await;
        let types: Vec<&str> = history.iter().map(|m| m.message_type.as_str()).collect();
        assert_eq!(types, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_history_limit_returns_most_recent() {
        let broker = broker_with_capacity(10);
        for i in 0..4 {
            let message = Message::direct("a", "b", format!("m{i}"), json!({}));
            broker.publish("updates", message).await;
        }
        let history = broker.history(2).await;
        let types: Vec<&str> = history.iter().map(|m| m.message_type.as_str()).collect();
        assert_eq!(types, vec!["m2", "m3"]);
    }

    #[tokio::test]
    async fn test_double_subscribe_is_deduplicated() {
        let broker = broker_with_capacity(10);
        broker.subscribe("signals", "a1");
        broker.subscribe("signals", "a1");
        broker.subscribe("signals", "a2");
        assert_eq!(broker.subscriber_count("signals"), 2);

        broker.unsubscribe("signals", "a1");
        assert_eq!(broker.subscriber_count("signals"), 1);
        assert_eq!(broker.subscriber_count("unknown"), 0);
    }

    #[tokio::test]
    async fn test_direct_message_to_unknown_recipient() {
        let broker = broker_with_capacity(10);
        let status =
            broker.direct_message("ghost", Message::direct("a", "ghost", "ping", json!({})));
        assert_eq!(status, DeliveryStatus::RecipientNotFound);
        assert!(!status.is_delivered());
    }
}
