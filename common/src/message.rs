//! Inter-agent message value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::task::{MAX_PRIORITY, MIN_PRIORITY};

/// Sentinel recipient for fan-out delivery to all agents.
pub const BROADCAST_RECIPIENT: &str = "broadcast";

/// An asynchronous, typed communication between agents.
///
/// Priority is carried as metadata only; delivery stays FIFO per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub message_type: String,
    pub content: Value,
    pub timestamp: DateTime<Utc>,
    /// Links a response back to the message it answers.
    pub correlation_id: Option<Uuid>,
    pub priority: u8,
}

impl Message {
    /// Point-to-point message addressed to one agent.
    pub fn direct(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        message_type: impl Into<String>,
        content: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            recipient: recipient.into(),
            message_type: message_type.into(),
            content,
            timestamp: Utc::now(),
            correlation_id: None,
            priority: MIN_PRIORITY,
        }
    }

    /// Message addressed to every registered agent.
    pub fn broadcast(
        sender: impl Into<String>,
        message_type: impl Into<String>,
        content: Value,
    ) -> Self {
        Self::direct(sender, BROADCAST_RECIPIENT, message_type, content)
    }

    /// Response to `request`, addressed to its sender and correlated by id.
    pub fn reply(
        request: &Message,
        sender: impl Into<String>,
        message_type: impl Into<String>,
        content: Value,
    ) -> Self {
        let mut message = Self::direct(sender, request.sender.clone(), message_type, content);
        message.correlation_id = Some(request.id);
        message
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient == BROADCAST_RECIPIENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_broadcast_recipient() {
        let message = Message::broadcast("collector-1", "status_update", json!({"ok": true}));
        assert!(message.is_broadcast());
        assert_eq!(message.recipient, BROADCAST_RECIPIENT);
    }

    #[test]
    fn test_reply_correlates_to_request() {
        let request = Message::direct("analyzer-1", "collector-1", "data_request", json!({}));
        let response = Message::reply(&request, "collector-1", "data_response", json!({"rows": 10}));
        assert_eq!(response.recipient, "analyzer-1");
        assert_eq!(response.correlation_id, Some(request.id));
    }

    #[test]
    fn test_priority_clamped() {
        let message = Message::direct("a", "b", "ping", json!({})).with_priority(99);
        assert_eq!(message.priority, MAX_PRIORITY);
    }
}
