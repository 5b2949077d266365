//! Communication manager: single entry point over broker and coordinator,
//! plus the registry of named communication protocols.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use common::{Message, Result, TaskResult};

use crate::broker::MessageBroker;
use crate::coordinator::TaskCoordinator;

/// Declarative description of a named conversation style between agents.
///
/// Protocols document which message types belong together. They feed
/// validation hooks only; nothing enforces them on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationProtocol {
    pub protocol_id: String,
    pub version: String,
    pub message_types: Vec<String>,
    pub encoding: String,
    pub compression: bool,
}

impl CommunicationProtocol {
    pub fn new(protocol_id: &str, version: &str, message_types: &[&str]) -> Self {
        Self {
            protocol_id: protocol_id.to_string(),
            version: version.to_string(),
            message_types: message_types.iter().map(|s| s.to_string()).collect(),
            encoding: "json".to_string(),
            compression: false,
        }
    }

    /// Whether `message_type` belongs to this protocol.
    pub fn allows(&self, message_type: &str) -> bool {
        self.message_types.iter().any(|known| known == message_type)
    }
}

fn standard_protocols() -> Vec<CommunicationProtocol> {
    vec![
        CommunicationProtocol::new(
            "task_execution",
            "1.0",
            &["task_request", "task_result", "task_status"],
        ),
        CommunicationProtocol::new(
            "data_sharing",
            "1.0",
            &["data_request", "data_response", "data_update"],
        ),
        CommunicationProtocol::new(
            "coordination",
            "1.0",
            &["sync_request", "sync_response", "broadcast"],
        ),
    ]
}

/// Aggregate view across broker and coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunicationStats {
    pub message_history_size: usize,
    pub subscriptions: HashMap<String, usize>,
    pub tasks_in_flight: usize,
    pub tasks_completed: usize,
    pub agent_loads: HashMap<String, usize>,
    pub protocols: Vec<String>,
}

/// Unified interface for the two operations submitters actually need —
/// sending a task request and broadcasting a message — alongside the
/// protocol registry.
pub struct CommunicationManager {
    broker: Arc<MessageBroker>,
    coordinator: Arc<TaskCoordinator>,
    protocols: HashMap<String, CommunicationProtocol>,
}

impl CommunicationManager {
    pub fn new(broker: Arc<MessageBroker>, coordinator: Arc<TaskCoordinator>) -> Self {
        let protocols: HashMap<String, CommunicationProtocol> = standard_protocols()
            .into_iter()
            .map(|p| (p.protocol_id.clone(), p))
            .collect();
        info!(protocol_count = protocols.len(), "communication manager initialized");
        Self {
            broker,
            coordinator,
            protocols,
        }
    }

    pub fn broker(&self) -> &Arc<MessageBroker> {
        &self.broker
    }

    pub fn coordinator(&self) -> &Arc<TaskCoordinator> {
        &self.coordinator
    }

    /// Submit a task request; the returned id can be polled or waited on.
    pub async fn send_task_request(
        &self,
        task_type: &str,
        parameters: Value,
        priority: u8,
    ) -> Result<Uuid> {
        self.coordinator.submit_task(task_type, parameters, priority).await
    }

    pub fn task_result(&self, task_id: Uuid) -> Option<TaskResult> {
        self.coordinator.get_result(task_id)
    }

    pub async fn wait_for_task(&self, task_id: Uuid, timeout: Duration) -> Option<TaskResult> {
        self.coordinator.wait_for_result(task_id, timeout).await
    }

    /// Broadcast a message to every agent except the sender. Returns the
    /// number of inboxes reached.
    pub fn broadcast_message(&self, message_type: &str, content: Value, sender: &str) -> usize {
        let message = Message::broadcast(sender, message_type, content);
        self.broker.broadcast(message, true)
    }

    pub fn subscribe_to_topic(&self, topic: &str, agent_id: &str) {
        self.broker.subscribe(topic, agent_id);
    }

    pub fn protocol(&self, protocol_id: &str) -> Option<&CommunicationProtocol> {
        self.protocols.get(protocol_id)
    }

    /// Register or replace a protocol definition.
    pub fn register_protocol(&mut self, protocol: CommunicationProtocol) {
        self.protocols.insert(protocol.protocol_id.clone(), protocol);
    }

    /// Validation hook: does `message` fit the named protocol?
    pub fn validates(&self, protocol_id: &str, message: &Message) -> bool {
        self.protocols
            .get(protocol_id)
            .map(|p| p.allows(&message.message_type))
            .unwrap_or(false)
    }

    pub async fn stats(&self) -> CommunicationStats {
        let coordinator = self.coordinator.snapshot();
        CommunicationStats {
            message_history_size: self.broker.history_len().await,
            subscriptions: self.broker.subscription_counts(),
            tasks_in_flight: coordinator.tasks_in_flight,
            tasks_completed: coordinator.stored_results,
            agent_loads: coordinator.agent_loads,
            protocols: self.protocols.keys().cloned().collect(),
        }
    }
}
