//! Coordination layer.
//!
//! This crate provides the system side of the orchestration framework:
//! - `MessageBroker` for topic pub/sub, direct, and broadcast delivery
//! - `TaskCoordinator` for type-based routing, load-aware agent selection,
//!   and asynchronous result retrieval
//! - `RoutingTable` mapping task-type names to agent categories
//! - `CommunicationManager` facade composing broker and coordinator

pub mod broker;
pub mod comms;
pub mod coordinator;
pub mod routing;

// Re-export commonly used types
pub use broker::{DeliveryStatus, MessageBroker, MessageBrokerConfig};
pub use comms::{CommunicationManager, CommunicationProtocol, CommunicationStats};
pub use coordinator::{CoordinatorSnapshot, TaskCoordinator};
pub use routing::RoutingTable;

// Re-export the runtime and common types for convenience
pub use agent_runtime::{
    Agent, AgentConfig, AgentHandle, AgentRegistry, AgentSnapshot, CompletionSender,
    RegistrySnapshot, TaskCompletion,
};
pub use common::{
    AgentCategory, AgentStatus, Error, Message, Result, Task, TaskResult, TaskStatus,
};
