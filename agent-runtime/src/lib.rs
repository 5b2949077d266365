//! Agent runtime.
//!
//! This crate provides the worker side of the orchestration system:
//! - Base `Agent` trait implemented by pluggable task/message behaviors
//! - `AgentHandle` owning the priority task queue, the FIFO inbox, and the
//!   two processing loops that drive a behavior
//! - `AgentRegistry` mapping agent identity to running agents, indexed by
//!   category

pub mod agent;
pub mod registry;

// Re-export commonly used types
pub use agent::{
    Agent, AgentConfig, AgentHandle, AgentSnapshot, CompletionSender, MetricsSnapshot,
    TaskCompletion,
};
pub use registry::{AgentRegistry, RegistrySnapshot};

// Re-export common types for convenience
pub use common::{AgentCategory, AgentStatus, Message, Task, TaskResult, TaskStatus};
