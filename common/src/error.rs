//! Framework error taxonomy.

use thiserror::Error;
use uuid::Uuid;

use crate::agent::AgentCategory;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised synchronously to callers of the framework.
///
/// These indicate caller or configuration mistakes. Failures *inside* task
/// or message handlers never surface here: the agent boundary converts them
/// into failed task results or dropped messages, and best-effort message
/// delivery reports its outcome as a value, not an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("agent `{0}` is already registered")]
    DuplicateAgent(String),

    #[error("agent `{0}` is not registered")]
    AgentNotFound(String),

    #[error("no routing entry for task type `{0}`")]
    UnknownTaskType(String),

    #[error("no active agent available in category `{0}`")]
    NoAvailableAgent(AgentCategory),

    #[error("agent `{0}` is offline")]
    AgentOffline(String),

    #[error("task `{task_id}` failed: {reason}")]
    TaskExecution { task_id: Uuid, reason: String },
}
