//! Task and task-result value objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::agent::AgentCategory;

/// Lowest accepted task/message priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest accepted task/message priority.
pub const MAX_PRIORITY: u8 = 10;

/// Execution state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A named, parameterized unit of work routed to one agent category.
///
/// Tasks are created by a submitter and mutated only by the agent executing
/// them (status and result transitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub category: AgentCategory,
    pub parameters: Value,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub result: Option<Value>,
}

impl Task {
    /// Create a pending task. Priority is clamped into `1..=10`.
    pub fn new(
        name: impl Into<String>,
        category: AgentCategory,
        parameters: Value,
        priority: u8,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
            parameters,
            priority: priority.clamp(MIN_PRIORITY, MAX_PRIORITY),
            created_at: Utc::now(),
            deadline: None,
            status: TaskStatus::Pending,
            result: None,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Outcome of one task execution, as stored in the coordinator's result
/// store. A failed execution carries the error description instead of a
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub data: Value,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn success(task_id: Uuid, data: Value) -> Self {
        Self {
            task_id,
            status: TaskStatus::Completed,
            data,
            error: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(task_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Failed,
            data: Value::Null,
            error: Some(reason.into()),
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_priority_clamped() {
        let low = Task::new("analyze_data", AgentCategory::Analyzer, json!({}), 0);
        let high = Task::new("analyze_data", AgentCategory::Analyzer, json!({}), 42);
        assert_eq!(low.priority, MIN_PRIORITY);
        assert_eq!(high.priority, MAX_PRIORITY);
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("collect_data", AgentCategory::Collector, json!({"source": "api"}), 5);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
        assert!(task.deadline.is_none());
    }

    #[test]
    fn test_result_constructors() {
        let id = Uuid::new_v4();
        let ok = TaskResult::success(id, json!({"rows": 3}));
        assert!(ok.is_success());
        assert!(ok.error.is_none());

        let failed = TaskResult::failure(id, "source unreachable");
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("source unreachable"));
    }
}
