//! Agent classification and lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of agents used for task routing.
///
/// Every supported task type maps to exactly one category; the coordinator
/// selects a concrete agent within the category at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    Collector,
    Analyzer,
    InsightGenerator,
    ActionExecutor,
}

impl AgentCategory {
    /// All known categories.
    pub const ALL: [AgentCategory; 4] = [
        AgentCategory::Collector,
        AgentCategory::Analyzer,
        AgentCategory::InsightGenerator,
        AgentCategory::ActionExecutor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentCategory::Collector => "collector",
            AgentCategory::Analyzer => "analyzer",
            AgentCategory::InsightGenerator => "insight_generator",
            AgentCategory::ActionExecutor => "action_executor",
        }
    }
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an agent.
///
/// `Busy` covers exactly one task execution at a time; `Offline` means the
/// processing loops are not running and task submission is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Error,
    Offline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(AgentCategory::Collector.to_string(), "collector");
        assert_eq!(AgentCategory::InsightGenerator.to_string(), "insight_generator");
    }

    #[test]
    fn test_category_serde_round_trip() {
        let json = serde_json::to_string(&AgentCategory::ActionExecutor).unwrap();
        assert_eq!(json, "\"action_executor\"");
        let back: AgentCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AgentCategory::ActionExecutor);
    }
}
