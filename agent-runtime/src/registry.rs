//! Process-wide directory of agents, indexed by identity and category.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use common::{AgentCategory, Error, Result};

use crate::agent::{AgentHandle, AgentSnapshot};

/// Directory mapping agent identity to agent instance.
///
/// Explicitly constructed and shared via `Arc` so tests can instantiate
/// isolated registries; there is no process-wide singleton.
#[derive(Default)]
pub struct AgentRegistry {
    agents: DashMap<String, Arc<AgentHandle>>,
    // Registration order per category; drives deterministic selection
    // tie-breaks in the coordinator.
    by_category: DashMap<AgentCategory, Vec<String>>,
}

/// Counts and per-agent health for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub total_agents: usize,
    pub agents_by_category: HashMap<String, usize>,
    pub agents: Vec<AgentSnapshot>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent to the directory. Duplicate identity is a caller error.
    pub fn register(&self, agent: Arc<AgentHandle>) -> Result<()> {
        let id = agent.id().to_string();
        let category = agent.category();
        match self.agents.entry(id.clone()) {
            Entry::Occupied(_) => return Err(Error::DuplicateAgent(id)),
            Entry::Vacant(slot) => {
                slot.insert(agent);
            }
        }
        self.by_category.entry(category).or_default().push(id.clone());
        info!(agent_id = %id, category = %category, "agent registered");
        Ok(())
    }

    /// Remove an agent from both indexes and return it.
    ///
    /// The agent is not stopped; the caller decides its fate. Tasks already
    /// queued on it are lost when it is stopped, but an in-flight task still
    /// reports its completion through the coordinator channel.
    pub fn unregister(&self, id: &str) -> Result<Arc<AgentHandle>> {
        let (removed_id, agent) = self
            .agents
            .remove(id)
            .ok_or_else(|| Error::AgentNotFound(id.to_string()))?;
        if let Some(mut ids) = self.by_category.get_mut(&agent.category()) {
            ids.retain(|known| known != &removed_id);
        }
        info!(agent_id = %removed_id, "agent unregistered");
        Ok(agent)
    }

    pub fn get(&self, id: &str) -> Option<Arc<AgentHandle>> {
        self.agents.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Agents of one category, in registration order.
    pub fn get_by_category(&self, category: AgentCategory) -> Vec<Arc<AgentHandle>> {
        let ids = match self.by_category.get(&category) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn all_agents(&self) -> Vec<Arc<AgentHandle>> {
        self.agents
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let mut agents = Vec::new();
        for agent in self.all_agents() {
            agents.push(agent.snapshot().await);
        }
        let agents_by_category = self
            .by_category
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().len()))
            .collect();
        RegistrySnapshot {
            total_agents: agents.len(),
            agents_by_category,
            agents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentConfig};
    use async_trait::async_trait;
    use common::{Message, Task};
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    struct Null;

    #[async_trait]
    impl Agent for Null {
        async fn execute_task(&self, _task: &Task) -> anyhow::Result<Value> {
            Ok(json!({}))
        }

        async fn handle_message(&self, _message: &Message) -> anyhow::Result<Option<Message>> {
            Ok(None)
        }
    }

    fn handle(id: &str, category: AgentCategory) -> Arc<AgentHandle> {
        let (tx, _rx) = mpsc::unbounded_channel();
        AgentHandle::new(AgentConfig::new(id, id, category), Arc::new(Null), tx)
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_an_error() {
        let registry = AgentRegistry::new();
        registry.register(handle("a1", AgentCategory::Analyzer)).unwrap();
        let err = registry
            .register(handle("a1", AgentCategory::Analyzer))
            .unwrap_err();
        assert_eq!(err, Error::DuplicateAgent("a1".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unregister_missing_is_an_error() {
        let registry = AgentRegistry::new();
        let err = registry.unregister("ghost").unwrap_err();
        assert_eq!(err, Error::AgentNotFound("ghost".to_string()));
    }

    #[tokio::test]
    async fn test_category_lookup_preserves_registration_order() {
        let registry = AgentRegistry::new();
        registry.register(handle("a1", AgentCategory::Analyzer)).unwrap();
        registry.register(handle("c1", AgentCategory::Collector)).unwrap();
        registry.register(handle("a2", AgentCategory::Analyzer)).unwrap();

        let analyzers: Vec<String> = registry
            .get_by_category(AgentCategory::Analyzer)
            .iter()
            .map(|a| a.id().to_string())
            .collect();
        assert_eq!(analyzers, vec!["a1", "a2"]);
        assert!(registry.get_by_category(AgentCategory::ActionExecutor).is_empty());
    }

    #[tokio::test]
    async fn test_unregister_updates_category_index() {
        let registry = AgentRegistry::new();
        registry.register(handle("a1", AgentCategory::Analyzer)).unwrap();
        registry.register(handle("a2", AgentCategory::Analyzer)).unwrap();
        registry.unregister("a1").unwrap();

        let analyzers: Vec<String> = registry
            .get_by_category(AgentCategory::Analyzer)
            .iter()
            .map(|a| a.id().to_string())
            .collect();
        assert_eq!(analyzers, vec!["a2"]);
    }

    #[tokio::test]
    async fn test_snapshot_counts() {
        let registry = AgentRegistry::new();
        registry.register(handle("a1", AgentCategory::Analyzer)).unwrap();
        registry.register(handle("x1", AgentCategory::ActionExecutor)).unwrap();

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.total_agents, 2);
        assert_eq!(snapshot.agents_by_category.get("analyzer"), Some(&1));
        assert_eq!(snapshot.agents_by_category.get("action_executor"), Some(&1));
        assert_eq!(snapshot.agents.len(), 2);
    }
}
