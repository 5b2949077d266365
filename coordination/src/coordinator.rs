//! Task coordinator: type-based routing, load-aware agent selection, and
//! asynchronous result retrieval.
//!
//! Agents report completions over an mpsc channel rather than calling back
//! into the coordinator, and waiters are woken by a `Notify` the moment a
//! result lands — there is no sleep-and-recheck polling anywhere.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use agent_runtime::{AgentRegistry, CompletionSender, TaskCompletion};
use common::{AgentStatus, Error, Result, Task, TaskResult};
use serde_json::Value;

use crate::routing::RoutingTable;

/// Routes tasks to the least-loaded active agent of the responsible
/// category and stores their results for retrieval.
pub struct TaskCoordinator {
    registry: Arc<AgentRegistry>,
    routing: RoutingTable,
    // task id -> owning agent id, for load accounting
    assignments: Arc<DashMap<Uuid, String>>,
    loads: Arc<DashMap<String, usize>>,
    // Append-only from the submitter's perspective; first write wins.
    results: Arc<DashMap<Uuid, TaskResult>>,
    completed: Arc<Notify>,
    completion_tx: CompletionSender,
}

/// Observability counters for the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSnapshot {
    pub tasks_in_flight: usize,
    pub stored_results: usize,
    pub agent_loads: HashMap<String, usize>,
}

impl TaskCoordinator {
    /// Create a coordinator and spawn its completion loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(registry: Arc<AgentRegistry>, routing: RoutingTable) -> Arc<Self> {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let coordinator = Arc::new(Self {
            registry,
            routing,
            assignments: Arc::new(DashMap::new()),
            loads: Arc::new(DashMap::new()),
            results: Arc::new(DashMap::new()),
            completed: Arc::new(Notify::new()),
            completion_tx,
        });
        tokio::spawn(completion_loop(
            completion_rx,
            Arc::clone(&coordinator.assignments),
            Arc::clone(&coordinator.loads),
            Arc::clone(&coordinator.results),
            Arc::clone(&coordinator.completed),
        ));
        info!(task_types = coordinator.routing.len(), "task coordinator initialized");
        coordinator
    }

    /// Sender half handed to agents so they can report completions.
    pub fn completion_handle(&self) -> CompletionSender {
        self.completion_tx.clone()
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Route a task to the least-loaded active agent of its category.
    ///
    /// Load ties are broken by registration order: the first agent at the
    /// minimum wins.
    pub async fn submit_task(
        &self,
        task_type: &str,
        parameters: Value,
        priority: u8,
    ) -> Result<Uuid> {
        let category = self
            .routing
            .resolve(task_type)
            .ok_or_else(|| Error::UnknownTaskType(task_type.to_string()))?;

        let mut selected: Option<(usize, _)> = None;
        for agent in self.registry.get_by_category(category) {
            if agent.status().await == AgentStatus::Offline {
                continue;
            }
            let load = self.loads.get(agent.id()).map(|l| *l).unwrap_or(0);
            let better = match &selected {
                None => true,
                Some((best, _)) => load < *best,
            };
            if better {
                selected = Some((load, agent));
            }
        }
        let Some((load, agent)) = selected else {
            return Err(Error::NoAvailableAgent(category));
        };

        let task = Task::new(task_type, category, parameters, priority);
        let task_id = task.id;
        agent.submit_task(task).await?;
        self.assignments.insert(task_id, agent.id().to_string());
        *self.loads.entry(agent.id().to_string()).or_insert(0) += 1;
        info!(
            task_id = %task_id,
            task_type,
            category = %category,
            agent_id = %agent.id(),
            load = load + 1,
            "task submitted"
        );
        Ok(task_id)
    }

    /// Non-blocking result lookup.
    pub fn get_result(&self, task_id: Uuid) -> Option<TaskResult> {
        self.results.get(&task_id).map(|entry| entry.value().clone())
    }

    /// Wait until the task completes or the timeout elapses.
    ///
    /// Completion wakes waiters immediately. The timeout is a caller-side
    /// deadline, not a cancellation: a timed-out wait leaves the task
    /// running, and a later [`TaskCoordinator::get_result`] may still find
    /// its result.
    pub async fn wait_for_result(&self, task_id: Uuid, timeout: Duration) -> Option<TaskResult> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register for the wakeup before re-checking the store, so a
            // completion landing in between is not missed.
            let woken = self.completed.notified();
            if let Some(result) = self.get_result(task_id) {
                return Some(result);
            }
            if timeout_at(deadline, woken).await.is_err() {
                debug!(task_id = %task_id, ?timeout, "wait for result timed out");
                return None;
            }
        }
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            tasks_in_flight: self.assignments.len(),
            stored_results: self.results.len(),
            agent_loads: self
                .loads
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

/// Drains completion reports: stores results (first write wins), releases
/// load accounting, and wakes waiters.
async fn completion_loop(
    mut completions: mpsc::UnboundedReceiver<TaskCompletion>,
    assignments: Arc<DashMap<Uuid, String>>,
    loads: Arc<DashMap<String, usize>>,
    results: Arc<DashMap<Uuid, TaskResult>>,
    completed: Arc<Notify>,
) {
    while let Some(completion) = completions.recv().await {
        let TaskCompletion {
            task_id,
            agent_id,
            result,
        } = completion;
        if results.contains_key(&task_id) {
            warn!(task_id = %task_id, agent_id = %agent_id, "duplicate completion ignored");
            continue;
        }
        results.insert(task_id, result);
        if let Some((_, owner)) = assignments.remove(&task_id) {
            if let Some(mut load) = loads.get_mut(&owner) {
                *load = load.saturating_sub(1);
            }
        }
        debug!(task_id = %task_id, agent_id = %agent_id, "task result stored");
        completed.notify_waiters();
    }
    debug!("completion loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AgentCategory, TaskStatus};
    use serde_json::json;

    fn empty_coordinator() -> Arc<TaskCoordinator> {
        TaskCoordinator::new(Arc::new(AgentRegistry::new()), RoutingTable::standard())
    }

    #[tokio::test]
    async fn test_unknown_task_type_fails_closed() {
        let coordinator = empty_coordinator();
        let err = coordinator
            .submit_task("transmute_lead", json!({}), 5)
            .await
            .unwrap_err();
        assert_eq!(err, Error::UnknownTaskType("transmute_lead".to_string()));
    }

    #[tokio::test]
    async fn test_no_agent_in_category() {
        let coordinator = empty_coordinator();
        let err = coordinator
            .submit_task("analyze_data", json!({}), 5)
            .await
            .unwrap_err();
        assert_eq!(err, Error::NoAvailableAgent(AgentCategory::Analyzer));
    }

    #[tokio::test]
    async fn test_duplicate_completion_keeps_first_result() {
        let coordinator = empty_coordinator();
        let tx = coordinator.completion_handle();
        let task_id = Uuid::new_v4();

        tx.send(TaskCompletion {
            task_id,
            agent_id: "a1".to_string(),
            result: TaskResult::success(task_id, json!({"v": 1})),
        })
        .unwrap();
        tx.send(TaskCompletion {
            task_id,
            agent_id: "a1".to_string(),
            result: TaskResult::success(task_id, json!({"v": 2})),
        })
        .unwrap();

        let result = coordinator
            .wait_for_result(task_id, Duration::from_secs(1))
            .await
            .expect("first completion should be stored");
        assert_eq!(result.data, json!({"v": 1}));
        assert_eq!(result.status, TaskStatus::Completed);

        // Idempotent re-reads observe the same value.
        tokio::task::yield_now().await;
        let again = coordinator.get_result(task_id).unwrap();
        assert_eq!(again.data, json!({"v": 1}));
    }

    #[tokio::test]
    async fn test_wait_with_zero_timeout_returns_immediately() {
        let coordinator = empty_coordinator();
        let result = coordinator
            .wait_for_result(Uuid::new_v4(), Duration::ZERO)
            .await;
        assert!(result.is_none());
    }
}
