//! Example usage of the orchestration framework
//!
//! This example demonstrates:
//! 1. Setting up the registry, broker, and coordinator
//! 2. Registering one agent per category with a demo behavior
//! 3. Submitting tasks through the communication manager
//! 4. Broadcasting a message to the fleet
//! 5. Inspecting snapshots and stats

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, Level};

use coordination::{
    Agent, AgentCategory, AgentConfig, AgentHandle, AgentRegistry, CommunicationManager, Message,
    MessageBroker, RoutingTable, Task, TaskCoordinator,
};

/// Demo behavior: acknowledges every task with a canned payload and logs
/// whatever messages reach it.
struct DemoWorker {
    label: &'static str,
}

#[async_trait]
impl Agent for DemoWorker {
    async fn execute_task(&self, task: &Task) -> Result<Value> {
        info!(worker = self.label, task = %task.name, "handling task");
        Ok(json!({
            "handled_by": self.label,
            "task": task.name,
            "parameters": task.parameters,
        }))
    }

    async fn handle_message(&self, message: &Message) -> Result<Option<Message>> {
        info!(worker = self.label, message_type = %message.message_type, "message received");
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Agent Orchestration Framework - Example");
    info!("=======================================");

    // Step 1: Build the core components
    let registry = Arc::new(AgentRegistry::new());
    let broker = Arc::new(MessageBroker::new(Arc::clone(&registry)));
    let coordinator = TaskCoordinator::new(Arc::clone(&registry), RoutingTable::standard());
    let manager = CommunicationManager::new(Arc::clone(&broker), Arc::clone(&coordinator));
    info!("core components created");

    // Step 2: Spawn one agent per category
    let fleet = [
        ("collector-1", "Data Collector", AgentCategory::Collector),
        ("analyzer-1", "Market Analyzer", AgentCategory::Analyzer),
        ("insight-1", "Insight Generator", AgentCategory::InsightGenerator),
        ("executor-1", "Action Executor", AgentCategory::ActionExecutor),
    ];
    for (id, name, category) in fleet {
        let handle = AgentHandle::new(
            AgentConfig::new(id, name, category),
            Arc::new(DemoWorker { label: id }),
            coordinator.completion_handle(),
        );
        handle.start().await?;
        registry.register(handle)?;
        broker.subscribe("system_events", id);
    }
    info!(agents = registry.len(), "fleet started");

    // Step 3: Submit a chain of tasks and wait for each result
    let pipeline = [
        ("collect_market_data", json!({"symbols": ["BTC", "ETH"]})),
        ("statistical_analysis", json!({"window": "24h"})),
        ("generate_insights", json!({"audience": "trading-desk"})),
        ("notification", json!({"channel": "email"})),
    ];
    for (task_type, parameters) in pipeline {
        let task_id = manager.send_task_request(task_type, parameters, 5).await?;
        let result = manager
            .wait_for_task(task_id, Duration::from_secs(5))
            .await
            .ok_or_else(|| anyhow::anyhow!("task {task_id} timed out"))?;
        info!(task_type, task_id = %task_id, data = %result.data, "result retrieved");
    }

    // Step 4: Broadcast to the fleet (sender excluded)
    let reached = manager.broadcast_message("maintenance_window", json!({"minutes": 5}), "system");
    info!(reached, "broadcast delivered");

    // Step 5: Inspect system state
    let registry_snapshot = registry.snapshot().await;
    info!(
        total_agents = registry_snapshot.total_agents,
        "registry snapshot"
    );
    let stats = manager.stats().await;
    info!(
        tasks_completed = stats.tasks_completed,
        history = stats.message_history_size,
        "communication stats"
    );

    // Step 6: Stop the fleet
    for agent in registry.all_agents() {
        agent.stop().await;
    }
    info!("fleet stopped");

    Ok(())
}
