//! Base Agent trait and the framework-owned agent handle.
//!
//! An [`Agent`] implementation supplies the work: executing typed tasks and
//! reacting to messages. The [`AgentHandle`] owns everything else — the
//! priority-ordered task queue, the FIFO inbox, status and metrics
//! bookkeeping, and the two processing loops that drive the behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use common::{AgentCategory, AgentStatus, Error, Message, Result, Task, TaskResult, TaskStatus};

/// Completion report sent from an agent back to the coordinator.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub task_id: Uuid,
    pub agent_id: String,
    pub result: TaskResult,
}

/// Sending half of the completion channel handed to each agent.
pub type CompletionSender = mpsc::UnboundedSender<TaskCompletion>;

/// Static identity and classification of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub category: AgentCategory,
    pub capabilities: Vec<String>,
}

impl AgentConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: AgentCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            capabilities: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "unnamed-agent".to_string(),
            category: AgentCategory::Analyzer,
            capabilities: Vec::new(),
        }
    }
}

/// Pluggable behavior driven by the runtime.
///
/// Implementations signal failure through the returned `Result`; the runtime
/// converts task errors into failed results and drops messages whose handler
/// errored. A fault inside a behavior never tears down the processing loops.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Execute one task and produce its result payload.
    ///
    /// The runtime invokes this with the agent marked `Busy` and with no
    /// other task executing on the same agent.
    async fn execute_task(&self, task: &Task) -> anyhow::Result<serde_json::Value>;

    /// React to one message, optionally producing a response.
    ///
    /// The runtime does not route the response anywhere; it is logged and
    /// dropped. Behaviors that need to answer should send through the broker
    /// themselves.
    async fn handle_message(&self, message: &Message) -> anyhow::Result<Option<Message>>;

    /// Called when the runtime starts this agent.
    async fn on_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the runtime stops this agent.
    async fn on_stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct AgentMetrics {
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    messages_handled: AtomicU64,
}

/// Point-in-time counters for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub messages_handled: u64,
}

/// Health view of one agent, as reported by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub name: String,
    pub category: AgentCategory,
    pub status: AgentStatus,
    pub queued_tasks: usize,
    pub capabilities: Vec<String>,
    pub metrics: MetricsSnapshot,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// A running agent: behavior plus queues, loops, and bookkeeping.
///
/// Created `Offline`; [`AgentHandle::start`] transitions to `Idle` and
/// spawns the task loop and the message loop as independent tokio tasks.
/// Handles are not restartable once stopped.
pub struct AgentHandle {
    config: AgentConfig,
    behavior: Arc<dyn Agent>,
    status: RwLock<AgentStatus>,
    queue: Mutex<VecDeque<Task>>,
    queue_wake: Notify,
    inbox_tx: mpsc::UnboundedSender<Message>,
    inbox_rx: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
    shutdown: watch::Sender<bool>,
    completions: CompletionSender,
    metrics: AgentMetrics,
    created_at: DateTime<Utc>,
    last_active: RwLock<DateTime<Utc>>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl AgentHandle {
    pub fn new(
        config: AgentConfig,
        behavior: Arc<dyn Agent>,
        completions: CompletionSender,
    ) -> Arc<Self> {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        let now = Utc::now();
        info!(agent_id = %config.id, category = %config.category, "agent created");
        Arc::new(Self {
            config,
            behavior,
            status: RwLock::new(AgentStatus::Offline),
            queue: Mutex::new(VecDeque::new()),
            queue_wake: Notify::new(),
            inbox_tx,
            inbox_rx: Mutex::new(Some(inbox_rx)),
            shutdown,
            completions,
            metrics: AgentMetrics::default(),
            created_at: now,
            last_active: RwLock::new(now),
            loops: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn category(&self) -> AgentCategory {
        self.config.category
    }

    pub async fn status(&self) -> AgentStatus {
        *self.status.read().await
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_completed: self.metrics.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.metrics.tasks_failed.load(Ordering::Relaxed),
            messages_handled: self.metrics.messages_handled.load(Ordering::Relaxed),
        }
    }

    /// Insert a task at its priority position and wake the task loop.
    ///
    /// The queue stays sorted by descending priority; equal priorities keep
    /// submission order. Never blocks. Fails only if the agent is `Offline`.
    pub async fn submit_task(&self, mut task: Task) -> Result<()> {
        if self.status().await == AgentStatus::Offline {
            return Err(Error::AgentOffline(self.config.id.clone()));
        }
        task.status = TaskStatus::Pending;
        let mut queue = self.queue.lock().await;
        let at = queue
            .iter()
            .position(|queued| queued.priority < task.priority)
            .unwrap_or(queue.len());
        debug!(
            agent_id = %self.config.id,
            task_id = %task.id,
            task_name = %task.name,
            priority = task.priority,
            position = at,
            "task queued"
        );
        queue.insert(at, task);
        drop(queue);
        self.queue_wake.notify_one();
        Ok(())
    }

    /// Append a message to the inbox. Never blocks.
    ///
    /// Returns whether the runtime accepted the message; `false` only after
    /// the message loop has shut down.
    pub fn deliver_message(&self, message: Message) -> bool {
        match self.inbox_tx.send(message) {
            Ok(()) => true,
            Err(_) => {
                warn!(agent_id = %self.config.id, "inbox closed, message dropped");
                false
            }
        }
    }

    /// Transition `Offline -> Idle` and spawn the processing loops.
    ///
    /// Calling `start` on a running agent is a no-op. A handle that has been
    /// stopped cannot be started again.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut status = self.status.write().await;
        if *status != AgentStatus::Offline {
            debug!(agent_id = %self.config.id, "start ignored, agent already running");
            return Ok(());
        }
        let inbox_rx = self.inbox_rx.lock().await.take();
        let Some(inbox_rx) = inbox_rx else {
            return Err(Error::AgentOffline(self.config.id.clone()));
        };
        if let Err(e) = self.behavior.on_start().await {
            warn!(agent_id = %self.config.id, error = %e, "on_start hook failed");
        }
        *status = AgentStatus::Idle;
        drop(status);

        let task_loop = tokio::spawn({
            let agent = Arc::clone(self);
            let shutdown = self.shutdown.subscribe();
            async move { agent.task_loop(shutdown).await }
        });
        let message_loop = tokio::spawn({
            let agent = Arc::clone(self);
            let shutdown = self.shutdown.subscribe();
            async move { agent.message_loop(inbox_rx, shutdown).await }
        });
        self.loops.lock().await.extend([task_loop, message_loop]);
        info!(agent_id = %self.config.id, name = %self.config.name, "agent started");
        Ok(())
    }

    /// Transition to `Offline` and wait for both loops to exit.
    ///
    /// An in-flight task finishes and still reports its completion; tasks
    /// still queued are dropped.
    pub async fn stop(&self) {
        {
            let mut status = self.status.write().await;
            if *status == AgentStatus::Offline {
                return;
            }
            *status = AgentStatus::Offline;
        }
        let _ = self.shutdown.send(true);
        let handles: Vec<_> = self.loops.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        if let Err(e) = self.behavior.on_stop().await {
            warn!(agent_id = %self.config.id, error = %e, "on_stop hook failed");
        }
        let dropped = self.queue.lock().await.len();
        if dropped > 0 {
            warn!(agent_id = %self.config.id, dropped, "queued tasks dropped at shutdown");
        }
        info!(agent_id = %self.config.id, "agent stopped");
    }

    pub async fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            category: self.config.category,
            status: *self.status.read().await,
            queued_tasks: self.queue.lock().await.len(),
            capabilities: self.config.capabilities.clone(),
            metrics: self.metrics(),
            created_at: self.created_at,
            last_active: *self.last_active.read().await,
        }
    }

    async fn task_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let next = self.queue.lock().await.pop_front();
            match next {
                Some(task) => self.run_task(task).await,
                None => {
                    tokio::select! {
                        _ = self.queue_wake.notified() => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }
        debug!(agent_id = %self.config.id, "task loop exited");
    }

    async fn run_task(&self, mut task: Task) {
        *self.status.write().await = AgentStatus::Busy;
        *self.last_active.write().await = Utc::now();
        task.status = TaskStatus::Running;
        info!(
            agent_id = %self.config.id,
            task_id = %task.id,
            task_name = %task.name,
            "task execution started"
        );

        let result = match self.behavior.execute_task(&task).await {
            Ok(data) => {
                task.status = TaskStatus::Completed;
                task.result = Some(data.clone());
                self.metrics.tasks_completed.fetch_add(1, Ordering::Relaxed);
                info!(agent_id = %self.config.id, task_id = %task.id, "task execution completed");
                TaskResult::success(task.id, data)
            }
            Err(e) => {
                let failure = Error::TaskExecution {
                    task_id: task.id,
                    reason: e.to_string(),
                };
                task.status = TaskStatus::Failed;
                self.metrics.tasks_failed.fetch_add(1, Ordering::Relaxed);
                error!(agent_id = %self.config.id, error = %failure, "task execution failed");
                TaskResult::failure(task.id, e.to_string())
            }
        };

        // stop() may have flipped us Offline mid-execution; leave that alone.
        {
            let mut status = self.status.write().await;
            if *status == AgentStatus::Busy {
                *status = AgentStatus::Idle;
            }
        }

        let completion = TaskCompletion {
            task_id: task.id,
            agent_id: self.config.id.clone(),
            result,
        };
        if self.completions.send(completion).is_err() {
            warn!(
                agent_id = %self.config.id,
                task_id = %task.id,
                "completion channel closed, result dropped"
            );
        }
    }

    async fn message_loop(
        self: Arc<Self>,
        mut inbox: mpsc::UnboundedReceiver<Message>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let message = tokio::select! {
                maybe = inbox.recv() => match maybe {
                    Some(message) => message,
                    None => break,
                },
                _ = shutdown.changed() => break,
            };
            *self.last_active.write().await = Utc::now();
            debug!(
                agent_id = %self.config.id,
                message_id = %message.id,
                message_type = %message.message_type,
                sender = %message.sender,
                "message received"
            );
            match self.behavior.handle_message(&message).await {
                Ok(response) => {
                    self.metrics.messages_handled.fetch_add(1, Ordering::Relaxed);
                    if let Some(response) = response {
                        // Responses are not auto-routed.
                        debug!(
                            agent_id = %self.config.id,
                            response_id = %response.id,
                            correlation_id = ?response.correlation_id,
                            "handler response dropped"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        agent_id = %self.config.id,
                        message_id = %message.id,
                        error = %e,
                        "message handler failed, message dropped"
                    );
                }
            }
        }
        debug!(agent_id = %self.config.id, "message loop exited");
    }
}
