//! Advisor conversation: transcript, task admission, and task execution.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use workbench_core::{ChatMessage, RawTask, Task, TaskId, TaskService, TaskStatus};

use crate::coordinator::WorkspaceCoordinator;
use crate::error::SyncError;
use crate::events::{EventBus, WorkspaceEvent};
use crate::ledger::{ExecutionOutcome, TaskLedger};

/// Assistant text appended when the advisor cannot be reached.
pub const ADVISOR_UNREACHABLE: &str = "Error: Could not reach backend.";

#[derive(Debug, Default)]
struct ConversationState {
    transcript: Vec<ChatMessage>,
    ledger: TaskLedger,
}

/// Cloneable handle to the conversation.
#[derive(Clone)]
pub struct Conversation {
    service: Arc<dyn TaskService>,
    state: Arc<RwLock<ConversationState>>,
    coordinator: WorkspaceCoordinator,
    events: EventBus,
}

impl Conversation {
    pub fn new(
        service: Arc<dyn TaskService>,
        coordinator: WorkspaceCoordinator,
        events: EventBus,
    ) -> Self {
        Self {
            service,
            state: Arc::new(RwLock::new(ConversationState::default())),
            coordinator,
            events,
        }
    }

    /// Send a user message and append the advisor's reply.
    ///
    /// Blank input is ignored. Returns the appended assistant message.
    pub async fn send(&self, text: &str) -> Option<ChatMessage> {
        if text.trim().is_empty() {
            return None;
        }
        self.state
            .write()
            .await
            .transcript
            .push(ChatMessage::user(text));

        let reply = match self.service.send_message(text).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "advisor unreachable");
                let message = ChatMessage::assistant(ADVISOR_UNREACHABLE);
                self.state.write().await.transcript.push(message.clone());
                return Some(message);
            }
        };

        let mut message = ChatMessage::assistant(reply.reply);
        message.show_execute = reply.show_execute_button;
        let admitted = {
            let mut state = self.state.write().await;
            let admitted = reply.task.map(|raw| state.ledger.admit(raw));
            message.task = admitted.as_ref().map(|task| task.id.clone());
            state.transcript.push(message.clone());
            admitted
        };
        if let Some(task) = admitted {
            tracing::debug!(task_id = %task.id, "task admitted");
            self.events
                .emit(WorkspaceEvent::TaskAdmitted { id: task.id });
        }
        Some(message)
    }

    /// Admit a task payload directly (e.g. when a transcript is redisplayed).
    pub async fn admit(&self, raw: RawTask) -> Task {
        let task = self.state.write().await.ledger.admit(raw);
        self.events
            .emit(WorkspaceEvent::TaskAdmitted { id: task.id.clone() });
        task
    }

    /// Execute an admitted task.
    ///
    /// Success appends the result to the transcript, marks the task
    /// `executed` and resynchronizes the workspace. Failure appends the error
    /// and marks the task `failed`; nothing is resynchronized. A completion
    /// that lands after [`Conversation::reset`] only returns its result.
    pub async fn execute(&self, id: &TaskId) -> Result<Value, SyncError> {
        let task = self.state.write().await.ledger.begin_execution(id)?;
        tracing::info!(task_id = %id, "executing task");
        self.events
            .emit(WorkspaceEvent::TaskStarted { id: id.clone() });

        match self.service.execute_task(&task).await {
            Ok(result) => {
                let completed = {
                    let mut state = self.state.write().await;
                    let completed = state
                        .ledger
                        .complete_execution(id, ExecutionOutcome::Succeeded);
                    if completed.is_ok() {
                        state
                            .transcript
                            .push(ChatMessage::system(format!("Task executed. Result: {result}")));
                    }
                    completed
                };
                match completed {
                    Ok(status) => {
                        self.events.emit(WorkspaceEvent::TaskCompleted {
                            id: id.clone(),
                            status,
                        });
                        self.coordinator.on_task_completed().await;
                    }
                    Err(err) => {
                        tracing::warn!(task_id = %id, error = %err, "ledger reset during execution; skipping resync");
                    }
                }
                Ok(result)
            }
            Err(err) => {
                tracing::warn!(task_id = %id, error = %err, "task execution failed");
                let completed = {
                    let mut state = self.state.write().await;
                    let completed = state
                        .ledger
                        .complete_execution(id, ExecutionOutcome::Failed);
                    if completed.is_ok() {
                        state
                            .transcript
                            .push(ChatMessage::system(format!("Task execution failed: {err}")));
                    }
                    completed
                };
                if completed.is_ok() {
                    self.events.emit(WorkspaceEvent::TaskCompleted {
                        id: id.clone(),
                        status: TaskStatus::Failed,
                    });
                }
                Err(err.into())
            }
        }
    }

    /// Ask the advisor to forget the conversation, then clear the transcript
    /// and the ledger. On failure nothing local changes.
    pub async fn reset(&self) -> Result<(), SyncError> {
        self.service.reset_conversation().await?;
        {
            let mut state = self.state.write().await;
            state.transcript.clear();
            state.ledger.reset();
        }
        tracing::info!("conversation reset");
        self.events.emit(WorkspaceEvent::ConversationReset);
        Ok(())
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.state.read().await.transcript.clone()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.ledger.tasks().to_vec()
    }

    pub async fn task(&self, id: &TaskId) -> Option<Task> {
        self.state.read().await.ledger.get(id).cloned()
    }

    /// Task currently holding the execution slot.
    pub async fn executing(&self) -> Option<TaskId> {
        self.state.read().await.ledger.slot().holder().cloned()
    }
}
