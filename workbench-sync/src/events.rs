//! Workspace event hooks.
//!
//! Every state transition publishes a [`WorkspaceEvent`] on a broadcast
//! channel. Publishing never blocks and never fails: with no subscribers the
//! event is dropped, and a lagging subscriber loses the oldest events.

use serde::Serialize;
use tokio::sync::broadcast;

use workbench_core::{SaveState, TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    NodeExpanded { path: String, children: usize },
    NodeCollapsed { path: String },
    ListingFailed { path: String, error: String },
    NodeInvalidated { path: String },
    SubtreeInvalidated { path: String, nodes: usize },
    BufferOpened { path: String },
    BufferActivated { path: Option<String> },
    BufferEdited { path: String },
    BufferClosed { path: String },
    SaveStateChanged { path: String, state: SaveState },
    BuffersResynced { paths: Vec<String> },
    OutputReplaced { path: String, lines: usize },
    TaskAdmitted { id: TaskId },
    TaskStarted { id: TaskId },
    TaskCompleted { id: TaskId, status: TaskStatus },
    ConversationReset,
}

/// Cloneable publishing half of the event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WorkspaceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: WorkspaceEvent) {
        tracing::trace!(?event, "workspace event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Drain every event currently buffered for `rx`.
pub fn drain(rx: &mut broadcast::Receiver<WorkspaceEvent>) -> Vec<WorkspaceEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event subscriber lagged");
            }
            Err(_) => break,
        }
    }
    events
}
