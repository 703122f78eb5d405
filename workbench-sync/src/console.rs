//! Output console — runs the active buffer in the code sandbox and keeps the
//! lines of the most recent run.

use std::sync::Arc;

use tokio::sync::RwLock;

use workbench_core::CodeRunner;

use crate::error::SyncError;
use crate::events::{EventBus, WorkspaceEvent};
use crate::session::DocumentSession;

/// First output line when a run could not be carried out.
pub const RUN_ERROR_HEADER: &str = "Error running code:";

/// Cloneable handle to the output console.
#[derive(Clone)]
pub struct OutputConsole {
    runner: Arc<dyn CodeRunner>,
    session: DocumentSession,
    lines: Arc<RwLock<Vec<String>>>,
    events: EventBus,
}

impl OutputConsole {
    pub fn new(runner: Arc<dyn CodeRunner>, session: DocumentSession, events: EventBus) -> Self {
        Self {
            runner,
            session,
            lines: Arc::new(RwLock::new(Vec::new())),
            events,
        }
    }

    /// Run the active buffer's current content and replace the output with
    /// what it printed.
    ///
    /// With no active buffer nothing runs and the output is left alone. A
    /// failed run replaces the output with [`RUN_ERROR_HEADER`] and the
    /// error, and returns the error.
    pub async fn run_active(&self) -> Result<Vec<String>, SyncError> {
        let buffer = self
            .session
            .active_buffer()
            .await
            .ok_or(SyncError::NoActiveBuffer)?;
        tracing::info!(path = %buffer.path, language = %buffer.language, "running buffer");

        let result = self.runner.run(buffer.language, &buffer.content).await;
        let lines = match &result {
            Ok(lines) => lines.clone(),
            Err(err) => {
                tracing::warn!(path = %buffer.path, error = %err, "run failed");
                vec![RUN_ERROR_HEADER.to_owned(), err.to_string()]
            }
        };
        let count = lines.len();
        *self.lines.write().await = lines;
        self.events.emit(WorkspaceEvent::OutputReplaced {
            path: buffer.path,
            lines: count,
        });
        result.map_err(SyncError::from)
    }

    /// Lines of the most recent run.
    pub async fn output(&self) -> Vec<String> {
        self.lines.read().await.clone()
    }
}
