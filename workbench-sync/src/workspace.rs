//! Workspace facade: wires every component to one store, one task service
//! and one event channel. A code runner is optional.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use workbench_core::{
    ChatMessage, CodeRunner, FileStore, Node, Task, TaskService, WorkbenchConfig,
};

use crate::console::OutputConsole;
use crate::conversation::Conversation;
use crate::coordinator::WorkspaceCoordinator;
use crate::events::{EventBus, WorkspaceEvent};
use crate::session::{DocumentSession, SessionSnapshot};
use crate::tree::DirectoryCache;

/// Everything the presentation layer renders, captured at one point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceSnapshot {
    pub tree: Node,
    pub session: SessionSnapshot,
    pub tasks: Vec<Task>,
    pub transcript: Vec<ChatMessage>,
    /// Lines of the last run; empty without a code runner.
    pub output: Vec<String>,
}

#[derive(Clone)]
pub struct Workspace {
    tree: DirectoryCache,
    session: DocumentSession,
    conversation: Conversation,
    coordinator: WorkspaceCoordinator,
    console: Option<OutputConsole>,
    events: EventBus,
}

impl Workspace {
    pub fn new(
        config: &WorkbenchConfig,
        store: Arc<dyn FileStore>,
        tasks: Arc<dyn TaskService>,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        let tree = DirectoryCache::new(Arc::clone(&store), &config.root, events.clone());
        let session = DocumentSession::new(store, config.save_revert_delay(), events.clone());
        let coordinator = WorkspaceCoordinator::new(tree.clone(), session.clone());
        let conversation = Conversation::new(tasks, coordinator.clone(), events.clone());
        Self {
            tree,
            session,
            conversation,
            coordinator,
            console: None,
            events,
        }
    }

    /// Attach a code runner, enabling [`Workspace::console`].
    pub fn with_runner(mut self, runner: Arc<dyn CodeRunner>) -> Self {
        self.console = Some(OutputConsole::new(
            runner,
            self.session.clone(),
            self.events.clone(),
        ));
        self
    }

    pub fn tree(&self) -> &DirectoryCache {
        &self.tree
    }

    pub fn session(&self) -> &DocumentSession {
        &self.session
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn coordinator(&self) -> &WorkspaceCoordinator {
        &self.coordinator
    }

    pub fn console(&self) -> Option<&OutputConsole> {
        self.console.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            tree: self.tree.snapshot().await,
            session: self.session.snapshot().await,
            tasks: self.conversation.tasks().await,
            transcript: self.conversation.transcript().await,
            output: match &self.console {
                Some(console) => console.output().await,
                None => Vec::new(),
            },
        }
    }
}
