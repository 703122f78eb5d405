//! Contracts the workbench requires of its remote collaborators.
//!
//! Every trait is object-safe (`async_trait`) so the sync layer can hold
//! `Arc<dyn FileStore>` and friends, and tests can swap in in-memory doubles.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RemoteError;
use crate::types::{AdvisorReply, DirEntry, Language, NodeKind, Task};

/// The persistent hierarchical file store.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Immediate children of `path`, in the store's order.
    async fn list(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError>;

    async fn read_file(&self, path: &str) -> Result<String, RemoteError>;

    async fn save_file(&self, path: &str, content: &str) -> Result<(), RemoteError>;

    async fn create_entry(&self, path: &str, kind: NodeKind) -> Result<(), RemoteError>;

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), RemoteError>;

    async fn delete(&self, path: &str) -> Result<(), RemoteError>;
}

/// The advisor and task executor.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Forward a user message; the reply may propose a task.
    async fn send_message(&self, text: &str) -> Result<AdvisorReply, RemoteError>;

    /// Run an admitted task. The result payload is opaque to the workbench.
    async fn execute_task(&self, task: &Task) -> Result<Value, RemoteError>;

    /// Clear the advisor's conversation memory. Never touches file state.
    async fn reset_conversation(&self) -> Result<(), RemoteError>;
}

/// The code-execution sandbox.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    /// Run `source` as a single file and return its combined output, one
    /// entry per line. A language without a runtime is `Rejected`.
    async fn run(&self, language: Language, source: &str) -> Result<Vec<String>, RemoteError>;
}
