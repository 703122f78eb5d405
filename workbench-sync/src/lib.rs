//! # workbench-sync
//!
//! Client-side synchronization core: keeps a lazily-loaded mirror of the
//! remote file tree, the set of open documents, and the advisor's task
//! ledger consistent with each other.
//!
//! Build a [`Workspace`] from a [`workbench_core::FileStore`] and a
//! [`workbench_core::TaskService`] (plus, to run code, a
//! [`workbench_core::CodeRunner`]), or use the components on their own.

pub mod console;
pub mod conversation;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod ledger;
pub mod session;
pub mod tree;
mod workspace;

pub use console::OutputConsole;
pub use conversation::Conversation;
pub use coordinator::WorkspaceCoordinator;
pub use error::SyncError;
pub use events::{EventBus, WorkspaceEvent};
pub use ledger::{ExecutionOutcome, ExecutionSlot, LedgerError, TaskLedger};
pub use session::{DocumentSession, SaveIndicator, SessionSnapshot};
pub use tree::DirectoryCache;
pub use workspace::{Workspace, WorkspaceSnapshot};
