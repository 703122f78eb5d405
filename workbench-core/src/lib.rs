//! Workbench core library — domain types, remote service contracts, errors,
//! configuration.
//!
//! - [`types`] — newtypes and domain structs shared by every crate
//! - [`paths`] — `/`-separated store path helpers
//! - [`remote`] — [`FileStore`], [`TaskService`] and [`CodeRunner`] contracts
//! - [`error`] — [`RemoteError`], [`ConfigError`]
//! - [`config`] — load `~/.workbench/config.yaml`

pub mod config;
pub mod error;
pub mod paths;
pub mod remote;
pub mod types;

pub use config::{RemoteConfig, RunnerConfig, WorkbenchConfig};
pub use error::{ConfigError, RemoteError};
pub use remote::{CodeRunner, FileStore, TaskService};
pub use types::{
    AdvisorReply, ChatMessage, DirEntry, Language, Node, NodeKind, OpenBuffer, RawTask, SaveState,
    Sender, Task, TaskId, TaskStatus,
};
