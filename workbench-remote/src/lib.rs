//! Remote collaborators for the workbench sync core.
//!
//! - [`http`] — [`HttpBackend`], the JSON-over-HTTP file store, task service
//!   and code runner
//! - [`local`] — [`LocalFileStore`], a file store over a local directory
//! - [`memory`] — in-memory store, scripted task service and code runner for tests

pub mod http;
pub mod local;
pub mod memory;

pub use http::HttpBackend;
pub use local::LocalFileStore;
pub use memory::{MemoryFileStore, ScriptedCodeRunner, ScriptedTaskService, StoreOp};
