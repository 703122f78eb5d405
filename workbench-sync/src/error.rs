//! Error types for workbench-sync.

use thiserror::Error;

use workbench_core::RemoteError;

use crate::ledger::LedgerError;

/// All errors that can arise from workspace operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A remote collaborator failed or declined the request.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The directory cache has never seen this path.
    #[error("unknown node: {path}")]
    UnknownNode { path: String },

    /// Only folders can be expanded.
    #[error("not a folder: {path}")]
    NotAFolder { path: String },

    /// No buffer is open for this path.
    #[error("no open buffer for {path}")]
    BufferNotOpen { path: String },

    #[error("no active buffer")]
    NoActiveBuffer,

    /// The task ledger refused the transition.
    #[error("task ledger: {0}")]
    Ledger(#[from] LedgerError),
}

pub(crate) fn unknown_node(path: impl Into<String>) -> SyncError {
    SyncError::UnknownNode { path: path.into() }
}

pub(crate) fn buffer_not_open(path: impl Into<String>) -> SyncError {
    SyncError::BufferNotOpen { path: path.into() }
}
