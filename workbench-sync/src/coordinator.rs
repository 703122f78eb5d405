//! Post-execution resynchronization.

use crate::session::DocumentSession;
use crate::tree::DirectoryCache;

/// Forces the directory cache and the open buffers back in line with the
/// remote store after a task changed it.
#[derive(Clone)]
pub struct WorkspaceCoordinator {
    tree: DirectoryCache,
    session: DocumentSession,
}

impl WorkspaceCoordinator {
    pub fn new(tree: DirectoryCache, session: DocumentSession) -> Self {
        Self { tree, session }
    }

    /// Invalidate the whole tree, then refetch every open buffer.
    ///
    /// The order is fixed: buffers are never refetched while the tree still
    /// claims to be loaded from before the task ran.
    pub async fn on_task_completed(&self) {
        let root = self.tree.root().await;
        let nodes = self.tree.invalidate_subtree(&root).await;
        let buffers = self.session.resync_all().await;
        tracing::info!(
            invalidated = nodes,
            resynced = buffers.len(),
            "workspace resynchronized after task"
        );
    }
}
