//! Directory cache — lazily-populated mirror of the remote file tree.
//!
//! `list` is the only read primitive and every listing fully replaces the
//! listed node's children. A loaded node is never re-listed on its own: it
//! goes stale until a mutation marks it unloaded or [`DirectoryCache::invalidate_subtree`]
//! is called.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use workbench_core::{paths, DirEntry, FileStore, Node, NodeKind};

use crate::error::{unknown_node, SyncError};
use crate::events::{EventBus, WorkspaceEvent};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    kind: NodeKind,
    loaded: bool,
    expanded: bool,
    children: Vec<String>,
}

impl Entry {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            loaded: false,
            expanded: false,
            children: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct TreeState {
    root: String,
    entries: HashMap<String, Entry>,
}

impl TreeState {
    fn new(root: String) -> Self {
        let mut entries = HashMap::new();
        entries.insert(root.clone(), Entry::new(root.clone(), NodeKind::Folder));
        Self { root, entries }
    }

    /// Drop every cached descendant of `path` and install `listing` as its
    /// children. Returns the number of children installed.
    fn replace_children(&mut self, path: &str, listing: Vec<DirEntry>) -> usize {
        self.entries
            .retain(|key, _| key == path || !paths::is_within(key, path));

        let mut seen = HashSet::new();
        let mut children = Vec::with_capacity(listing.len());
        for entry in listing {
            let child = paths::join(path, &entry.name);
            if !seen.insert(child.clone()) {
                continue;
            }
            self.entries
                .insert(child.clone(), Entry::new(entry.name, entry.kind));
            children.push(child);
        }

        let count = children.len();
        if let Some(node) = self.entries.get_mut(path) {
            node.children = children;
            node.loaded = true;
            node.expanded = true;
        }
        count
    }

    /// Drop `path` and its cached descendants, and unlink it from its parent.
    /// Returns whether anything was cached under `path`.
    fn evict(&mut self, path: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|key, _| !paths::is_within(key, path));
        if let Some(parent) = self.entries.get_mut(&paths::parent(path)) {
            parent.children.retain(|child| child != path);
        }
        self.entries.len() != before
    }

    fn build(&self, path: &str) -> Option<Node> {
        let entry = self.entries.get(path)?;
        Some(Node {
            path: path.to_owned(),
            name: entry.name.clone(),
            kind: entry.kind,
            children_loaded: entry.loaded,
            expanded: entry.expanded,
            children: entry
                .children
                .iter()
                .filter_map(|child| self.build(child))
                .collect(),
        })
    }
}

/// Cloneable handle to the directory cache.
#[derive(Clone)]
pub struct DirectoryCache {
    store: Arc<dyn FileStore>,
    state: Arc<RwLock<TreeState>>,
    events: EventBus,
}

impl DirectoryCache {
    pub fn new(store: Arc<dyn FileStore>, root: &str, events: EventBus) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(TreeState::new(paths::normalize(root)))),
            events,
        }
    }

    /// Path of the tree root.
    pub async fn root(&self) -> String {
        self.state.read().await.root.clone()
    }

    /// Expand or collapse a folder; returns whether it is now expanded.
    ///
    /// Unloaded folders are listed and revealed. Loaded folders only toggle
    /// visibility, with no remote call. A failed listing reveals the folder
    /// empty and leaves it unloaded so the next expand retries.
    pub async fn expand(&self, path: &str) -> Result<bool, SyncError> {
        let path = paths::normalize(path);
        {
            let mut state = self.state.write().await;
            let entry = state
                .entries
                .get_mut(&path)
                .ok_or_else(|| unknown_node(&path))?;
            if entry.kind != NodeKind::Folder {
                return Err(SyncError::NotAFolder { path });
            }
            if entry.loaded {
                entry.expanded = !entry.expanded;
                let expanded = entry.expanded;
                let children = entry.children.len();
                drop(state);
                self.events.emit(if expanded {
                    WorkspaceEvent::NodeExpanded { path, children }
                } else {
                    WorkspaceEvent::NodeCollapsed { path }
                });
                return Ok(expanded);
            }
        }

        tracing::debug!(path = %path, "listing folder");
        let listing = self.store.list(&path).await;

        let mut state = self.state.write().await;
        if !state.entries.contains_key(&path) {
            // Replaced by a newer listing of an ancestor while we waited.
            tracing::debug!(path = %path, "discarding listing for evicted node");
            return Err(unknown_node(&path));
        }
        match listing {
            Ok(listing) => {
                let children = state.replace_children(&path, listing);
                drop(state);
                self.events
                    .emit(WorkspaceEvent::NodeExpanded { path, children });
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "listing failed; showing empty folder");
                state.replace_children(&path, Vec::new());
                if let Some(entry) = state.entries.get_mut(&path) {
                    entry.loaded = false;
                }
                drop(state);
                self.events.emit(WorkspaceEvent::ListingFailed {
                    path,
                    error: err.to_string(),
                });
            }
        }
        Ok(true)
    }

    /// Create a file or folder at `path`; the parent is re-listed on its next expand.
    pub async fn create_entry(&self, path: &str, kind: NodeKind) -> Result<(), SyncError> {
        let path = paths::normalize(path);
        self.store.create_entry(&path, kind).await?;
        tracing::info!(path = %path, kind = %kind, "created entry");
        self.mark_unloaded(&paths::parent(&path)).await;
        Ok(())
    }

    /// Rename `old_path` to `new_path`. The old subtree leaves the cache and
    /// both parents are re-listed on their next expand.
    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), SyncError> {
        let old_path = paths::normalize(old_path);
        let new_path = paths::normalize(new_path);
        self.store.rename(&old_path, &new_path).await?;
        tracing::info!(from = %old_path, to = %new_path, "renamed entry");
        self.evict(&old_path).await;

        let old_parent = paths::parent(&old_path);
        let new_parent = paths::parent(&new_path);
        self.mark_unloaded(&old_parent).await;
        if new_parent != old_parent {
            self.mark_unloaded(&new_parent).await;
        }
        Ok(())
    }

    /// Delete `path`; its cached subtree is dropped and the parent re-listed
    /// on its next expand.
    pub async fn delete(&self, path: &str) -> Result<(), SyncError> {
        let path = paths::normalize(path);
        self.store.delete(&path).await?;
        tracing::info!(path = %path, "deleted entry");
        self.evict(&path).await;
        self.mark_unloaded(&paths::parent(&path)).await;
        Ok(())
    }

    /// Mark `path` and every cached descendant unloaded. Returns how many
    /// nodes were marked.
    pub async fn invalidate_subtree(&self, path: &str) -> usize {
        let path = paths::normalize(path);
        let mut state = self.state.write().await;
        let mut nodes = 0usize;
        for (key, entry) in state.entries.iter_mut() {
            if paths::is_within(key, &path) {
                entry.loaded = false;
                nodes += 1;
            }
        }
        drop(state);
        tracing::debug!(path = %path, nodes, "invalidated subtree");
        self.events
            .emit(WorkspaceEvent::SubtreeInvalidated { path, nodes });
        nodes
    }

    /// Snapshot of the whole tree.
    pub async fn snapshot(&self) -> Node {
        let state = self.state.read().await;
        state.build(&state.root).unwrap_or_else(|| Node {
            path: state.root.clone(),
            name: state.root.clone(),
            kind: NodeKind::Folder,
            children_loaded: false,
            expanded: false,
            children: Vec::new(),
        })
    }

    /// Snapshot of the subtree at `path`, if cached.
    pub async fn node(&self, path: &str) -> Option<Node> {
        let path = paths::normalize(path);
        self.state.read().await.build(&path)
    }

    pub async fn is_loaded(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        self.state
            .read()
            .await
            .entries
            .get(&path)
            .is_some_and(|entry| entry.loaded)
    }

    async fn evict(&self, path: &str) {
        let mut state = self.state.write().await;
        if path == state.root {
            return;
        }
        if state.evict(path) {
            tracing::debug!(path = %path, "evicted cached subtree");
        }
    }

    async fn mark_unloaded(&self, path: &str) {
        let mut state = self.state.write().await;
        let Some(entry) = state.entries.get_mut(path) else {
            return;
        };
        entry.loaded = false;
        drop(state);
        self.events.emit(WorkspaceEvent::NodeInvalidated {
            path: path.to_owned(),
        });
    }
}
