//! Document session — open buffers, active selection, save indicator.
//!
//! Invariants:
//! - at most one [`OpenBuffer`] per path, even when two `open`s overlap;
//! - reopening an open path returns the existing buffer untouched;
//! - saves are unfenced: the indicator shows whichever response lands last.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;

use workbench_core::{paths, FileStore, OpenBuffer, SaveState};

use crate::error::{buffer_not_open, SyncError};
use crate::events::{EventBus, WorkspaceEvent};

/// Content shown when a file cannot be read.
pub const LOAD_ERROR_PLACEHOLDER: &str = "// Error loading file";

/// Which buffer the save indicator refers to, and its state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SaveIndicator {
    pub path: Option<String>,
    pub state: SaveState,
}

/// Read-only view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub buffers: Vec<OpenBuffer>,
    pub active: Option<String>,
    pub save: SaveIndicator,
}

struct Fetched {
    content: String,
    failed: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    buffers: Vec<OpenBuffer>,
    active: Option<String>,
    save: SaveIndicator,
    /// Bumped on every save attempt; a pending revert only fires if it is unchanged.
    save_epoch: u64,
}

impl SessionState {
    fn find(&self, path: &str) -> Option<&OpenBuffer> {
        self.buffers.iter().find(|b| b.path == path)
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut OpenBuffer> {
        self.buffers.iter_mut().find(|b| b.path == path)
    }
}

/// Cloneable handle to the document session.
#[derive(Clone)]
pub struct DocumentSession {
    store: Arc<dyn FileStore>,
    state: Arc<RwLock<SessionState>>,
    events: EventBus,
    revert_delay: Duration,
}

impl DocumentSession {
    pub fn new(store: Arc<dyn FileStore>, revert_delay: Duration, events: EventBus) -> Self {
        Self {
            store,
            state: Arc::new(RwLock::new(SessionState::default())),
            events,
            revert_delay,
        }
    }

    /// Open `path` and make it active.
    ///
    /// An already-open path is returned as-is, without refetching. A read
    /// failure opens the buffer with [`LOAD_ERROR_PLACEHOLDER`] and
    /// `load_failed` set.
    pub async fn open(&self, path: &str, name: &str) -> OpenBuffer {
        let path = paths::normalize(path);
        if let Some(existing) = self.reuse(&path).await {
            return existing;
        }

        let fetched = self.fetch(&path).await;

        let mut state = self.state.write().await;
        if let Some(existing) = state.find(&path).cloned() {
            // An overlapping open landed first; keep its buffer.
            state.active = Some(path.clone());
            drop(state);
            self.events
                .emit(WorkspaceEvent::BufferActivated { path: Some(path) });
            return existing;
        }
        let mut buffer = OpenBuffer::new(path.clone(), name, fetched.content);
        buffer.load_failed = fetched.failed;
        state.buffers.push(buffer.clone());
        state.active = Some(path.clone());
        drop(state);

        tracing::debug!(path = %path, language = %buffer.language, "opened buffer");
        self.events
            .emit(WorkspaceEvent::BufferOpened { path: path.clone() });
        self.events
            .emit(WorkspaceEvent::BufferActivated { path: Some(path) });
        buffer
    }

    /// Switch the active selection to an open buffer.
    pub async fn activate(&self, path: &str) -> Result<(), SyncError> {
        let path = paths::normalize(path);
        let mut state = self.state.write().await;
        if state.find(&path).is_none() {
            return Err(buffer_not_open(path));
        }
        state.active = Some(path.clone());
        drop(state);
        self.events
            .emit(WorkspaceEvent::BufferActivated { path: Some(path) });
        Ok(())
    }

    /// Replace a buffer's content in place.
    pub async fn edit(&self, path: &str, content: impl Into<String>) -> Result<(), SyncError> {
        let path = paths::normalize(path);
        let mut state = self.state.write().await;
        let buffer = state
            .find_mut(&path)
            .ok_or_else(|| buffer_not_open(&path))?;
        buffer.content = content.into();
        buffer.load_failed = false;
        drop(state);
        self.events.emit(WorkspaceEvent::BufferEdited { path });
        Ok(())
    }

    /// Close a buffer. Returns `false` if it was not open.
    ///
    /// Closing the active buffer activates the first remaining buffer in
    /// session order, or nothing. A save indicator pointing at the closed
    /// buffer drops back to idle and any pending revert is cancelled.
    pub async fn close(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        let mut state = self.state.write().await;
        let Some(index) = state.buffers.iter().position(|b| b.path == path) else {
            return false;
        };
        state.buffers.remove(index);
        let reassigned = if state.active.as_deref() == Some(path.as_str()) {
            state.active = state.buffers.first().map(|b| b.path.clone());
            Some(state.active.clone())
        } else {
            None
        };
        let cleared = if state.save.path.as_deref() == Some(path.as_str()) {
            state.save_epoch += 1;
            std::mem::replace(&mut state.save.state, SaveState::Idle) != SaveState::Idle
        } else {
            false
        };
        drop(state);

        tracing::debug!(path = %path, "closed buffer");
        if cleared {
            self.emit_save_state(&path, SaveState::Idle);
        }
        self.events.emit(WorkspaceEvent::BufferClosed { path });
        if let Some(active) = reassigned {
            self.events
                .emit(WorkspaceEvent::BufferActivated { path: active });
        }
        true
    }

    /// Save a buffer's current content.
    ///
    /// The indicator goes `saving` → `saved` (then back to `idle` after the
    /// revert delay) or `saving` → `failed`, which sticks until the next
    /// attempt. If the buffer was closed while the request was in flight the
    /// response is discarded, but its outcome is still returned.
    pub async fn save(&self, path: &str) -> Result<(), SyncError> {
        let path = paths::normalize(path);
        let content = {
            let mut state = self.state.write().await;
            let content = state
                .find(&path)
                .map(|b| b.content.clone())
                .ok_or_else(|| buffer_not_open(&path))?;
            state.save_epoch += 1;
            state.save = SaveIndicator {
                path: Some(path.clone()),
                state: SaveState::Saving,
            };
            content
        };
        self.emit_save_state(&path, SaveState::Saving);

        let result = self.store.save_file(&path, &content).await;

        let mut state = self.state.write().await;
        if state.find(&path).is_none() {
            tracing::debug!(path = %path, "buffer closed during save; discarding response");
            return result.map_err(SyncError::from);
        }
        match result {
            Ok(()) => {
                state.save = SaveIndicator {
                    path: Some(path.clone()),
                    state: SaveState::Saved,
                };
                let epoch = state.save_epoch;
                drop(state);
                tracing::info!(path = %path, "saved buffer");
                self.emit_save_state(&path, SaveState::Saved);
                self.schedule_revert(epoch);
                Ok(())
            }
            Err(err) => {
                state.save = SaveIndicator {
                    path: Some(path.clone()),
                    state: SaveState::Failed,
                };
                drop(state);
                tracing::warn!(path = %path, error = %err, "save failed");
                self.emit_save_state(&path, SaveState::Failed);
                Err(err.into())
            }
        }
    }

    /// Refetch every open buffer, discarding local edits. Returns the paths
    /// that were refreshed; buffers closed while the reads were in flight are
    /// skipped.
    pub async fn resync_all(&self) -> Vec<String> {
        let open: Vec<String> = {
            let state = self.state.read().await;
            state.buffers.iter().map(|b| b.path.clone()).collect()
        };

        let fetched = join_all(open.into_iter().map(|path| async move {
            let fetched = self.fetch(&path).await;
            (path, fetched)
        }))
        .await;

        let mut state = self.state.write().await;
        let mut refreshed = Vec::with_capacity(fetched.len());
        for (path, fetched) in fetched {
            if let Some(buffer) = state.find_mut(&path) {
                buffer.content = fetched.content;
                buffer.load_failed = fetched.failed;
                refreshed.push(path);
            }
        }
        drop(state);

        tracing::debug!(count = refreshed.len(), "resynced open buffers");
        self.events.emit(WorkspaceEvent::BuffersResynced {
            paths: refreshed.clone(),
        });
        refreshed
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            buffers: state.buffers.clone(),
            active: state.active.clone(),
            save: state.save.clone(),
        }
    }

    pub async fn buffer(&self, path: &str) -> Option<OpenBuffer> {
        let path = paths::normalize(path);
        self.state.read().await.find(&path).cloned()
    }

    pub async fn active_buffer(&self) -> Option<OpenBuffer> {
        let state = self.state.read().await;
        state.active.as_deref().and_then(|p| state.find(p)).cloned()
    }

    pub async fn save_indicator(&self) -> SaveIndicator {
        self.state.read().await.save.clone()
    }

    async fn reuse(&self, path: &str) -> Option<OpenBuffer> {
        let mut state = self.state.write().await;
        let existing = state.find(path).cloned()?;
        state.active = Some(path.to_owned());
        drop(state);
        self.events.emit(WorkspaceEvent::BufferActivated {
            path: Some(path.to_owned()),
        });
        Some(existing)
    }

    async fn fetch(&self, path: &str) -> Fetched {
        match self.store.read_file(path).await {
            Ok(content) => Fetched {
                content,
                failed: false,
            },
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "read failed; using placeholder");
                Fetched {
                    content: LOAD_ERROR_PLACEHOLDER.to_owned(),
                    failed: true,
                }
            }
        }
    }

    fn schedule_revert(&self, epoch: u64) {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let delay = self.revert_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = state.write().await;
            if state.save_epoch != epoch || state.save.state != SaveState::Saved {
                return;
            }
            state.save.state = SaveState::Idle;
            let path = state.save.path.clone();
            drop(state);
            if let Some(path) = path {
                events.emit(WorkspaceEvent::SaveStateChanged {
                    path,
                    state: SaveState::Idle,
                });
            }
        });
    }

    fn emit_save_state(&self, path: &str, state: SaveState) {
        self.events.emit(WorkspaceEvent::SaveStateChanged {
            path: path.to_owned(),
            state,
        });
    }
}
