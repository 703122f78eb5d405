//! In-memory collaborators for tests and demos.
//!
//! [`MemoryFileStore`] keeps a flat map of store paths and records every call
//! it receives; failures can be injected per operation or globally with
//! [`MemoryFileStore::set_offline`]. [`ScriptedTaskService`] replays queued
//! advisor replies and execution results; [`ScriptedCodeRunner`] does the
//! same for sandbox runs.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use workbench_core::{
    paths, AdvisorReply, CodeRunner, DirEntry, FileStore, Language, NodeKind, RemoteError, Task,
    TaskId, TaskService,
};

/// Operation names used for failure injection and the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Read,
    Save,
    Create,
    Rename,
    Delete,
}

impl StoreOp {
    fn label(self) -> &'static str {
        match self {
            StoreOp::List => "list",
            StoreOp::Read => "read",
            StoreOp::Save => "save",
            StoreOp::Create => "create",
            StoreOp::Rename => "rename",
            StoreOp::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    File(String),
    Folder,
}

#[derive(Debug, Default)]
struct StoreState {
    items: BTreeMap<String, Item>,
    offline: bool,
    failures: HashMap<StoreOp, VecDeque<RemoteError>>,
    calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryFileStore {
    state: Mutex<StoreState>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryFileStore::put_file`].
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.put_file(path, content);
        self
    }

    /// Builder-style [`MemoryFileStore::put_folder`].
    pub fn with_folder(self, path: &str) -> Self {
        self.put_folder(path);
        self
    }

    /// Write a file out-of-band (as another client or a task would),
    /// creating missing parent folders.
    pub fn put_file(&self, path: &str, content: &str) {
        let path = paths::normalize(path);
        let mut state = self.lock();
        ensure_parents(&mut state.items, &path);
        state.items.insert(path, Item::File(content.to_owned()));
    }

    /// Create a folder out-of-band, including missing parents.
    pub fn put_folder(&self, path: &str) {
        let path = paths::normalize(path);
        if path == paths::ROOT {
            return;
        }
        let mut state = self.lock();
        ensure_parents(&mut state.items, &path);
        state.items.insert(path, Item::Folder);
    }

    /// Remove an entry out-of-band.
    pub fn remove(&self, path: &str) {
        let path = paths::normalize(path);
        self.lock()
            .items
            .retain(|key, _| !paths::is_within(key, &path));
    }

    pub fn file(&self, path: &str) -> Option<String> {
        match self.lock().items.get(&paths::normalize(path)) {
            Some(Item::File(content)) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        path == paths::ROOT || self.lock().items.contains_key(&path)
    }

    /// Every subsequent call fails with `NetworkFailure` until turned off.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Queue a failure for the next call of `op`.
    pub fn fail_next(&self, op: StoreOp, error: RemoteError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Calls received so far, as `"<op> <path>"`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Number of calls of `op` received so far.
    pub fn count(&self, op: StoreOp) -> usize {
        let prefix = format!("{} ", op.label());
        self.lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and apply injected failures.
    fn enter(&self, op: StoreOp, path: &str) -> Result<MutexGuard<'_, StoreState>, RemoteError> {
        let mut state = self.lock();
        state.calls.push(format!("{} {path}", op.label()));
        if state.offline {
            return Err(RemoteError::network("store offline"));
        }
        if let Some(error) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        Ok(state)
    }
}

fn ensure_parents(items: &mut BTreeMap<String, Item>, path: &str) {
    let mut parent = paths::parent(path);
    while parent != paths::ROOT {
        items.entry(parent.clone()).or_insert(Item::Folder);
        parent = paths::parent(&parent);
    }
}

fn is_folder(items: &BTreeMap<String, Item>, path: &str) -> bool {
    path == paths::ROOT || matches!(items.get(path), Some(Item::Folder))
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn list(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        let path = paths::normalize(path);
        let state = self.enter(StoreOp::List, &path)?;
        if !is_folder(&state.items, &path) {
            return Err(RemoteError::not_found(path));
        }
        let mut entries: Vec<DirEntry> = state
            .items
            .iter()
            .filter(|(key, _)| key.as_str() != path && paths::parent(key) == path)
            .map(|(key, item)| DirEntry {
                name: paths::file_name(key).to_owned(),
                kind: match item {
                    Item::File(_) => NodeKind::File,
                    Item::Folder => NodeKind::Folder,
                },
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.kind != NodeKind::Folder, &a.name).cmp(&(b.kind != NodeKind::Folder, &b.name))
        });
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> Result<String, RemoteError> {
        let path = paths::normalize(path);
        let state = self.enter(StoreOp::Read, &path)?;
        match state.items.get(&path) {
            Some(Item::File(content)) => Ok(content.clone()),
            Some(Item::Folder) => Err(RemoteError::rejected(format!("{path} is a folder"))),
            None => Err(RemoteError::not_found(path)),
        }
    }

    async fn save_file(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        let path = paths::normalize(path);
        let mut state = self.enter(StoreOp::Save, &path)?;
        if !is_folder(&state.items, &paths::parent(&path)) {
            return Err(RemoteError::not_found(paths::parent(&path)));
        }
        if matches!(state.items.get(&path), Some(Item::Folder)) {
            return Err(RemoteError::rejected(format!("{path} is a folder")));
        }
        state.items.insert(path, Item::File(content.to_owned()));
        Ok(())
    }

    async fn create_entry(&self, path: &str, kind: NodeKind) -> Result<(), RemoteError> {
        let path = paths::normalize(path);
        let mut state = self.enter(StoreOp::Create, &path)?;
        if !is_folder(&state.items, &paths::parent(&path)) {
            return Err(RemoteError::not_found(paths::parent(&path)));
        }
        if path == paths::ROOT || state.items.contains_key(&path) {
            return Err(RemoteError::rejected(format!("{path} already exists")));
        }
        let item = match kind {
            NodeKind::File => Item::File(String::new()),
            NodeKind::Folder => Item::Folder,
        };
        state.items.insert(path, item);
        Ok(())
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), RemoteError> {
        let old_path = paths::normalize(old_path);
        let new_path = paths::normalize(new_path);
        let mut state = self.enter(StoreOp::Rename, &old_path)?;
        if !state.items.contains_key(&old_path) {
            return Err(RemoteError::not_found(old_path));
        }
        if state.items.contains_key(&new_path) {
            return Err(RemoteError::rejected(format!("{new_path} already exists")));
        }
        if !is_folder(&state.items, &paths::parent(&new_path)) {
            return Err(RemoteError::not_found(paths::parent(&new_path)));
        }
        let moved: Vec<(String, Item)> = state
            .items
            .iter()
            .filter(|(key, _)| paths::is_within(key, &old_path))
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect();
        for (key, item) in moved {
            state.items.remove(&key);
            let suffix = &key[old_path.len()..];
            state.items.insert(format!("{new_path}{suffix}"), item);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        let path = paths::normalize(path);
        let mut state = self.enter(StoreOp::Delete, &path)?;
        if path == paths::ROOT {
            return Err(RemoteError::rejected("cannot delete the root"));
        }
        if !state.items.contains_key(&path) {
            return Err(RemoteError::not_found(path));
        }
        state.items.retain(|key, _| !paths::is_within(key, &path));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<Result<AdvisorReply, RemoteError>>,
    executions: VecDeque<Result<Value, RemoteError>>,
    resets: VecDeque<Result<(), RemoteError>>,
    executed: Vec<TaskId>,
    messages: Vec<String>,
}

/// Task service that replays queued responses.
///
/// With nothing queued, `send_message` fails with `NetworkFailure`,
/// `execute_task` succeeds with `{"status":"ok"}` and `reset_conversation`
/// acknowledges.
#[derive(Debug, Default)]
pub struct ScriptedTaskService {
    state: Mutex<ScriptState>,
}

impl ScriptedTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: Result<AdvisorReply, RemoteError>) {
        self.lock().replies.push_back(reply);
    }

    pub fn push_execution(&self, result: Result<Value, RemoteError>) {
        self.lock().executions.push_back(result);
    }

    pub fn push_reset(&self, result: Result<(), RemoteError>) {
        self.lock().resets.push_back(result);
    }

    /// Ids passed to `execute_task`, in call order.
    pub fn executed(&self) -> Vec<TaskId> {
        self.lock().executed.clone()
    }

    /// Texts passed to `send_message`, in call order.
    pub fn messages(&self) -> Vec<String> {
        self.lock().messages.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TaskService for ScriptedTaskService {
    async fn send_message(&self, text: &str) -> Result<AdvisorReply, RemoteError> {
        let mut state = self.lock();
        state.messages.push(text.to_owned());
        state
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::network("no scripted reply")))
    }

    async fn execute_task(&self, task: &Task) -> Result<Value, RemoteError> {
        let mut state = self.lock();
        state.executed.push(task.id.clone());
        state
            .executions
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "status": "ok" })))
    }

    async fn reset_conversation(&self) -> Result<(), RemoteError> {
        self.lock().resets.pop_front().unwrap_or(Ok(()))
    }
}

/// Code runner that replays queued outputs; with nothing queued a run
/// produces no output.
#[derive(Debug, Default)]
pub struct ScriptedCodeRunner {
    outputs: Mutex<VecDeque<Result<Vec<String>, RemoteError>>>,
    runs: Mutex<Vec<(Language, String)>>,
}

impl ScriptedCodeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_output(&self, output: Result<Vec<String>, RemoteError>) {
        relock(&self.outputs).push_back(output);
    }

    /// Language and source of every run, in call order.
    pub fn runs(&self) -> Vec<(Language, String)> {
        relock(&self.runs).clone()
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CodeRunner for ScriptedCodeRunner {
    async fn run(&self, language: Language, source: &str) -> Result<Vec<String>, RemoteError> {
        relock(&self.runs).push((language, source.to_owned()));
        relock(&self.outputs)
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}
