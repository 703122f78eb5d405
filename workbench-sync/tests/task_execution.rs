use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use workbench_core::{
    AdvisorReply, DirEntry, FileStore, NodeKind, RawTask, RemoteError, Sender, Task, TaskId,
    TaskService, TaskStatus, WorkbenchConfig,
};
use workbench_remote::{MemoryFileStore, ScriptedTaskService, StoreOp};
use workbench_sync::conversation::ADVISOR_UNREACHABLE;
use workbench_sync::{DirectoryCache, LedgerError, SyncError, Workspace};

/// Store that records, for every read, whether the tree root was still
/// marked loaded at that moment.
struct RecordingStore {
    inner: Arc<MemoryFileStore>,
    tree: OnceLock<DirectoryCache>,
    reads: Mutex<Vec<(String, bool)>>,
}

impl RecordingStore {
    fn new(inner: Arc<MemoryFileStore>) -> Self {
        Self {
            inner,
            tree: OnceLock::new(),
            reads: Mutex::new(Vec::new()),
        }
    }

    fn reads(&self) -> Vec<(String, bool)> {
        self.reads.lock().expect("reads").clone()
    }
}

#[async_trait]
impl FileStore for RecordingStore {
    async fn list(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        self.inner.list(path).await
    }

    async fn read_file(&self, path: &str) -> Result<String, RemoteError> {
        if let Some(tree) = self.tree.get() {
            let loaded = tree.is_loaded(".").await;
            self.reads
                .lock()
                .expect("reads")
                .push((path.to_owned(), loaded));
        }
        self.inner.read_file(path).await
    }

    async fn save_file(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.inner.save_file(path, content).await
    }

    async fn create_entry(&self, path: &str, kind: NodeKind) -> Result<(), RemoteError> {
        self.inner.create_entry(path, kind).await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), RemoteError> {
        self.inner.rename(old_path, new_path).await
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.inner.delete(path).await
    }
}

/// Task service whose executions wait for a permit.
struct GatedTasks {
    gate: Semaphore,
}

impl GatedTasks {
    fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
        }
    }
}

#[async_trait]
impl TaskService for GatedTasks {
    async fn send_message(&self, text: &str) -> Result<AdvisorReply, RemoteError> {
        Ok(AdvisorReply {
            reply: format!("echo: {text}"),
            task: None,
            show_execute_button: false,
        })
    }

    async fn execute_task(&self, task: &Task) -> Result<Value, RemoteError> {
        self.gate.acquire().await.expect("gate open").forget();
        Ok(json!({ "ran": task.text }))
    }

    async fn reset_conversation(&self) -> Result<(), RemoteError> {
        Ok(())
    }
}

fn project() -> Arc<MemoryFileStore> {
    Arc::new(
        MemoryFileStore::new()
            .with_file("main.py", "print('hi')\n")
            .with_file("src/app.py", "app = None\n"),
    )
}

fn reply_with_task(text: &str, task: &str) -> AdvisorReply {
    AdvisorReply {
        reply: text.to_owned(),
        task: Some(RawTask::Text(task.to_owned())),
        show_execute_button: true,
    }
}

async fn wait_for_executing(workspace: &Workspace, id: &TaskId) {
    while workspace.conversation().executing().await.as_ref() != Some(id) {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn advisor_reply_with_task_is_admitted() {
    let tasks = Arc::new(ScriptedTaskService::new());
    tasks.push_reply(Ok(reply_with_task("I can add tests.", "add tests")));
    let workspace = Workspace::new(&WorkbenchConfig::default(), project(), tasks.clone());

    let message = workspace
        .conversation()
        .send("please add tests")
        .await
        .expect("reply");
    assert_eq!(message.sender, Sender::Assistant);
    assert!(message.show_execute);

    let admitted = workspace.conversation().tasks().await;
    assert_eq!(admitted.len(), 1);
    assert_eq!(admitted[0].text, "add tests");
    assert_eq!(admitted[0].status, TaskStatus::Proposed);
    assert_eq!(message.task.as_ref(), Some(&admitted[0].id));

    let transcript = workspace.conversation().transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].sender, Sender::User);
    assert_eq!(tasks.messages(), vec!["please add tests".to_string()]);
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let tasks = Arc::new(ScriptedTaskService::new());
    let workspace = Workspace::new(&WorkbenchConfig::default(), project(), tasks.clone());

    assert!(workspace.conversation().send("   ").await.is_none());
    assert!(workspace.conversation().transcript().await.is_empty());
    assert!(tasks.messages().is_empty());
}

#[tokio::test]
async fn unreachable_advisor_appends_error_message() {
    let tasks = Arc::new(ScriptedTaskService::new());
    tasks.push_reply(Err(RemoteError::network("connection refused")));
    let workspace = Workspace::new(&WorkbenchConfig::default(), project(), tasks);

    let message = workspace.conversation().send("hello").await.expect("reply");
    assert_eq!(message.text, ADVISOR_UNREACHABLE);
    assert!(workspace.conversation().tasks().await.is_empty());
}

#[tokio::test]
async fn successful_execution_invalidates_tree_before_refetching_buffers() {
    let files = project();
    let store = Arc::new(RecordingStore::new(files.clone()));
    let tasks = Arc::new(ScriptedTaskService::new());
    tasks.push_execution(Ok(json!({ "changed": ["main.py", "new.py"] })));
    let workspace = Workspace::new(&WorkbenchConfig::default(), store.clone(), tasks.clone());
    store
        .tree
        .set(workspace.tree().clone())
        .unwrap_or_else(|_| panic!("tree set twice"));

    workspace.tree().expand(".").await.expect("expand root");
    workspace.session().open("main.py", "main.py").await;
    workspace.session().open("src/app.py", "app.py").await;
    let before = store.reads();
    assert!(before.iter().all(|(_, loaded)| *loaded));

    let task = workspace
        .conversation()
        .admit(RawTask::Text("rewrite main".into()))
        .await;
    // What the task does on the remote side.
    files.put_file("main.py", "print('rewritten')\n");
    files.put_file("new.py", "");

    workspace
        .conversation()
        .execute(&task.id)
        .await
        .expect("execute");

    let after = store.reads();
    let resync_reads = &after[before.len()..];
    assert_eq!(resync_reads.len(), 2);
    assert!(
        resync_reads.iter().all(|(_, loaded)| !*loaded),
        "buffers refetched only after the tree was invalidated"
    );
    assert_eq!(
        workspace
            .session()
            .buffer("main.py")
            .await
            .expect("open")
            .content,
        "print('rewritten')\n"
    );

    workspace.tree().expand(".").await.expect("relist root");
    assert!(workspace.tree().node("new.py").await.is_some());

    let finished = workspace.conversation().task(&task.id).await.expect("task");
    assert_eq!(finished.status, TaskStatus::Executed);
    let last = workspace
        .conversation()
        .transcript()
        .await
        .pop()
        .expect("message");
    assert!(last.text.starts_with("Task executed. Result: "));
    assert_eq!(tasks.executed(), vec![task.id]);
}

#[tokio::test]
async fn failed_execution_does_not_resync() {
    let files = project();
    let tasks = Arc::new(ScriptedTaskService::new());
    tasks.push_execution(Err(RemoteError::rejected("task crashed")));
    let workspace = Workspace::new(&WorkbenchConfig::default(), files.clone(), tasks);

    workspace.tree().expand(".").await.expect("expand");
    workspace.session().open("main.py", "main.py").await;
    let reads = files.count(StoreOp::Read);

    let task = workspace
        .conversation()
        .admit(RawTask::Text("break things".into()))
        .await;
    let err = workspace
        .conversation()
        .execute(&task.id)
        .await
        .unwrap_err();
    assert_eq!(err, SyncError::Remote(RemoteError::rejected("task crashed")));

    assert_eq!(files.count(StoreOp::Read), reads);
    assert!(workspace.tree().is_loaded(".").await);
    let failed = workspace.conversation().task(&task.id).await.expect("task");
    assert_eq!(failed.status, TaskStatus::Failed);
    let last = workspace
        .conversation()
        .transcript()
        .await
        .pop()
        .expect("message");
    assert!(last.text.starts_with("Task execution failed: "));

    // A failed task may be run again.
    workspace
        .conversation()
        .execute(&task.id)
        .await
        .expect("retry");
}

#[tokio::test]
async fn single_slot_serializes_executions() {
    let tasks = Arc::new(GatedTasks::new());
    let workspace = Workspace::new(&WorkbenchConfig::default(), project(), tasks.clone());
    let t1 = workspace
        .conversation()
        .admit(RawTask::Text("one".into()))
        .await;
    let t2 = workspace
        .conversation()
        .admit(RawTask::Text("two".into()))
        .await;

    let running = tokio::spawn({
        let workspace = workspace.clone();
        let id = t1.id.clone();
        async move { workspace.conversation().execute(&id).await }
    });
    wait_for_executing(&workspace, &t1.id).await;

    assert_eq!(
        workspace.conversation().execute(&t2.id).await,
        Err(SyncError::Ledger(LedgerError::SlotBusy {
            holder: t1.id.clone(),
            requested: t2.id.clone(),
        }))
    );
    assert_eq!(
        workspace.conversation().execute(&t1.id).await,
        Err(SyncError::Ledger(LedgerError::AlreadyExecuting(t1.id.clone())))
    );

    tasks.gate.add_permits(1);
    running.await.expect("join").expect("t1 executes");

    assert_eq!(
        workspace.conversation().execute(&t1.id).await,
        Err(SyncError::Ledger(LedgerError::AlreadyExecuted(t1.id.clone())))
    );
    tasks.gate.add_permits(1);
    workspace
        .conversation()
        .execute(&t2.id)
        .await
        .expect("t2 executes");
}

#[tokio::test]
async fn reset_clears_conversation_but_not_workspace() {
    let tasks = Arc::new(ScriptedTaskService::new());
    tasks.push_reply(Ok(reply_with_task("ok", "do it")));
    let workspace = Workspace::new(&WorkbenchConfig::default(), project(), tasks);

    workspace.tree().expand(".").await.expect("expand");
    workspace.session().open("main.py", "main.py").await;
    workspace.conversation().send("go").await.expect("reply");

    workspace.conversation().reset().await.expect("reset");

    let snapshot = workspace.snapshot().await;
    assert!(snapshot.tasks.is_empty());
    assert!(snapshot.transcript.is_empty());
    assert!(snapshot.tree.children_loaded);
    assert_eq!(snapshot.session.buffers.len(), 1);
}

#[tokio::test]
async fn failed_reset_keeps_conversation() {
    let tasks = Arc::new(ScriptedTaskService::new());
    tasks.push_reply(Ok(reply_with_task("ok", "do it")));
    tasks.push_reset(Err(RemoteError::network("offline")));
    let workspace = Workspace::new(&WorkbenchConfig::default(), project(), tasks);
    workspace.conversation().send("go").await.expect("reply");

    assert!(workspace.conversation().reset().await.is_err());
    assert_eq!(workspace.conversation().tasks().await.len(), 1);
    assert_eq!(workspace.conversation().transcript().await.len(), 2);
}

#[tokio::test]
async fn completion_after_reset_skips_resync() {
    let files = project();
    let tasks = Arc::new(GatedTasks::new());
    let workspace = Workspace::new(&WorkbenchConfig::default(), files.clone(), tasks.clone());
    workspace.tree().expand(".").await.expect("expand");
    workspace.session().open("main.py", "main.py").await;
    let reads = files.count(StoreOp::Read);

    let task = workspace
        .conversation()
        .admit(RawTask::Text("long".into()))
        .await;
    let running = tokio::spawn({
        let workspace = workspace.clone();
        let id = task.id.clone();
        async move { workspace.conversation().execute(&id).await }
    });
    wait_for_executing(&workspace, &task.id).await;

    workspace.conversation().reset().await.expect("reset");
    tasks.gate.add_permits(1);
    let result = running.await.expect("join").expect("remote result");

    assert_eq!(result, json!({ "ran": "long" }));
    assert!(workspace.conversation().tasks().await.is_empty());
    assert_eq!(workspace.conversation().executing().await, None);
    assert!(workspace.tree().is_loaded(".").await);
    assert_eq!(files.count(StoreOp::Read), reads);
}
