//! Domain types for the workbench.
//!
//! Store paths are plain `String`s in the `/`-separated form described in
//! [`crate::paths`]; they name remote entries, not local files.
//! All types are serializable/deserializable via serde.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::paths;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for an advisor-proposed task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Mint a fresh id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Kind of a remote directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    #[serde(alias = "directory", alias = "dir")]
    Folder,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::File => write!(f, "file"),
            NodeKind::Folder => write!(f, "folder"),
        }
    }
}

/// Editor language, derived from a path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Typescript,
    Java,
    C,
    Cpp,
    Csharp,
    Ruby,
    Go,
    Rust,
    Php,
    Swift,
    Kotlin,
    Scala,
    Bash,
    #[default]
    Plaintext,
}

impl Language {
    /// Deterministic extension lookup; unknown or missing extensions are
    /// [`Language::Plaintext`].
    pub fn from_path(path: &str) -> Self {
        let name = paths::file_name(path);
        let Some((_, ext)) = name.rsplit_once('.') else {
            return Language::Plaintext;
        };
        match ext.to_ascii_lowercase().as_str() {
            "py" => Language::Python,
            "js" | "jsx" => Language::Javascript,
            "ts" | "tsx" => Language::Typescript,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" => Language::Cpp,
            "cs" => Language::Csharp,
            "rb" => Language::Ruby,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "kt" => Language::Kotlin,
            "scala" => Language::Scala,
            "sh" => Language::Bash,
            _ => Language::Plaintext,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Csharp => "csharp",
            Language::Ruby => "ruby",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Scala => "scala",
            Language::Bash => "bash",
            Language::Plaintext => "plaintext",
        }
    }

    /// Runtime version the code sandbox runs this language with, if it can
    /// run it at all.
    pub fn runtime_version(self) -> Option<&'static str> {
        match self {
            Language::Javascript => Some("18.15.0"),
            Language::Typescript => Some("5.0.3"),
            Language::Python => Some("3.10.0"),
            Language::Java => Some("15.0.2"),
            Language::Csharp => Some("6.12.0"),
            Language::Php => Some("8.2.3"),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Save indicator for the buffer most recently saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed,
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaveState::Idle => "idle",
            SaveState::Saving => "saving",
            SaveState::Saved => "saved",
            SaveState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Execution status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Proposed,
    Executing,
    Executed,
    Failed,
}

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "bot")]
    Assistant,
    System,
}

// ---------------------------------------------------------------------------
// Directory tree
// ---------------------------------------------------------------------------

/// One row of a remote listing: immediate child of the listed folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
        }
    }
}

/// Snapshot of a directory-cache node.
///
/// `children` is only meaningful when `children_loaded` is true; an unloaded
/// node may still carry the children of its last listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub path: String,
    pub name: String,
    pub kind: NodeKind,
    pub children_loaded: bool,
    pub expanded: bool,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    /// Depth-first lookup of `path` in this subtree.
    pub fn find(&self, path: &str) -> Option<&Node> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// An open, editable copy of a remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBuffer {
    pub path: String,
    pub name: String,
    pub content: String,
    pub language: Language,
    /// The last fetch failed and `content` is the load-error placeholder.
    /// Cleared by an edit or a successful refetch.
    #[serde(default)]
    pub load_failed: bool,
}

impl OpenBuffer {
    pub fn new(path: impl Into<String>, name: impl Into<String>, content: String) -> Self {
        let path = path.into();
        let language = Language::from_path(&path);
        Self {
            path,
            name: name.into(),
            content,
            language,
            load_failed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks and transcript
// ---------------------------------------------------------------------------

/// A task as it arrives from the advisor: a bare string, or an object that
/// may already carry an id from an earlier admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTask {
    Text(String),
    Structured {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<TaskId>,
        text: String,
    },
}

impl RawTask {
    pub fn id(&self) -> Option<&TaskId> {
        match self {
            RawTask::Text(_) => None,
            RawTask::Structured { id, .. } => id.as_ref(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            RawTask::Text(text) | RawTask::Structured { text, .. } => text,
        }
    }
}

/// An admitted task with a stable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub status: TaskStatus,
}

impl From<&Task> for RawTask {
    fn from(task: &Task) -> Self {
        RawTask::Structured {
            id: Some(task.id.clone()),
            text: task.text.clone(),
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskId>,
    #[serde(default)]
    pub show_execute: bool,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            task: None,
            show_execute: false,
            sent_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }
}

/// Advisor reply body: `{ "reply": ..., "task": ..., "show_execute_button": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AdvisorReply {
    #[serde(default)]
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<RawTask>,
    #[serde(default)]
    pub show_execute_button: bool,
}

impl AdvisorReply {
    /// Parse a raw reply body. Bodies that are not a JSON reply object are
    /// treated as plain reply text.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<AdvisorReply>(body) {
            Ok(reply) => reply,
            Err(_) => Self {
                reply: body.to_owned(),
                ..Self::default()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(TaskId::from("t-01").to_string(), "t-01");
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(TaskId::generate(), TaskId::generate());
    }

    #[test]
    fn raw_task_accepts_both_shapes() {
        let bare: RawTask = serde_json::from_str(r#""add a test""#).expect("bare");
        assert_eq!(bare, RawTask::Text("add a test".into()));
        assert!(bare.id().is_none());

        let structured: RawTask =
            serde_json::from_str(r#"{"id":"abc","text":"add a test"}"#).expect("structured");
        assert_eq!(structured.id(), Some(&TaskId::from("abc")));
        assert_eq!(structured.text(), "add a test");

        let no_id: RawTask = serde_json::from_str(r#"{"text":"add a test"}"#).expect("no id");
        assert!(no_id.id().is_none());
    }

    #[test]
    fn dir_entry_uses_type_field() {
        let entries: Vec<DirEntry> =
            serde_json::from_str(r#"[{"name":"src","type":"folder"},{"name":"a.py","type":"file"}]"#)
                .expect("entries");
        assert_eq!(entries, vec![DirEntry::folder("src"), DirEntry::file("a.py")]);
    }

    #[test]
    fn advisor_reply_falls_back_to_plain_text() {
        let reply = AdvisorReply::from_body("just words");
        assert_eq!(reply.reply, "just words");
        assert!(reply.task.is_none());
        assert!(!reply.show_execute_button);
    }

    #[test]
    fn node_find_walks_children() {
        let tree = Node {
            path: ".".into(),
            name: ".".into(),
            kind: NodeKind::Folder,
            children_loaded: true,
            expanded: true,
            children: vec![Node {
                path: "src".into(),
                name: "src".into(),
                kind: NodeKind::Folder,
                children_loaded: false,
                expanded: false,
                children: vec![],
            }],
        };
        assert_eq!(tree.find("src").map(|n| n.kind), Some(NodeKind::Folder));
        assert!(tree.find("missing").is_none());
    }
}
