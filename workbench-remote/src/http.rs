//! HTTP backend speaking the workbench JSON routes, and the code sandbox's
//! `/execute` route.
//!
//! ureq is blocking, so every request (including reading the body) runs on
//! the blocking pool via `spawn_blocking`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use workbench_core::{
    AdvisorReply, CodeRunner, DirEntry, FileStore, Language, NodeKind, RawTask, RemoteConfig,
    RemoteError, RunnerConfig, Task, TaskService,
};

#[derive(Clone)]
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
}

enum Method {
    Get(&'static str, String),
    Post(&'static str, Value),
}

impl Method {
    fn route(&self) -> &'static str {
        match self {
            Method::Get(route, _) | Method::Post(route, _) => route,
        }
    }
}

impl HttpBackend {
    pub fn new(config: &RemoteConfig) -> Self {
        Self::with_timeout(&config.base_url, config.timeout())
    }

    /// Backend pointed at the code sandbox.
    pub fn sandbox(config: &RunnerConfig) -> Self {
        Self::with_timeout(&config.base_url, config.timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue `method` and hand the response to `read` on the blocking pool.
    /// `subject` names the path reported by a 404.
    async fn call<T, F>(&self, method: Method, subject: &str, read: F) -> Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(ureq::Response) -> Result<T, RemoteError> + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = format!("{}{}", self.base_url, method.route());
        let subject = subject.to_owned();
        tracing::debug!(url = %url, "remote request");

        tokio::task::spawn_blocking(move || {
            let response = match method {
                Method::Get(_, path) => agent.get(&url).query("path", &path).call(),
                Method::Post(_, body) => agent.post(&url).send_json(body),
            }
            .map_err(|err| map_ureq_error(err, &subject))?;
            read(response)
        })
        .await
        .map_err(|err| RemoteError::network(format!("request task failed: {err}")))?
    }

    async fn post_unit(&self, route: &'static str, body: Value, subject: &str) -> Result<(), RemoteError> {
        self.call(Method::Post(route, body), subject, |_| Ok(())).await
    }
}

fn map_ureq_error(err: ureq::Error, subject: &str) -> RemoteError {
    match err {
        ureq::Error::Status(404, _) => RemoteError::not_found(subject),
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = rejection_message(&body).unwrap_or(body);
            RemoteError::rejected(format!("HTTP {code}: {message}"))
        }
        ureq::Error::Transport(transport) => RemoteError::network(transport.to_string()),
    }
}

/// `{"error": "..."}` or `{"detail": "..."}` bodies carry the reason.
fn rejection_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "detail", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_owned)
}

fn read_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T, RemoteError> {
    response
        .into_json()
        .map_err(|err| RemoteError::rejected(format!("malformed response: {err}")))
}

fn read_text(response: ureq::Response) -> Result<String, RemoteError> {
    response
        .into_string()
        .map_err(|err| RemoteError::network(format!("reading response body: {err}")))
}

#[async_trait]
impl FileStore for HttpBackend {
    async fn list(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        self.call(Method::Get("/fs/list", path.to_owned()), path, read_json)
            .await
    }

    async fn read_file(&self, path: &str) -> Result<String, RemoteError> {
        self.call(Method::Get("/fs/read", path.to_owned()), path, read_text)
            .await
    }

    async fn save_file(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.post_unit("/fs/save", json!({ "path": path, "content": content }), path)
            .await
    }

    async fn create_entry(&self, path: &str, kind: NodeKind) -> Result<(), RemoteError> {
        let route = match kind {
            NodeKind::File => "/fs/create_file",
            NodeKind::Folder => "/fs/create_folder",
        };
        self.post_unit(route, json!({ "path": path }), path).await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), RemoteError> {
        self.post_unit(
            "/fs/rename",
            json!({ "old_path": old_path, "new_path": new_path }),
            old_path,
        )
        .await
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.post_unit("/fs/delete", json!({ "path": path }), path)
            .await
    }
}

#[async_trait]
impl TaskService for HttpBackend {
    async fn send_message(&self, text: &str) -> Result<AdvisorReply, RemoteError> {
        let body = self
            .call(Method::Post("/chat", json!({ "message": text })), "/chat", read_text)
            .await?;
        Ok(AdvisorReply::from_body(&body))
    }

    async fn execute_task(&self, task: &Task) -> Result<Value, RemoteError> {
        let body = json!({ "task": RawTask::from(task) });
        self.call(Method::Post("/run-task", body), "/run-task", read_json)
            .await
    }

    async fn reset_conversation(&self) -> Result<(), RemoteError> {
        self.post_unit("/reset", json!({}), "/reset").await
    }
}

/// Sandbox response; only the combined output of the run stage is used.
#[derive(Debug, Deserialize)]
struct Execution {
    run: RunStage,
}

#[derive(Debug, Deserialize)]
struct RunStage {
    #[serde(default)]
    output: String,
}

#[async_trait]
impl CodeRunner for HttpBackend {
    async fn run(&self, language: Language, source: &str) -> Result<Vec<String>, RemoteError> {
        let version = language
            .runtime_version()
            .ok_or_else(|| RemoteError::rejected(format!("no runtime for {language}")))?;
        let body = json!({
            "language": language.as_str(),
            "version": version,
            "files": [{ "content": source }],
        });
        let execution: Execution = self
            .call(Method::Post("/execute", body), "/execute", read_json)
            .await?;
        Ok(execution.run.output.lines().map(str::to_owned).collect())
    }
}
