pub mod chat;
pub mod document;
pub mod entry;
pub mod run;
pub mod tree;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use workbench_core::{paths, FileStore, WorkbenchConfig};
use workbench_remote::{HttpBackend, LocalFileStore};
use workbench_sync::{DirectoryCache, Workspace};

/// Which file store, advisor and sandbox the commands talk to.
pub struct Target {
    config: WorkbenchConfig,
    store: Arc<dyn FileStore>,
    advisor: HttpBackend,
    sandbox: HttpBackend,
}

impl Target {
    /// `--remote` routes files over HTTP; otherwise `--root` (or the current
    /// directory) is the store. The advisor and the sandbox are always HTTP.
    pub fn connect(
        mut config: WorkbenchConfig,
        root: Option<PathBuf>,
        remote: Option<String>,
        runner: Option<String>,
    ) -> Self {
        if let Some(url) = remote.as_ref() {
            config.remote.base_url = url.clone();
        }
        if let Some(url) = runner {
            config.runner.base_url = url;
        }
        let advisor = HttpBackend::new(&config.remote);
        let sandbox = HttpBackend::sandbox(&config.runner);
        let store: Arc<dyn FileStore> = match remote {
            Some(_) => Arc::new(advisor.clone()),
            None => Arc::new(LocalFileStore::new(root.unwrap_or_else(|| PathBuf::from(".")))),
        };
        tracing::debug!(
            advisor = %advisor.base_url(),
            sandbox = %sandbox.base_url(),
            "workbench target"
        );
        Self {
            config,
            store,
            advisor,
            sandbox,
        }
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(
            &self.config,
            Arc::clone(&self.store),
            Arc::new(self.advisor.clone()),
        )
        .with_runner(Arc::new(self.sandbox.clone()))
    }

    pub fn advisor_url(&self) -> &str {
        self.advisor.base_url()
    }
}

/// List `path` and every ancestor below the root, so the cache knows it.
pub(crate) async fn reveal(tree: &DirectoryCache, path: &str) -> Result<()> {
    let path = paths::normalize(path);
    let root = tree.root().await;

    let mut chain = Vec::new();
    let mut current = path.clone();
    while current != root && current != paths::ROOT {
        chain.push(current.clone());
        current = paths::parent(&current);
    }
    chain.push(root);

    for folder in chain.into_iter().rev() {
        ensure_listed(tree, &folder).await?;
    }
    Ok(())
}

/// Expand `path` unless it is already listed; a listing that failed is an error here.
pub(crate) async fn ensure_listed(tree: &DirectoryCache, path: &str) -> Result<()> {
    if tree.is_loaded(path).await {
        return Ok(());
    }
    tree.expand(path)
        .await
        .with_context(|| format!("cannot open '{path}'"))?;
    if !tree.is_loaded(path).await {
        bail!("could not list '{path}'");
    }
    Ok(())
}
