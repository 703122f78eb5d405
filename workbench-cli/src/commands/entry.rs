//! `workbench mkdir|touch|mv|rm`.

use anyhow::{Context, Result};
use clap::Args;

use workbench_core::{paths, NodeKind};
use workbench_sync::Workspace;

/// A single store path.
#[derive(Args, Debug)]
pub struct PathArg {
    pub path: String,
}

impl PathArg {
    pub async fn create(self, workspace: &Workspace, kind: NodeKind) -> Result<()> {
        let path = paths::normalize(&self.path);
        workspace
            .tree()
            .create_entry(&path, kind)
            .await
            .with_context(|| format!("failed to create {kind} '{path}'"))?;
        println!("✓ created {kind} {path}");
        Ok(())
    }

    pub async fn delete(self, workspace: &Workspace) -> Result<()> {
        let path = paths::normalize(&self.path);
        workspace
            .tree()
            .delete(&path)
            .await
            .with_context(|| format!("failed to delete '{path}'"))?;
        println!("✓ deleted {path}");
        Ok(())
    }
}

/// Arguments for `workbench mv`.
#[derive(Args, Debug)]
pub struct MoveArgs {
    pub from: String,
    pub to: String,
}

impl MoveArgs {
    pub async fn run(self, workspace: &Workspace) -> Result<()> {
        let from = paths::normalize(&self.from);
        let to = paths::normalize(&self.to);
        workspace
            .tree()
            .rename(&from, &to)
            .await
            .with_context(|| format!("failed to move '{from}' to '{to}'"))?;
        println!("✓ moved {from} → {to}");
        Ok(())
    }
}
