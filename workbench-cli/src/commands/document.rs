//! `workbench cat` and `workbench save`.

use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use workbench_core::paths;
use workbench_sync::Workspace;

/// Arguments for `workbench cat`.
#[derive(Args, Debug)]
pub struct CatArgs {
    /// File to print.
    pub path: String,
}

impl CatArgs {
    pub async fn run(self, workspace: &Workspace) -> Result<()> {
        let path = paths::normalize(&self.path);
        let buffer = workspace
            .session()
            .open(&path, paths::file_name(&path))
            .await;
        if buffer.load_failed {
            bail!("could not read '{path}'");
        }
        eprintln!("{}", buffer.language.to_string().bright_black());
        print!("{}", buffer.content);
        Ok(())
    }
}

/// Arguments for `workbench save`.
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// File to overwrite with stdin.
    pub path: String,
}

impl SaveArgs {
    pub async fn run(self, workspace: &Workspace) -> Result<()> {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read stdin")?;

        let path = paths::normalize(&self.path);
        let session = workspace.session();
        session.open(&path, paths::file_name(&path)).await;
        session.edit(&path, content).await?;
        session
            .save(&path)
            .await
            .with_context(|| format!("failed to save '{path}'"))?;

        let indicator = session.save_indicator().await;
        println!("✓ {path} ({})", indicator.state);
        Ok(())
    }
}
