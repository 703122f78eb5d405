//! `workbench run`.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use workbench_core::paths;
use workbench_sync::Workspace;

/// Arguments for `workbench run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// File to run.
    pub path: String,
}

impl RunArgs {
    pub async fn run(self, workspace: &Workspace) -> Result<()> {
        let console = workspace
            .console()
            .context("no code runner configured")?;
        let path = paths::normalize(&self.path);
        let buffer = workspace
            .session()
            .open(&path, paths::file_name(&path))
            .await;
        if buffer.load_failed {
            bail!("could not read '{path}'");
        }
        eprintln!("{}", format!("running {path} ({})", buffer.language).bright_black());

        let lines = console
            .run_active()
            .await
            .with_context(|| format!("failed to run '{path}'"))?;
        for line in lines {
            println!("{line}");
        }
        Ok(())
    }
}
