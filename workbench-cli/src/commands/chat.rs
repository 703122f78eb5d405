//! `workbench chat` and `workbench reset`.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use workbench_sync::conversation::ADVISOR_UNREACHABLE;
use workbench_sync::Workspace;

/// Arguments for `workbench chat`.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Message for the advisor.
    pub message: String,

    /// Run the task the advisor proposes, if any.
    #[arg(long)]
    pub execute: bool,
}

impl ChatArgs {
    pub async fn run(self, workspace: &Workspace, advisor_url: &str) -> Result<()> {
        let conversation = workspace.conversation();
        let Some(reply) = conversation.send(&self.message).await else {
            bail!("message is empty");
        };
        if reply.text == ADVISOR_UNREACHABLE {
            bail!("could not reach the advisor at {advisor_url}");
        }
        println!("{}", reply.text);

        let Some(id) = reply.task else {
            return Ok(());
        };
        let task = conversation
            .task(&id)
            .await
            .context("proposed task vanished from the ledger")?;
        println!("{} {} ({})", "task:".yellow().bold(), task.text, task.id);

        if !self.execute {
            return Ok(());
        }
        let result = conversation
            .execute(&task.id)
            .await
            .with_context(|| format!("task {} failed", task.id))?;
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to serialize task result")?
        );
        Ok(())
    }
}

pub async fn reset(workspace: &Workspace) -> Result<()> {
    workspace
        .conversation()
        .reset()
        .await
        .context("failed to reset the conversation")?;
    println!("✓ conversation reset");
    Ok(())
}
