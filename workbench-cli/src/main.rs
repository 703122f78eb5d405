//! Workbench — drive the workspace sync core from the command line.
//!
//! # Usage
//!
//! ```text
//! workbench [--root DIR | --remote URL] [--verbose] <command>
//! workbench tree [PATH] [--depth N] [--json]
//! workbench ls [PATH] [--json]
//! workbench cat <PATH>
//! workbench save <PATH>            (content from stdin)
//! workbench mkdir|touch|rm <PATH>
//! workbench mv <FROM> <TO>
//! workbench chat <MESSAGE> [--execute]
//! workbench reset
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    chat::ChatArgs,
    document::{CatArgs, SaveArgs},
    entry::{MoveArgs, PathArg},
    run::RunArgs,
    tree::{LsArgs, TreeArgs},
    Target,
};
use workbench_core::NodeKind;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "workbench",
    version,
    about = "Browse and edit a workbench file store, and run advisor tasks",
    long_about = None,
)]
struct Cli {
    /// Local directory to use as the file store (default: current directory).
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "remote")]
    root: Option<PathBuf>,

    /// Base URL of a workbench backend; files are read and written over HTTP.
    #[arg(long, global = true, value_name = "URL")]
    remote: Option<String>,

    /// Base URL of the code sandbox (overrides `runner.base_url`).
    #[arg(long, global = true, value_name = "URL")]
    runner: Option<String>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the directory tree.
    Tree(TreeArgs),

    /// List the entries of one folder.
    Ls(LsArgs),

    /// Print a file.
    Cat(CatArgs),

    /// Replace a file's content with stdin and save it.
    Save(SaveArgs),

    /// Create a folder.
    Mkdir(PathArg),

    /// Create an empty file.
    Touch(PathArg),

    /// Rename or move an entry.
    Mv(MoveArgs),

    /// Delete an entry (folders recursively).
    Rm(PathArg),

    /// Run a file in the code sandbox and print its output.
    Run(RunArgs),

    /// Send a message to the advisor.
    Chat(ChatArgs),

    /// Ask the advisor to forget the conversation.
    Reset,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let Cli {
        root,
        remote,
        runner,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);

    let config = workbench_core::config::load().context("failed to load ~/.workbench/config.yaml")?;
    let target = Target::connect(config, root, remote, runner);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let workspace = target.workspace();
        match command {
            Commands::Tree(args) => args.run(&workspace).await,
            Commands::Ls(args) => args.run(&workspace).await,
            Commands::Cat(args) => args.run(&workspace).await,
            Commands::Save(args) => args.run(&workspace).await,
            Commands::Mkdir(args) => args.create(&workspace, NodeKind::Folder).await,
            Commands::Touch(args) => args.create(&workspace, NodeKind::File).await,
            Commands::Mv(args) => args.run(&workspace).await,
            Commands::Rm(args) => args.delete(&workspace).await,
            Commands::Run(args) => args.run(&workspace).await,
            Commands::Chat(args) => args.run(&workspace, target.advisor_url()).await,
            Commands::Reset => commands::chat::reset(&workspace).await,
        }
    })
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
