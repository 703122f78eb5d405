//! `workbench tree` and `workbench ls`.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use workbench_core::{paths, Language, Node, NodeKind};
use workbench_sync::Workspace;

use super::{ensure_listed, reveal};

/// Arguments for `workbench tree`.
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Folder to start from (default: the tree root).
    pub path: Option<String>,

    /// How many folder levels to list.
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// Emit the tree as JSON.
    #[arg(long)]
    pub json: bool,
}

impl TreeArgs {
    pub async fn run(self, workspace: &Workspace) -> Result<()> {
        let tree = workspace.tree();
        let start = match self.path {
            Some(path) => paths::normalize(&path),
            None => tree.root().await,
        };
        reveal(tree, &start).await?;

        let mut frontier = vec![(start.clone(), 1usize)];
        while let Some((folder, level)) = frontier.pop() {
            ensure_listed(tree, &folder).await?;
            if level >= self.depth {
                continue;
            }
            if let Some(node) = tree.node(&folder).await {
                frontier.extend(
                    node.children
                        .iter()
                        .filter(|child| child.kind == NodeKind::Folder)
                        .map(|child| (child.path.clone(), level + 1)),
                );
            }
        }

        let node = tree
            .node(&start)
            .await
            .with_context(|| format!("'{start}' is not in the tree"))?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&node).context("failed to serialize tree JSON")?
            );
            return Ok(());
        }

        println!("{}", node.name.blue().bold());
        let mut out = String::new();
        render(&node, "", &mut out);
        print!("{out}");
        Ok(())
    }
}

fn render(node: &Node, prefix: &str, out: &mut String) {
    let count = node.children.len();
    for (index, child) in node.children.iter().enumerate() {
        let last = index + 1 == count;
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let name = match child.kind {
            NodeKind::Folder => format!("{}/", child.name).blue().bold().to_string(),
            NodeKind::File => child.name.clone(),
        };
        out.push_str(&format!("{prefix}{branch}{name}\n"));
        if child.kind == NodeKind::Folder {
            render(child, &format!("{prefix}{indent}"), out);
        }
    }
}

/// Arguments for `workbench ls`.
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Folder to list (default: the tree root).
    pub path: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Tabled)]
struct EntryRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "kind")]
    kind: NodeKind,
    #[tabled(rename = "language")]
    language: String,
}

impl LsArgs {
    pub async fn run(self, workspace: &Workspace) -> Result<()> {
        let tree = workspace.tree();
        let folder = match self.path {
            Some(path) => paths::normalize(&path),
            None => tree.root().await,
        };
        reveal(tree, &folder).await?;
        let node = tree
            .node(&folder)
            .await
            .with_context(|| format!("'{folder}' is not in the tree"))?;

        let rows: Vec<EntryRow> = node
            .children
            .iter()
            .map(|child| EntryRow {
                name: child.name.clone(),
                kind: child.kind,
                language: match child.kind {
                    NodeKind::File => Language::from_path(&child.path).to_string(),
                    NodeKind::Folder => "-".to_string(),
                },
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize listing JSON")?
            );
            return Ok(());
        }
        if rows.is_empty() {
            println!("'{folder}' is empty.");
            return Ok(());
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(path: &str, kind: NodeKind) -> Node {
        Node {
            path: path.to_string(),
            name: paths::file_name(path).to_string(),
            kind,
            children_loaded: false,
            expanded: false,
            children: Vec::new(),
        }
    }

    #[test]
    fn render_draws_branches() {
        colored::control::set_override(false);
        let mut src = leaf("src", NodeKind::Folder);
        src.children.push(leaf("src/lib.rs", NodeKind::File));
        let mut root = leaf(".", NodeKind::Folder);
        root.children = vec![src, leaf("main.py", NodeKind::File)];

        let mut out = String::new();
        render(&root, "", &mut out);
        assert_eq!(out, "├── src/\n│   └── lib.rs\n└── main.py\n");
    }
}
