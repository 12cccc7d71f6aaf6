//! Status CLI command.

use super::{CliContext, CommandResult, OutputFormat};
use crate::services::{DependencyCollector, Workspace};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Summary printed by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStatus {
    /// Workspace root.
    pub root: PathBuf,
    /// Number of stored prompts.
    pub prompts: usize,
    /// Number of stored partials.
    pub partials: usize,
    /// Distinct tags in use.
    pub tags: usize,
    /// Files the last scan could not load.
    pub skipped: Vec<PathBuf>,
    /// Dot paths referenced by some prompt but not stored.
    pub missing_partials: Vec<String>,
}

impl WorkspaceStatus {
    /// Gathers the summary for a loaded workspace.
    #[must_use]
    pub fn collect(workspace: &Workspace) -> Self {
        let collector = DependencyCollector::new(workspace.partials());
        let mut tags = BTreeSet::new();
        let mut missing = BTreeSet::new();
        for prompt in workspace.prompts().iter() {
            tags.insert(prompt.tag.as_str());
            missing.extend(collector.collect(prompt).missing);
        }

        let report = workspace.last_load();
        let mut skipped: Vec<PathBuf> = report
            .prompts
            .skipped
            .iter()
            .chain(&report.partials.skipped)
            .cloned()
            .collect();
        skipped.sort();

        Self {
            root: workspace.root().to_path_buf(),
            prompts: workspace.prompts().len(),
            partials: workspace.partials().len(),
            tags: tags.len(),
            skipped,
            missing_partials: missing.into_iter().collect(),
        }
    }
}

/// Executes the `status` command.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened.
pub fn cmd_status(ctx: &CliContext, format: Option<String>) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    let status = WorkspaceStatus::collect(&workspace);

    if OutputFormat::from_flag(format.as_deref()) == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Workspace: {}", status.root.display());
    println!("Prompts:   {}", status.prompts);
    println!("Partials:  {}", status.partials);
    println!("Tags:      {}", status.tags);
    if !status.skipped.is_empty() {
        println!();
        println!("Skipped files:");
        for path in &status.skipped {
            println!("  {}", path.display());
        }
    }
    if !status.missing_partials.is_empty() {
        println!();
        println!("Missing partials:");
        for dot_path in &status.missing_partials {
            println!("  {dot_path}");
        }
    }
    Ok(())
}
