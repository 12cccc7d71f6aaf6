//! Partial CLI command.
//!
//! Partials are addressed by dot path, e.g. `tones.formal`.

use super::{CliContext, CommandResult, OutputFormat, read_content, truncate};
use crate::models::Partial;
use std::path::PathBuf;

fn print_partials(partials: &[Partial], format: Option<&str>) -> CommandResult {
    if OutputFormat::from_flag(format) == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(partials)?);
        return Ok(());
    }
    if partials.is_empty() {
        println!("No partials found.");
        return Ok(());
    }
    println!("{:<32} CONTENT", "PATH");
    println!("{}", "-".repeat(80));
    for partial in partials {
        println!("{:<32} {}", partial.path, truncate(&partial.content, 46));
    }
    println!();
    println!("Total: {} partials", partials.len());
    Ok(())
}

/// Executes the `partial list` subcommand.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened.
pub fn cmd_partial_list(ctx: &CliContext, format: Option<String>) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    print_partials(&workspace.partials().all(), format.as_deref())
}

/// Executes the `partial show` subcommand.
///
/// # Errors
///
/// Returns an error if no partial exists at `dot_path`.
pub fn cmd_partial_show(ctx: &CliContext, dot_path: String) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    let partial = workspace
        .partials()
        .get_ref(&dot_path)
        .ok_or_else(|| format!("partial '{dot_path}' not found"))?;
    println!("{}", partial.content);
    Ok(())
}

/// Executes the `partial save` subcommand.
///
/// # Arguments
///
/// * `dot_path` - Where to save, e.g. `tones.formal`.
/// * `content` - Inline content; falls back to `from_file`, then stdin.
/// * `from_file` - File to read content from.
/// * `replaces` - Dot path of the partial being edited, for renames.
///
/// # Errors
///
/// Returns an error if validation fails or the target is taken.
pub fn cmd_partial_save(
    ctx: &CliContext,
    dot_path: String,
    content: Option<String>,
    from_file: Option<PathBuf>,
    replaces: Option<String>,
) -> CommandResult {
    let content = read_content(content, from_file.as_deref())?;
    let mut workspace = ctx.open_workspace()?;
    let existing = replaces
        .map(|old| workspace.partials().file_for(&old))
        .transpose()?;
    let path = workspace
        .partials_mut()
        .save(&dot_path, &content, existing.as_deref())?;
    println!("Saved {}", path.display());
    Ok(())
}

/// Executes the `partial delete` subcommand.
///
/// # Errors
///
/// Returns an error if the partial file does not exist.
pub fn cmd_partial_delete(ctx: &CliContext, dot_path: String) -> CommandResult {
    let mut workspace = ctx.open_workspace()?;
    let file = workspace.partials().file_for(&dot_path)?;
    workspace.partials_mut().delete(&file)?;
    println!("Deleted {dot_path}");
    Ok(())
}

/// Executes the `partial search` subcommand.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened.
pub fn cmd_partial_search(
    ctx: &CliContext,
    query: String,
    format: Option<String>,
) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    print_partials(&workspace.partials().search(&query), format.as_deref())
}

/// Executes the `partial children` subcommand: lists the partials directly
/// inside a folder, as offered by a picker.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened.
pub fn cmd_partial_children(
    ctx: &CliContext,
    folder: String,
    format: Option<String>,
) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    print_partials(&workspace.partials().children_of(&folder), format.as_deref())
}
