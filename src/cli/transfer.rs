//! Export and import CLI commands.

use super::{CliContext, CommandResult, prompt_path, read_content};
use crate::io::{ExportService, ImportOptions, ImportService};
use std::path::PathBuf;

/// Executes the `export` command.
///
/// Prints the transfer string to stdout, or writes it to `output`. Missing
/// partials are reported on stderr and do not fail the export.
///
/// # Errors
///
/// Returns an error if the prompt is not found or the output cannot be
/// written.
pub fn cmd_export(ctx: &CliContext, reference: String, output: Option<PathBuf>) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    let path = prompt_path(&workspace, &reference)?;
    let result = ExportService::new(&workspace)
        .with_source(ctx.config.export_source.clone())
        .export_prompt(&path)?;

    for missing in &result.missing {
        eprintln!("warning: partial '{missing}' not found, not included");
    }

    match output {
        Some(file) => {
            std::fs::write(&file, &result.transfer)
                .map_err(|e| format!("failed to write {}: {e}", file.display()))?;
            println!(
                "Exported {reference} with {} partials to {}",
                result.partial_count(),
                file.display()
            );
        },
        None => println!("{}", result.transfer),
    }
    Ok(())
}

/// Executes the `import` command.
///
/// # Arguments
///
/// * `transfer` - Inline transfer string; falls back to `from_file`, then stdin.
/// * `from_file` - File holding the transfer string.
/// * `overwrite` - Replace files that already exist.
/// * `dry_run` - Validate and report without writing.
///
/// # Errors
///
/// Returns an error if the string cannot be decoded or any item failed.
pub fn cmd_import(
    ctx: &CliContext,
    transfer: Option<String>,
    from_file: Option<PathBuf>,
    overwrite: bool,
    dry_run: bool,
) -> CommandResult {
    let transfer = read_content(transfer, from_file.as_deref())?;
    let mut workspace = ctx.open_workspace()?;
    let options = ImportOptions::default()
        .with_overwrite(overwrite)
        .with_dry_run(dry_run);
    let result = ImportService::new(&mut workspace).import_str(&transfer, options)?;

    let verb = if dry_run { "Would import" } else { "Imported" };
    for path in &result.imported {
        println!("{verb} {}", path.display());
    }
    for label in &result.skipped_existing {
        println!("Skipped existing {label}");
    }
    for error in &result.errors {
        eprintln!("error: {error}");
    }

    if result.has_errors() {
        return Err(format!("{} items failed to import", result.errors.len()).into());
    }
    Ok(())
}
