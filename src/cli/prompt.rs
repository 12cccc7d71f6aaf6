//! Prompt CLI command.
//!
//! Prompts are addressed as `tag/Title`, e.g. `coding-review/Rust`. A prompt
//! at the prompts root is addressed by its bare title.

use super::{
    CliContext, CommandResult, OutputFormat, parse_pairs, prompt_path, read_content, truncate,
};
use crate::models::Prompt;
use crate::storage::{SearchIndex, SqliteSearchIndex};
use std::path::PathBuf;

/// Executes the `prompt list` subcommand.
///
/// # Arguments
///
/// * `tag` - Only list prompts under this tag (including sub-tags).
/// * `format` - Output format.
///
/// # Errors
///
/// Returns an error if the workspace cannot be opened.
pub fn cmd_prompt_list(
    ctx: &CliContext,
    tag: Option<String>,
    format: Option<String>,
) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    let mut prompts: Vec<Prompt> = workspace
        .prompts()
        .iter()
        .filter(|p| tag.as_deref().is_none_or(|t| tag_matches(&p.tag, t)))
        .cloned()
        .collect();
    prompts.sort_by(|a, b| a.tag.cmp(&b.tag).then_with(|| a.title.cmp(&b.title)));

    match OutputFormat::from_flag(format.as_deref()) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prompts)?),
        OutputFormat::Table => print_prompts_table(&prompts),
    }
    Ok(())
}

/// Returns `true` if `tag` equals `filter` or sits below it.
fn tag_matches(tag: &str, filter: &str) -> bool {
    tag == filter
        || tag
            .strip_prefix(filter)
            .is_some_and(|rest| rest.starts_with('-'))
}

fn print_prompts_table(prompts: &[Prompt]) {
    if prompts.is_empty() {
        println!("No prompts found.");
        return;
    }

    println!("{:<24} {:<24} {:<6} PARTIALS", "TAG", "TITLE", "PARAMS");
    println!("{}", "-".repeat(80));
    for prompt in prompts {
        let tag = if prompt.tag.is_empty() { "-" } else { &prompt.tag };
        println!(
            "{:<24} {:<24} {:<6} {}",
            truncate(tag, 24),
            truncate(&prompt.title, 24),
            prompt.parameters.len(),
            prompt.partials.join(", ")
        );
    }
    println!();
    println!("Total: {} prompts", prompts.len());
}

/// Executes the `prompt show` subcommand.
///
/// # Arguments
///
/// * `reference` - `tag/Title` of the prompt.
/// * `resolve` - Replace static partial references.
/// * `picks` - `folder=dot.path` picker selections; implies full rendering.
/// * `values` - `NAME=value` parameter values; implies full rendering.
/// * `format` - `json` prints the stored prompt record instead.
///
/// # Errors
///
/// Returns an error if the prompt is not found or an argument is malformed.
pub fn cmd_prompt_show(
    ctx: &CliContext,
    reference: String,
    resolve: bool,
    picks: Vec<String>,
    values: Vec<String>,
    format: Option<String>,
) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    let path = prompt_path(&workspace, &reference)?;
    let prompt = workspace
        .prompts()
        .get(&path)
        .ok_or_else(|| format!("prompt '{reference}' not found"))?;

    if OutputFormat::from_flag(format.as_deref()) == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&prompt)?);
        return Ok(());
    }

    let text = if !picks.is_empty() || !values.is_empty() {
        workspace.render_prompt(&path, &parse_pairs(&picks)?, &parse_pairs(&values)?)?
    } else if resolve {
        workspace.resolve_prompt(&path)?
    } else {
        prompt.content
    };
    println!("{text}");
    Ok(())
}

/// Executes the `prompt save` subcommand.
///
/// # Arguments
///
/// * `tag` - Hyphen-joined tag; empty for the prompts root.
/// * `title` - File stem.
/// * `content` - Inline content; falls back to `from_file`, then stdin.
/// * `from_file` - File to read content from.
/// * `replaces` - `tag/Title` of the prompt being edited, for renames.
///
/// # Errors
///
/// Returns an error if validation fails or the target is taken.
pub fn cmd_prompt_save(
    ctx: &CliContext,
    tag: String,
    title: String,
    content: Option<String>,
    from_file: Option<PathBuf>,
    replaces: Option<String>,
) -> CommandResult {
    let content = read_content(content, from_file.as_deref())?;
    let mut workspace = ctx.open_workspace()?;
    let existing = replaces
        .map(|r| prompt_path(&workspace, &r))
        .transpose()?;
    let path = workspace
        .prompts_mut()
        .save(&tag, &title, &content, existing.as_deref())?;
    println!("Saved {}", path.display());
    Ok(())
}

/// Executes the `prompt delete` subcommand.
///
/// # Errors
///
/// Returns an error if the prompt file does not exist.
pub fn cmd_prompt_delete(ctx: &CliContext, reference: String) -> CommandResult {
    let mut workspace = ctx.open_workspace()?;
    let path = prompt_path(&workspace, &reference)?;
    workspace.prompts_mut().delete(&path)?;
    println!("Deleted {reference}");
    Ok(())
}

/// Executes the `prompt search` subcommand.
///
/// Builds an in-memory full-text index over the workspace and ranks
/// prompts by title, tag and content matches.
///
/// # Errors
///
/// Returns an error if the index cannot be built or queried.
pub fn cmd_prompt_search(
    ctx: &CliContext,
    query: String,
    limit: usize,
    format: Option<String>,
) -> CommandResult {
    let workspace = ctx.open_workspace()?;
    let index = SqliteSearchIndex::in_memory()?;
    index.rebuild(&workspace.prompts().all())?;
    let hits = index.search(&query, limit)?;

    let results: Vec<(f32, Prompt)> = hits
        .into_iter()
        .filter_map(|hit| workspace.prompts().get(&hit.file_path).map(|p| (hit.score, p)))
        .collect();

    if OutputFormat::from_flag(format.as_deref()) == OutputFormat::Json {
        let json: Vec<serde_json::Value> = results
            .iter()
            .map(|(score, p)| {
                serde_json::json!({
                    "score": score,
                    "tag": p.tag,
                    "title": p.title,
                    "filePath": p.file_path,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No prompts match '{query}'.");
        return Ok(());
    }
    println!("{:<6} {:<24} TITLE", "SCORE", "TAG");
    println!("{}", "-".repeat(60));
    for (score, prompt) in &results {
        println!("{score:<6.2} {:<24} {}", truncate(&prompt.tag, 24), prompt.title);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_matches() {
        assert!(tag_matches("coding", "coding"));
        assert!(tag_matches("coding-review", "coding"));
        assert!(!tag_matches("codingx", "coding"));
        assert!(!tag_matches("mail", "coding"));
    }
}
