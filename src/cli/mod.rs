//! CLI command implementations.
//!
//! Each submodule implements one command group. `main.rs` parses arguments
//! with clap and dispatches here.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `prompt` | List, show, save, delete and search prompts |
//! | `partial` | List, show, save, delete, search and browse partials |
//! | `export` | Pack a prompt and its partials into a transfer string |
//! | `import` | Unpack a transfer string into the workspace |
//! | `watch` | Keep the workspace in sync with external edits |
//! | `status` | Show workspace statistics |
//!
//! # Example Usage
//!
//! ```bash
//! # Save a prompt under the `coding-review` tag
//! promptshelf prompt save coding-review Rust --content "Review [CODE] {{> tones.formal}}"
//!
//! # Print it with partials resolved
//! promptshelf prompt show coding-review/Rust --resolve
//!
//! # Share it
//! promptshelf export coding-review/Rust > rust.txt
//! promptshelf --global import --from-file rust.txt
//! ```

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]
// CLI commands take owned strings from clap parsing
#![allow(clippy::needless_pass_by_value)]

mod partial;
mod prompt;
mod status;
mod transfer;
mod watch;

pub use partial::{
    cmd_partial_children, cmd_partial_delete, cmd_partial_list, cmd_partial_save,
    cmd_partial_search, cmd_partial_show,
};
pub use prompt::{
    cmd_prompt_delete, cmd_prompt_list, cmd_prompt_save, cmd_prompt_search, cmd_prompt_show,
};
pub use status::cmd_status;
pub use transfer::{cmd_export, cmd_import};
pub use watch::{IndexedWorkspace, cmd_watch};

use crate::config::ShelfConfig;
use crate::services::Workspace;
use std::collections::HashMap;
use std::error::Error;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Boxed error returned by command functions.
pub type CommandResult<T = ()> = Result<T, Box<dyn Error>>;

/// Shared state for one CLI invocation.
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Loaded configuration.
    pub config: ShelfConfig,
    /// Whether `--global` was passed.
    pub global: bool,
}

impl CliContext {
    /// Creates a context.
    #[must_use]
    pub const fn new(config: ShelfConfig, global: bool) -> Self {
        Self { config, global }
    }

    /// Root of the selected workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if `--global` was passed without a configured global
    /// root.
    pub fn root(&self) -> crate::Result<&Path> {
        self.config.root_for(self.global)
    }

    /// Opens and loads the selected workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not configured or cannot be created.
    pub fn open_workspace(&self) -> crate::Result<Workspace> {
        Workspace::open(self.root()?)
    }
}

/// Output format for list-like commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses output format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }

    /// Parses an optional format flag.
    #[must_use]
    pub fn from_flag(s: Option<&str>) -> Self {
        s.map_or(Self::Table, Self::parse)
    }
}

/// Splits `tag/Title` into its tag and title. A bare `Title` has an empty tag.
#[must_use]
pub fn split_prompt_ref(reference: &str) -> (&str, &str) {
    reference.rsplit_once('/').unwrap_or(("", reference))
}

/// Maps `tag/Title` to the prompt's file path in `workspace`.
///
/// # Errors
///
/// Returns an error if the tag or title is malformed, so user input can
/// never address a file outside the prompts root.
pub fn prompt_path(workspace: &Workspace, reference: &str) -> crate::Result<PathBuf> {
    let (tag, title) = split_prompt_ref(reference);
    workspace.prompts().file_for(tag, title)
}

/// Reads content from the inline argument, a file, or stdin, in that order.
///
/// # Errors
///
/// Returns an error if the file or stdin cannot be read.
pub fn read_content(inline: Option<String>, from_file: Option<&Path>) -> CommandResult<String> {
    if let Some(content) = inline {
        return Ok(content);
    }
    if let Some(path) = from_file {
        return Ok(std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Parses `KEY=VALUE` arguments.
///
/// # Errors
///
/// Returns an error naming the first argument without `=`.
pub fn parse_pairs(pairs: &[String]) -> CommandResult<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| format!("expected KEY=VALUE, got '{pair}'").into())
        })
        .collect()
}

/// Truncates `s` to `max` characters, adding `...` when cut.
fn truncate(s: &str, max: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_prompt_ref() {
        assert_eq!(split_prompt_ref("coding-review/Rust"), ("coding-review", "Rust"));
        assert_eq!(split_prompt_ref("Loose"), ("", "Loose"));
    }

    #[test]
    fn test_prompt_path() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        assert_eq!(
            prompt_path(&workspace, "coding-review/Rust").unwrap(),
            workspace.root().join("prompts/coding/review/Rust.md")
        );
        assert!(prompt_path(&workspace, "../../x/Foo").is_err());
        assert!(prompt_path(&workspace, "a/..").is_err());
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(&["CODE=fn main() {}".to_string(), "a = b=c".to_string()])
            .unwrap();
        assert_eq!(pairs["CODE"], "fn main() {}");
        assert_eq!(pairs["a"], " b=c");
        assert!(parse_pairs(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_read_content_prefers_inline() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("c.md");
        std::fs::write(&file, "from file").unwrap();
        assert_eq!(
            read_content(Some("inline".to_string()), Some(&file)).unwrap(),
            "inline"
        );
        assert_eq!(read_content(None, Some(&file)).unwrap(), "from file");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a\nb", 10), "a b");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_global_requires_root() {
        let config = ShelfConfig::new().with_workspace_root("/tmp/x");
        assert!(CliContext::new(config, true).root().is_err());
    }

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::from_flag(Some("JSON")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flag(None), OutputFormat::Table);
    }
}
