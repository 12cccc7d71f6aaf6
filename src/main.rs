//! Binary entry point for promptshelf.
//!
//! This binary provides the CLI interface for the promptshelf template store.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use promptshelf::ShelfConfig;
use promptshelf::cli::{self, CliContext};
use promptshelf::observability::{self, InitOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Promptshelf - a tag-hierarchical store for prompt templates.
#[derive(Parser)]
#[command(name = "promptshelf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Operate on the global workspace instead of the local one.
    #[arg(short, long, global = true)]
    global: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Prompt template management.
    Prompt {
        #[command(subcommand)]
        action: PromptAction,
    },

    /// Partial snippet management.
    Partial {
        #[command(subcommand)]
        action: PartialAction,
    },

    /// Export a prompt and its partials as a transfer string.
    Export {
        /// Prompt as `tag/Title`.
        prompt: String,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a transfer string.
    Import {
        /// Transfer string; read from --from-file or stdin when omitted.
        transfer: Option<String>,

        /// Read the transfer string from a file.
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Replace files that already exist.
        #[arg(long)]
        overwrite: bool,

        /// Report what would be written without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Keep the workspace in sync with external edits.
    Watch,

    /// Show workspace statistics.
    Status {
        /// Output format: table or json.
        #[arg(short, long)]
        format: Option<String>,
    },
}

/// Prompt subcommands.
#[derive(Subcommand)]
enum PromptAction {
    /// List prompts.
    List {
        /// Only prompts under this tag.
        #[arg(short, long)]
        tag: Option<String>,

        /// Output format: table or json.
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Print a prompt.
    Show {
        /// Prompt as `tag/Title`.
        prompt: String,

        /// Replace partial references with partial content.
        #[arg(short, long)]
        resolve: bool,

        /// Picker selection as `folder=dot.path` (repeatable).
        #[arg(short, long = "pick")]
        picks: Vec<String>,

        /// Parameter value as `NAME=value` (repeatable).
        #[arg(short = 'V', long = "var")]
        vars: Vec<String>,

        /// Output format: text or json.
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Create or update a prompt.
    Save {
        /// Hyphen-joined tag; use "" for the prompts root.
        tag: String,

        /// Prompt title (file name without extension).
        title: String,

        /// Inline content.
        #[arg(long)]
        content: Option<String>,

        /// Read content from a file.
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// The prompt being edited, as `tag/Title`, when renaming or retagging.
        #[arg(long)]
        replaces: Option<String>,
    },

    /// Delete a prompt.
    Delete {
        /// Prompt as `tag/Title`.
        prompt: String,
    },

    /// Full-text search over prompts.
    Search {
        /// Search query.
        query: String,

        /// Maximum number of results.
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Output format: table or json.
        #[arg(short, long)]
        format: Option<String>,
    },
}

/// Partial subcommands.
#[derive(Subcommand)]
enum PartialAction {
    /// List partials.
    List {
        /// Output format: table or json.
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Print a partial.
    Show {
        /// Dot path, e.g. `tones.formal`.
        path: String,
    },

    /// Create or update a partial.
    Save {
        /// Dot path, e.g. `tones.formal`.
        path: String,

        /// Inline content.
        #[arg(long)]
        content: Option<String>,

        /// Read content from a file.
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Dot path of the partial being edited, when renaming.
        #[arg(long)]
        replaces: Option<String>,
    },

    /// Delete a partial.
    Delete {
        /// Dot path.
        path: String,
    },

    /// Substring search over partial paths and content.
    Search {
        /// Search text.
        query: String,

        /// Output format: table or json.
        #[arg(short, long)]
        format: Option<String>,
    },

    /// List the partials directly inside a folder.
    Children {
        /// Folder dot path, e.g. `tones`.
        folder: String,

        /// Output format: table or json.
        #[arg(short, long)]
        format: Option<String>,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ShelfConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_config(
        &config.logging,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let ctx = CliContext::new(config, cli.global);
    let result = match cli.command {
        Commands::Watch => cli::cmd_watch(&ctx).await,
        command => run_command(&ctx, command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected synchronous command.
fn run_command(ctx: &CliContext, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Prompt { action } => cmd_prompt(ctx, action),
        Commands::Partial { action } => cmd_partial(ctx, action),
        Commands::Export { prompt, output } => cli::cmd_export(ctx, prompt, output),
        Commands::Import {
            transfer,
            from_file,
            overwrite,
            dry_run,
        } => cli::cmd_import(ctx, transfer, from_file, overwrite, dry_run),
        Commands::Status { format } => cli::cmd_status(ctx, format),
        Commands::Watch => Err("watch must run on the async runtime".into()),
    }
}

/// Prompt command.
fn cmd_prompt(ctx: &CliContext, action: PromptAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PromptAction::List { tag, format } => cli::cmd_prompt_list(ctx, tag, format),
        PromptAction::Show {
            prompt,
            resolve,
            picks,
            vars,
            format,
        } => cli::cmd_prompt_show(ctx, prompt, resolve, picks, vars, format),
        PromptAction::Save {
            tag,
            title,
            content,
            from_file,
            replaces,
        } => cli::cmd_prompt_save(ctx, tag, title, content, from_file, replaces),
        PromptAction::Delete { prompt } => cli::cmd_prompt_delete(ctx, prompt),
        PromptAction::Search {
            query,
            limit,
            format,
        } => cli::cmd_prompt_search(ctx, query, limit, format),
    }
}

/// Partial command.
fn cmd_partial(ctx: &CliContext, action: PartialAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PartialAction::List { format } => cli::cmd_partial_list(ctx, format),
        PartialAction::Show { path } => cli::cmd_partial_show(ctx, path),
        PartialAction::Save {
            path,
            content,
            from_file,
            replaces,
        } => cli::cmd_partial_save(ctx, path, content, from_file, replaces),
        PartialAction::Delete { path } => cli::cmd_partial_delete(ctx, path),
        PartialAction::Search { query, format } => cli::cmd_partial_search(ctx, query, format),
        PartialAction::Children { folder, format } => {
            cli::cmd_partial_children(ctx, folder, format)
        },
    }
}
