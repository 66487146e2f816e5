//! Binary entry point for promptree.
//!
//! This binary provides the CLI interface over the prompt vault.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow needless_pass_by_value for command dispatch
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use promptree::cli;
use promptree::observability::{self, LoggingConfig};
use promptree::scanner::SourceLanguage;
use promptree::{CommitMessage, Error, PromptVault, PromptreeConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Promptree - hierarchical, git-versioned prompt templates.
#[derive(Parser)]
#[command(name = "promptree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository holding the template document (overrides config).
    #[arg(short, long, global = true)]
    repo: Option<PathBuf>,

    /// Document file name inside the repository (overrides config).
    #[arg(long, global = true)]
    store_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the repository holding the document.
    Init,

    /// Reconcile the document with a source directory.
    Scan {
        /// Source directory to scan.
        dir: PathBuf,

        /// Replace the directory's subtree instead of merging into it.
        #[arg(long)]
        hard: bool,

        /// Descend into subdirectories.
        #[arg(short = 'R', long)]
        recursive: bool,

        /// Source language: python or rust (overrides config).
        #[arg(short, long)]
        language: Option<String>,

        /// Commit message; pass `-m` alone to be prompted.
        #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
        message: Option<String>,
    },

    /// Print the template for a key.
    Get {
        /// Dotted key, or `group.slot` shorthand.
        key: String,
    },

    /// Assign a template to an existing key.
    Set {
        /// Dotted key of an existing template.
        key: String,

        /// Template text.
        #[arg(required_unless_present = "from_file")]
        value: Option<String>,

        /// Read the template text from a file.
        #[arg(short, long, conflicts_with = "value")]
        from_file: Option<PathBuf>,

        /// Commit message; pass `-m` alone to be prompted.
        #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
        message: Option<String>,
    },

    /// Remove keys or whole subtrees.
    Delete {
        /// Dotted keys to remove.
        #[arg(required = true)]
        keys: Vec<String>,

        /// Commit message; pass `-m` alone to be prompted.
        #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
        message: Option<String>,
    },

    /// List keys with a preview of their templates.
    List {
        /// Only keys under this prefix.
        #[arg(short, long)]
        prefix: Option<String>,

        /// Only keys still holding the "no prompts" placeholder.
        #[arg(short, long)]
        unauthored: bool,
    },

    /// Render a template.
    Render {
        /// Dotted key, or `group.slot` shorthand.
        key: String,

        /// Variable as NAME=VALUE; repeat for each placeholder.
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },

    /// List revisions of the document or one key.
    History {
        /// Only revisions where this key holds a template.
        #[arg(short, long)]
        key: Option<String>,

        /// Maximum number of revisions, 0 for all (overrides config).
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Oldest revisions first.
        #[arg(long)]
        oldest_first: bool,
    },

    /// Print a historical revision.
    Show {
        /// Commit id.
        commit: String,

        /// Print only this key.
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Restore a revision as a new commit.
    Revert {
        /// Commit id to restore from.
        commit: String,

        /// Restore only this key.
        #[arg(short, long)]
        key: Option<String>,

        /// Commit message; pass `-m` alone to be prompted.
        #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
        message: Option<String>,
    },

    /// Compare two revisions.
    Diff {
        /// Older commit id.
        commit_a: String,

        /// Newer commit id.
        commit_b: String,

        /// Compare only this key.
        #[arg(short, long)]
        key: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&LoggingConfig::from_settings(&config.logging, cli.verbose))
    {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    if let Some(source) = &config.source {
        tracing::debug!(config = %source.display(), "Loaded configuration");
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration and applies command-line overrides.
fn load_config(cli: &Cli) -> promptree::Result<PromptreeConfig> {
    let mut config = PromptreeConfig::load(cli.config.as_deref())?;
    if let Some(repo) = &cli.repo {
        config = config.with_repo_path(repo);
    }
    if let Some(file) = &cli.store_file {
        config = config.with_store_file(file);
    }
    if let Commands::Scan {
        language: Some(language),
        ..
    } = &cli.command
    {
        let parsed = SourceLanguage::parse(language).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown language '{language}' (expected python or rust)"
            ))
        })?;
        config = config.with_language(parsed);
    }
    Ok(config)
}

/// Runs the selected command.
fn run_command(command: Commands, config: &PromptreeConfig) -> promptree::Result<()> {
    let vault = PromptVault::open(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = match command {
        Commands::Init => cli::cmd_init(&vault, &mut out),

        Commands::Scan {
            dir,
            hard,
            recursive,
            message,
            ..
        } => cli::cmd_scan(
            &vault,
            &dir,
            hard,
            recursive,
            &CommitMessage::from_arg(message),
            &mut out,
        ),

        Commands::Get { key } => cli::cmd_get(&vault, &key, &mut out),

        Commands::Set {
            key,
            value,
            from_file,
            message,
        } => cli::cmd_set(
            &vault,
            &key,
            value.as_deref(),
            from_file.as_deref(),
            &CommitMessage::from_arg(message),
            &mut out,
        ),

        Commands::Delete { keys, message } => {
            cli::cmd_delete(&vault, &keys, &CommitMessage::from_arg(message), &mut out)
        },

        Commands::List { prefix, unauthored } => {
            cli::cmd_list(&vault, prefix.as_deref(), unauthored, &mut out)
        },

        Commands::Render { key, vars } => cli::cmd_render(&vault, &key, &vars, &mut out),

        Commands::History {
            key,
            limit,
            oldest_first,
        } => cli::cmd_history(&vault, key.as_deref(), limit, oldest_first, &mut out),

        Commands::Show { commit, key } => cli::cmd_show(&vault, &commit, key.as_deref(), &mut out),

        Commands::Revert {
            commit,
            key,
            message,
        } => cli::cmd_revert(
            &vault,
            &commit,
            key.as_deref(),
            &CommitMessage::from_arg(message),
            &mut out,
        ),

        Commands::Diff {
            commit_a,
            commit_b,
            key,
        } => cli::cmd_diff(&vault, &commit_a, &commit_b, key.as_deref(), &mut out),
    };

    out.flush()
        .map_err(|e| Error::storage("flush_output", e))?;
    result
}
