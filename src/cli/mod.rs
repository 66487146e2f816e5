//! CLI command implementations.
//!
//! Argument parsing lives in the binary; each function here takes parsed
//! values plus an output sink, so commands can be exercised in tests.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `init` | Create the repository holding the document |
//! | `scan` | Reconcile the document with a source tree |
//! | `get` | Print the template for a key |
//! | `set` | Assign a template to an existing key |
//! | `delete` | Remove keys or subtrees |
//! | `list` | List keys, optionally only unauthored ones |
//! | `render` | Render a template with `--var name=value` pairs |
//! | `history` | List revisions of the document or one key |
//! | `show` | Print a historical revision |
//! | `revert` | Restore a revision as a new commit |
//! | `diff` | Compare two revisions |
//!
//! # Example Usage
//!
//! ```bash
//! promptree init
//! promptree scan ./src/agents --recursive
//! promptree set agents.planner.Planner.plan "Plan the task: {task}"
//! promptree render agents.planner.Planner.plan --var task="ship it"
//! promptree history --key agents.planner.Planner.plan
//! promptree revert 3f2a91c0 --key agents.planner.Planner.plan
//! ```

mod history;
mod scan;
mod template;

pub use history::{cmd_diff, cmd_history, cmd_revert, cmd_show};
pub use scan::{cmd_init, cmd_scan};
pub use template::{cmd_delete, cmd_get, cmd_list, cmd_render, cmd_set};

use crate::models::KeyPath;
use crate::{Error, Result};
use std::io::Write;

/// Longest value preview shown in listings.
const PREVIEW_CHARS: usize = 60;

/// Parses an optional key argument.
fn parse_key(key: Option<&str>) -> Result<Option<KeyPath>> {
    key.map(KeyPath::parse).transpose()
}

/// Writes one line of command output.
fn emit(out: &mut dyn Write, line: impl std::fmt::Display) -> Result<()> {
    writeln!(out, "{line}").map_err(|e| Error::storage("write_output", e))
}

/// First line of a value, shortened for one-line listings.
fn preview(value: &str) -> String {
    let first = value.lines().next().unwrap_or_default();
    let mut shown: String = first.chars().take(PREVIEW_CHARS).collect();
    if shown.len() < first.len() || value.lines().nth(1).is_some() {
        shown.push_str("...");
    }
    shown
}

/// Abbreviated commit id.
fn short(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}
