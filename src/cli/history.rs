//! History commands: list, show, revert and diff revisions.

use super::{emit, parse_key, preview, short};
use crate::Result;
use crate::models::LeafChange;
use crate::services::{DiffReport, HistoryQuery, PromptVault, RevisionView};
use crate::storage::CommitMessage;
use std::io::Write;

/// Lists revisions of the document or of one key. A `limit` of zero lists all.
///
/// # Errors
///
/// Returns key parse or history errors.
pub fn cmd_history(
    vault: &PromptVault,
    key: Option<&str>,
    limit: Option<usize>,
    oldest_first: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let query = HistoryQuery {
        key: parse_key(key)?,
        max_results: limit.filter(|&n| n > 0),
        newest_first: !oldest_first,
    };
    let versions = vault.history(&query)?;
    if versions.is_empty() {
        return emit(out, "No revisions found.");
    }

    for entry in &versions {
        let commit = &entry.commit;
        match &entry.value {
            Some(value) => emit(
                out,
                format_args!(
                    "{}  {}  {}\n    {}",
                    commit.short_id(),
                    commit.local_time_string(),
                    commit.message,
                    preview(value)
                ),
            )?,
            None => emit(
                out,
                format_args!(
                    "{}  {}  {}",
                    commit.short_id(),
                    commit.local_time_string(),
                    commit.message
                ),
            )?,
        }
    }
    Ok(())
}

/// Prints a historical revision, whole or at one key.
///
/// # Errors
///
/// Returns snapshot errors.
pub fn cmd_show(
    vault: &PromptVault,
    commit: &str,
    key: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let key = parse_key(key)?;
    match vault.show_revision(commit, key.as_ref())? {
        RevisionView::Document(document) => {
            let text = vault.store().format().encode(&document)?;
            emit(out, text.trim_end())
        },
        RevisionView::Leaf { value, .. } => emit(out, value),
    }
}

/// Restores a revision as a new commit.
///
/// # Errors
///
/// Returns snapshot, policy or save errors.
pub fn cmd_revert(
    vault: &PromptVault,
    commit: &str,
    key: Option<&str>,
    message: &CommitMessage,
    out: &mut dyn Write,
) -> Result<()> {
    let key = parse_key(key)?;
    let outcome = vault.revert(commit, key.as_ref(), message)?;
    let target = outcome
        .key
        .as_ref()
        .map_or_else(|| "document".to_string(), ToString::to_string);

    match outcome.commit {
        Some(new_commit) => emit(
            out,
            format_args!(
                "Reverted {target} to {} as {}",
                short(commit),
                short(&new_commit)
            ),
        ),
        None => emit(
            out,
            format_args!("{target} already matches {}", short(commit)),
        ),
    }
}

/// Compares two revisions.
///
/// # Errors
///
/// Returns snapshot errors.
pub fn cmd_diff(
    vault: &PromptVault,
    commit_a: &str,
    commit_b: &str,
    key: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let key = parse_key(key)?;
    let report = vault.diff(commit_a, commit_b, key.as_ref())?;
    if report.is_equal() {
        return emit(
            out,
            format_args!("No differences between {} and {}", short(commit_a), short(commit_b)),
        );
    }

    match report {
        DiffReport::Key {
            key, before, after, ..
        } => {
            emit(out, format_args!("{key}"))?;
            emit(out, format_args!("- {}", before.as_deref().unwrap_or("<absent>")))?;
            emit(out, format_args!("+ {}", after.as_deref().unwrap_or("<absent>")))
        },
        DiffReport::Document { changes, .. } => {
            if changes.is_empty() {
                // Structure differs with no leaf-level change, e.g. an emptied subtree.
                return emit(out, "Documents differ in structure only.");
            }
            for change in &changes {
                match change {
                    LeafChange::Added { key, value } => {
                        emit(out, format_args!("+ {key}  {}", preview(value)))?;
                    },
                    LeafChange::Removed { key, value } => {
                        emit(out, format_args!("- {key}  {}", preview(value)))?;
                    },
                    LeafChange::Modified { key, before, after } => {
                        emit(
                            out,
                            format_args!("~ {key}  {} -> {}", preview(before), preview(after)),
                        )?;
                    },
                }
            }
            Ok(())
        },
    }
}
