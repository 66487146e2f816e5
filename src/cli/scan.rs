//! `init` and `scan` commands.

use super::emit;
use crate::Result;
use crate::scanner::ScanPolicy;
use crate::services::PromptVault;
use crate::storage::CommitMessage;
use std::io::Write;
use std::path::Path;

/// Creates the repository if needed.
///
/// # Errors
///
/// Returns an error if the repository cannot be created.
pub fn cmd_init(vault: &PromptVault, out: &mut dyn Write) -> Result<()> {
    vault.init()?;
    emit(
        out,
        format_args!(
            "Initialized prompt repository at {} (document: {})",
            vault.store().repo_dir().display(),
            vault.store().file_name()
        ),
    )
}

/// Scans a source directory into the document.
///
/// # Errors
///
/// Returns scan and save errors.
pub fn cmd_scan(
    vault: &PromptVault,
    dir: &Path,
    hard: bool,
    recursive: bool,
    message: &CommitMessage,
    out: &mut dyn Write,
) -> Result<()> {
    let policy = if hard {
        ScanPolicy::HardReplace
    } else {
        ScanPolicy::Merge
    };
    vault.init()?;
    let report = vault.scan(dir, policy, recursive, message)?;

    emit(
        out,
        format_args!(
            "Scanned {} file(s) into '{}' ({}{})",
            report.files_scanned,
            report.root,
            report.policy,
            if report.recursive { ", recursive" } else { "" }
        ),
    )?;

    let heading = match report.policy {
        ScanPolicy::Merge => "New keys",
        ScanPolicy::HardReplace => "Keys present",
    };
    emit(out, format_args!("{heading}: {}", report.keys.len()))?;
    for key in &report.keys {
        emit(out, format_args!("  {key}"))?;
    }

    if !report.conflicts.is_empty() {
        emit(
            out,
            format_args!("Skipped (blocked by existing entries): {}", report.conflicts.len()),
        )?;
        for key in &report.conflicts {
            emit(out, format_args!("  {key}"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PromptreeConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_init_and_scan_output() {
        let repo = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        let pkg = src.path().join("pkg");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("mod.py"), "class Cls:\n    def fn(self):\n        pass\n").unwrap();

        let vault =
            PromptVault::open(&PromptreeConfig::default().with_repo_path(repo.path())).unwrap();

        let mut out = Vec::new();
        cmd_init(&vault, &mut out).unwrap();
        assert!(String::from_utf8_lossy(&out).contains("prompts.json"));

        let mut out = Vec::new();
        cmd_scan(&vault, &pkg, false, false, &CommitMessage::Default, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Scanned 1 file(s) into 'pkg' (merge)"));
        assert!(text.contains("New keys: 1"));
        assert!(text.contains("  pkg.mod.Cls.fn"));

        let mut out = Vec::new();
        cmd_scan(&vault, &pkg, true, true, &CommitMessage::Default, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(hard-replace, recursive)"));
        assert!(text.contains("Keys present: 1"));
    }
}
