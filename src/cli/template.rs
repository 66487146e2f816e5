//! Commands that read and author templates in the live document.

use super::{emit, parse_key, preview, short};
use crate::models::KeyPath;
use crate::rendering::parse_variable_pairs;
use crate::services::{PromptKey, PromptVault};
use crate::storage::CommitMessage;
use crate::{Error, Result};
use std::io::Write;
use std::path::Path;

/// Prints the template for a key.
///
/// # Errors
///
/// Returns resolution errors.
pub fn cmd_get(vault: &PromptVault, key: &str, out: &mut dyn Write) -> Result<()> {
    let resolved = vault.get_prompt(&PromptKey::parse(key)?)?;
    if resolved.via_fallback {
        tracing::info!(requested = key, resolved = %resolved.path, "Resolved through group fallback");
    }
    emit(out, resolved.template)
}

/// Assigns a template to an existing key.
///
/// The text comes from `value` or, when given, the contents of `from_file`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if neither source is given, and
/// [`Error::PolicyViolation`] if the key is not an existing leaf.
pub fn cmd_set(
    vault: &PromptVault,
    key: &str,
    value: Option<&str>,
    from_file: Option<&Path>,
    message: &CommitMessage,
    out: &mut dyn Write,
) -> Result<()> {
    let key = KeyPath::parse(key)?;
    let text = match (from_file, value) {
        (Some(path), _) => std::fs::read_to_string(path).map_err(|e| {
            Error::storage("read_template_file", format!("{}: {e}", path.display()))
        })?,
        (None, Some(value)) => value.to_string(),
        (None, None) => {
            return Err(Error::InvalidInput(
                "a value or --from-file is required".to_string(),
            ));
        },
    };

    match vault.set(&key, &text, message)? {
        Some(commit) => emit(out, format_args!("Updated {key} ({})", short(&commit))),
        None => emit(out, format_args!("Unchanged {key}")),
    }
}

/// Deletes keys or subtrees.
///
/// # Errors
///
/// Returns key parse, load or save errors.
pub fn cmd_delete(
    vault: &PromptVault,
    keys: &[String],
    message: &CommitMessage,
    out: &mut dyn Write,
) -> Result<()> {
    let paths = keys
        .iter()
        .map(|k| KeyPath::parse(k))
        .collect::<Result<Vec<_>>>()?;
    let deleted = vault.delete(&paths, message)?;

    for path in &paths {
        if deleted.contains(path) {
            emit(out, format_args!("Deleted {path}"))?;
        } else {
            emit(out, format_args!("Not found {path}"))?;
        }
    }
    Ok(())
}

/// Lists keys with a preview of their templates.
///
/// # Errors
///
/// Returns key parse or load errors.
pub fn cmd_list(
    vault: &PromptVault,
    prefix: Option<&str>,
    unauthored_only: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let prefix = parse_key(prefix)?;
    let entries = vault.list_keys(prefix.as_ref(), unauthored_only)?;
    if entries.is_empty() {
        return emit(out, "No keys found.");
    }
    for (key, value) in &entries {
        emit(out, format_args!("{key}  {}", preview(value)))?;
    }
    Ok(())
}

/// Renders the template for a key with `name=value` pairs.
///
/// # Errors
///
/// Returns resolution errors, malformed pairs, or
/// [`Error::VariableMismatch`].
pub fn cmd_render(
    vault: &PromptVault,
    key: &str,
    vars: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let variables = parse_variable_pairs(vars)?;
    let text = vault.get_rendered(&PromptKey::parse(key)?, &variables)?;
    emit(out, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PromptreeConfig;
    use crate::scanner::ScanPolicy;
    use std::fs;
    use tempfile::TempDir;

    fn scanned_vault(repo: &TempDir, src: &TempDir) -> PromptVault {
        let pkg = src.path().join("pkg");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("mod.py"),
            "class Cls:\n    def fn(self):\n        pass\n    def other(self):\n        pass\n",
        )
        .unwrap();
        let vault =
            PromptVault::open(&PromptreeConfig::default().with_repo_path(repo.path())).unwrap();
        vault.init().unwrap();
        vault
            .scan(&pkg, ScanPolicy::Merge, false, &CommitMessage::Default)
            .unwrap();
        vault
    }

    fn run(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_set_get_render() {
        let (repo, src) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let vault = scanned_vault(&repo, &src);

        let text = run(|out| {
            cmd_set(
                &vault,
                "pkg.mod.Cls.fn",
                Some("Hello {name}"),
                None,
                &CommitMessage::Default,
                out,
            )
        });
        assert!(text.starts_with("Updated pkg.mod.Cls.fn ("));

        assert_eq!(run(|out| cmd_get(&vault, "pkg.mod.Cls.fn", out)), "Hello {name}\n");
        // group.slot fallback
        assert_eq!(run(|out| cmd_get(&vault, "Cls.fn", out)), "Hello {name}\n");

        let vars = vec!["name=World".to_string()];
        assert_eq!(
            run(|out| cmd_render(&vault, "pkg.mod.Cls.fn", &vars, out)),
            "Hello World\n"
        );
        let extra = vec!["name=World".to_string(), "x=1".to_string()];
        let err = cmd_render(&vault, "pkg.mod.Cls.fn", &extra, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::VariableMismatch { .. }));
    }

    #[test]
    fn test_set_from_file_and_rejects_unknown_key() {
        let (repo, src) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let vault = scanned_vault(&repo, &src);
        let file = src.path().join("template.txt");
        fs::write(&file, "line one\nline two").unwrap();

        run(|out| {
            cmd_set(
                &vault,
                "pkg.mod.Cls.other",
                None,
                Some(&file),
                &CommitMessage::Default,
                out,
            )
        });
        let listing = run(|out| cmd_list(&vault, Some("pkg.mod"), false, out));
        assert!(listing.contains("pkg.mod.Cls.other  line one..."));

        let unauthored = run(|out| cmd_list(&vault, None, true, out));
        assert!(unauthored.contains("pkg.mod.Cls.fn"));
        assert!(!unauthored.contains("pkg.mod.Cls.other"));

        let err = cmd_set(
            &vault,
            "pkg.mod.Cls.missing",
            Some("x"),
            None,
            &CommitMessage::Default,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::PolicyViolation(_)));

        let err = cmd_set(
            &vault,
            "pkg.mod.Cls.fn",
            None,
            None,
            &CommitMessage::Default,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_delete_reports_each_key() {
        let (repo, src) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        let vault = scanned_vault(&repo, &src);

        let keys = vec!["pkg.mod.Cls.fn".to_string(), "pkg.nope".to_string()];
        let text = run(|out| cmd_delete(&vault, &keys, &CommitMessage::Default, out));
        assert_eq!(text, "Deleted pkg.mod.Cls.fn\nNot found pkg.nope\n");

        let keys = vec!["pkg".to_string()];
        run(|out| cmd_delete(&vault, &keys, &CommitMessage::Default, out));
        assert_eq!(run(|out| cmd_list(&vault, None, false, out)), "No keys found.\n");
    }
}
