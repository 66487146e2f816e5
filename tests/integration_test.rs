//! End-to-end tests for the prompt vault.
//!
//! Exercises the full path a consumer takes:
//! - Authoring a document and committing it to a real git repository
//! - Exact and group.slot resolution, explicit and by call site
//! - Strict rendering
//! - Delete, history and non-destructive revert

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use promptree::services::{DiffReport, HistoryQuery, RevisionView};
use promptree::{
    CallSite, CommitMessage, Document, Error, KeyPath, PromptKey, PromptVault, PromptreeConfig,
};
use std::collections::HashMap;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn key(text: &str) -> KeyPath {
    KeyPath::parse(text).expect("valid key")
}

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Opens a vault in a fresh repository holding the given document.
fn vault_with(dir: &TempDir, json: &str) -> PromptVault {
    let vault = PromptVault::open(&PromptreeConfig::default().with_repo_path(dir.path()))
        .expect("open vault");
    vault.init().expect("init repository");
    let document: Document = serde_json::from_str(json).expect("valid document");
    vault
        .store()
        .save(&document, &CommitMessage::Default)
        .expect("save document");
    vault
}

const HELLO: &str = r#"{"pkg": {"mod": {"Cls": {"fn": "Hello {name}"}}}}"#;

// ============================================================================
// Resolution and rendering
// ============================================================================

#[test]
fn test_end_to_end_resolve_and_render() {
    let dir = TempDir::new().unwrap();
    let vault = vault_with(&dir, HELLO);

    let resolved = vault
        .get_prompt(&PromptKey::parse("pkg.mod.Cls.fn").unwrap())
        .unwrap();
    assert_eq!(resolved.path, key("pkg.mod.Cls.fn"));
    assert_eq!(resolved.template, "Hello {name}");
    assert!(!resolved.via_fallback);

    assert_eq!(
        vault
            .render(&resolved.template, &vars(&[("name", "World")]))
            .unwrap(),
        "Hello World"
    );

    match vault.render(&resolved.template, &HashMap::<String, String>::new()) {
        Err(Error::VariableMismatch { missing, extra }) => {
            assert_eq!(missing, vec!["name".to_string()]);
            assert!(extra.is_empty());
        },
        other => panic!("expected missing variable, got {other:?}"),
    }

    match vault.render(
        &resolved.template,
        &vars(&[("name", "World"), ("extra", "x")]),
    ) {
        Err(Error::VariableMismatch { missing, extra }) => {
            assert!(missing.is_empty());
            assert_eq!(extra, vec!["extra".to_string()]);
        },
        other => panic!("expected extra variable, got {other:?}"),
    }
}

#[test]
fn test_group_slot_fallback_and_call_site() {
    let dir = TempDir::new().unwrap();
    let vault = vault_with(&dir, HELLO);

    let resolved = vault
        .get_prompt(&PromptKey::parse("Cls.fn").unwrap())
        .unwrap();
    assert_eq!(resolved.path, key("pkg.mod.Cls.fn"));
    assert!(resolved.via_fallback);

    // Located explicitly.
    let site = CallSite::new("Cls", "fn").in_module("pkg", "mod");
    let text = vault
        .get_rendered(&PromptKey::from(site), &vars(&[("name", "there")]))
        .unwrap();
    assert_eq!(text, "Hello there");

    // A test crate root has no enclosing module, so only group.slot remains.
    let site = promptree::call_site!("Cls", "fn");
    assert_eq!(site.key_path().unwrap(), key("Cls.fn"));
    let resolved = vault.get_prompt(&PromptKey::from(site)).unwrap();
    assert_eq!(resolved.template, "Hello {name}");
}

#[test]
fn test_resolution_errors_are_typed() {
    let dir = TempDir::new().unwrap();
    let vault = vault_with(&dir, HELLO);

    let err = vault
        .get_prompt(&PromptKey::parse("pkg.mod.Other.fn").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = vault
        .get_prompt(&PromptKey::parse("pkg.mod").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::StructuralMismatch { .. }));
}

// ============================================================================
// Mutation
// ============================================================================

#[test]
fn test_delete_example() {
    let dir = TempDir::new().unwrap();
    let vault = vault_with(&dir, HELLO);

    let deleted = vault
        .delete(&[key("pkg.mod.Cls.fn")], &CommitMessage::Default)
        .unwrap();
    assert_eq!(deleted, vec![key("pkg.mod.Cls.fn")]);

    let expected: Document = serde_json::from_str(r#"{"pkg": {"mod": {"Cls": {}}}}"#).unwrap();
    assert_eq!(vault.load().unwrap(), expected);

    let deleted = vault
        .delete(&[key("pkg.mod.Cls.fn")], &CommitMessage::Default)
        .unwrap();
    assert!(deleted.is_empty());
}

#[test]
fn test_set_only_updates_existing_leaves() {
    let dir = TempDir::new().unwrap();
    let vault = vault_with(&dir, HELLO);

    let err = vault
        .set(&key("pkg.mod.Cls.new_fn"), "x", &CommitMessage::Default)
        .unwrap_err();
    assert!(matches!(err, Error::PolicyViolation(_)));
    let err = vault
        .set(&key("pkg.mod"), "x", &CommitMessage::Default)
        .unwrap_err();
    assert!(matches!(err, Error::PolicyViolation(_)));

    let commit = vault
        .set(&key("pkg.mod.Cls.fn"), "Hi {name}", &CommitMessage::Default)
        .unwrap();
    assert!(commit.is_some());
}

// ============================================================================
// History
// ============================================================================

#[test]
fn test_revert_is_non_destructive() {
    let dir = TempDir::new().unwrap();
    let vault = vault_with(&dir, HELLO);
    vault
        .set(
            &key("pkg.mod.Cls.fn"),
            "Goodbye {name}",
            &CommitMessage::Custom("reword".to_string()),
        )
        .unwrap();

    let versions = vault
        .history(&HistoryQuery {
            key: Some(key("pkg.mod.Cls.fn")),
            ..HistoryQuery::default()
        })
        .unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].commit.message, "reword");
    assert_eq!(versions[0].value.as_deref(), Some("Goodbye {name}"));
    let original = versions[1].commit.id.clone();
    let reworded = versions[0].commit.id.clone();

    let outcome = vault
        .revert(&original, Some(&key("pkg.mod.Cls.fn")), &CommitMessage::Default)
        .unwrap();
    assert!(outcome.commit.is_some());
    assert_eq!(
        vault.load().unwrap().leaf(&key("pkg.mod.Cls.fn")),
        Some("Hello {name}")
    );

    // The reverted-from revision stays reachable.
    match vault
        .show_revision(&reworded, Some(&key("pkg.mod.Cls.fn")))
        .unwrap()
    {
        RevisionView::Leaf { value, .. } => assert_eq!(value, "Goodbye {name}"),
        RevisionView::Document(_) => panic!("expected a leaf view"),
    }
    assert_eq!(vault.history(&HistoryQuery::default()).unwrap().len(), 3);

    let report = vault.diff(&original, &reworded, None).unwrap();
    assert!(!report.is_equal());
    match report {
        DiffReport::Document { changes, .. } => assert_eq!(changes.len(), 1),
        DiffReport::Key { .. } => panic!("expected a document diff"),
    }
}

#[test]
fn test_unknown_commit_is_not_found() {
    let dir = TempDir::new().unwrap();
    let vault = vault_with(&dir, HELLO);

    let err = vault
        .show_revision("0123456789abcdef0123456789abcdef01234567", None)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
