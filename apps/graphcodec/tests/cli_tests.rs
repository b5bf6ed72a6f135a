//! Integration tests for the CLI commands over documents on disk.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use graphcodec::cli::{
    Cli, Outcome, execute, flatten_file, inspect_file, normalize_file, verify_file,
};
use graphcodec::config::AppConfig;
use graphcodec_core::CodecError;
use clap::Parser;
use std::path::PathBuf;
use tempfile::TempDir;

const CYCLIC_DOC: &str = r#"{"version":1,"data":{"name":"root","tags":{"__Set__":["a","b"]},"self":{"__Circular__":0}},"refs":[]}"#;

fn write_doc(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

// =============================================================================
// INSPECT
// =============================================================================

#[test]
fn test_inspect_reports_kinds_and_sharing() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", CYCLIC_DOC);

    let report = inspect_file(&AppConfig::default(), &path).unwrap();

    assert_eq!(report.version, 1);
    assert_eq!(report.root_kind, "record");
    assert_eq!(report.reachable, 2);
    assert_eq!(report.by_kind.get("record"), Some(&1));
    assert_eq!(report.by_kind.get("set"), Some(&1));
    assert_eq!(report.shared_references, 1);
    assert_eq!(report.dangling_references, 0);
}

#[test]
fn test_inspect_scalar_root() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", r#"{"version":1,"data":"hi","refs":[]}"#);

    let report = inspect_file(&AppConfig::default(), &path).unwrap();
    assert_eq!(report.root_kind, "string");
    assert_eq!(report.reachable, 0);
}

#[test]
fn test_inspect_rejects_wrong_version() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", r#"{"version":2,"data":null}"#);

    let result = inspect_file(&AppConfig::default(), &path);
    assert!(matches!(result, Err(CodecError::Format(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = inspect_file(&AppConfig::default(), &dir.path().join("absent.json"));
    assert!(matches!(result, Err(CodecError::Io(_))));
}

#[test]
fn test_directory_input_rejected() {
    let dir = TempDir::new().unwrap();
    let result = inspect_file(&AppConfig::default(), dir.path());
    assert!(matches!(result, Err(CodecError::Io(_))));
}

#[test]
fn test_file_size_limit_enforced() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", CYCLIC_DOC);
    let config = AppConfig::from_toml("[limits]\nmax_file_size = 16\n").unwrap();

    let result = inspect_file(&config, &path);
    assert!(matches!(result, Err(CodecError::TooLarge { max: 16, .. })));
}

// =============================================================================
// VERIFY
// =============================================================================

#[test]
fn test_verify_cyclic_document() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", CYCLIC_DOC);

    assert!(verify_file(&AppConfig::default(), &path).unwrap());
}

#[test]
fn test_verify_malformed_json() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", "not json");

    let err = verify_file(&AppConfig::default(), &path).unwrap_err();
    assert!(err.to_string().starts_with("failed to deserialize cache"));
}

#[test]
fn test_verify_unresolved_marker() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(
        &dir,
        "doc.json",
        r#"{"version":1,"data":[{"__Circular__":5}],"refs":[]}"#,
    );

    let result = verify_file(&AppConfig::default(), &path);
    assert!(matches!(result, Err(CodecError::UnresolvedReference(5))));
}

// =============================================================================
// FLATTEN / NORMALIZE
// =============================================================================

#[test]
fn test_flatten_degrades_cycle() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", CYCLIC_DOC);

    let text = flatten_file(&AppConfig::default(), &path).unwrap();
    let flat: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(
        flat,
        serde_json::json!({
            "name": "root",
            "tags": { "_type": "Set", "value": ["a", "b"] },
            "self": "[Circular]",
        })
    );
}

#[test]
fn test_normalize_is_stable() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", CYCLIC_DOC);

    let text = normalize_file(&AppConfig::default(), &path).unwrap();
    assert_eq!(text, CYCLIC_DOC);
}

#[test]
fn test_normalize_pretty_from_config() {
    let dir = TempDir::new().unwrap();
    let path = write_doc(&dir, "doc.json", CYCLIC_DOC);
    let config = AppConfig::from_toml("[codec]\npretty = true\n").unwrap();

    let text = normalize_file(&config, &path).unwrap();
    assert!(text.contains('\n'));

    let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let original: serde_json::Value = serde_json::from_str(CYCLIC_DOC).unwrap();
    assert_eq!(reparsed, original);
}

// =============================================================================
// EXECUTE
// =============================================================================

#[test]
fn test_execute_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "doc.json", CYCLIC_DOC);
    let output = dir.path().join("flat.json");

    let cli = Cli::try_parse_from([
        "graphcodec".into(),
        "flatten".into(),
        "-q".into(),
        "-i".into(),
        input.into_os_string(),
        "-o".into(),
        output.clone().into_os_string(),
    ])
    .unwrap();

    assert_eq!(execute(cli).unwrap(), Outcome::Success);
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("[Circular]"));
}

#[test]
fn test_execute_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "doc.json", CYCLIC_DOC);
    let config = write_doc(&dir, "gc.toml", "[limits]\nmax_file_size = 8\n");

    let cli = Cli::try_parse_from([
        "graphcodec".into(),
        "verify".into(),
        "--config".into(),
        config.into_os_string(),
        "-i".into(),
        input.into_os_string(),
    ])
    .unwrap();

    assert!(matches!(execute(cli), Err(CodecError::TooLarge { .. })));
}

#[test]
fn test_execute_rejects_bad_config() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "doc.json", CYCLIC_DOC);
    let config = write_doc(&dir, "gc.toml", "[codec\n");

    let cli = Cli::try_parse_from([
        "graphcodec".into(),
        "inspect".into(),
        "--config".into(),
        config.into_os_string(),
        "-i".into(),
        input.into_os_string(),
    ])
    .unwrap();

    assert!(matches!(execute(cli), Err(CodecError::Config(_))));
}

#[test]
fn test_execute_verify_json_mode() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(&dir, "doc.json", CYCLIC_DOC);

    let cli = Cli::try_parse_from([
        "graphcodec".into(),
        "verify".into(),
        "--json-mode".into(),
        "-i".into(),
        input.into_os_string(),
    ])
    .unwrap();

    assert_eq!(execute(cli).unwrap(), Outcome::Success);
}
