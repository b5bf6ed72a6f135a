//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Each command has a pure half (`*_file`) that returns data and a printing
//! half (`cmd_*`) that renders it for humans or, with `--json-mode`, as JSON.

use super::Outcome;
use crate::config::AppConfig;
use graphcodec_core::{
    Codec, CodecError, Decoded, Document, FlatCodec, ObjectKind, StructuralCodec, Value,
    decode_document, verify_document,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CodecError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CodecError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CodecError::TooLarge {
            size: metadata.len() as usize,
            max: max_size as usize,
        });
    }
    Ok(())
}

/// Resolve an input path and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CodecError> {
    let canonical = path.canonicalize().map_err(|e| {
        CodecError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CodecError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, CodecError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CodecError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CodecError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CodecError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Validate and read an input file as text.
fn read_input(config: &AppConfig, path: &Path) -> Result<String, CodecError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, config.limits.max_file_size)?;

    let text = std::fs::read_to_string(&validated)
        .map_err(|e| CodecError::Io(format!("Read file: {}", e)))?;
    tracing::debug!(path = %validated.display(), bytes = text.len(), "read input");
    Ok(text)
}

/// Read and decode a structural document.
fn read_document(config: &AppConfig, path: &Path) -> Result<(Document, Decoded), CodecError> {
    let text = read_input(config, path)?;
    let document = Document::from_json(serde_json::from_str(&text)?)?;
    let decoded = decode_document(&document)?;
    Ok((document, decoded))
}

/// Write command output to a file, or stdout when no path is given.
fn write_output(text: &str, output: Option<&Path>, quiet: bool) -> Result<(), CodecError> {
    let Some(output) = output else {
        println!("{}", text);
        return Ok(());
    };

    let validated = validate_output_path(output)?;
    std::fs::write(&validated, text)
        .map_err(|e| CodecError::Io(format!("Write file: {}", e)))?;

    if !quiet {
        println!("Wrote {} bytes to {:?}", text.len(), validated);
    }
    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Summary of a decoded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub version: u64,
    pub root_kind: String,
    pub reachable: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub shared_references: usize,
    pub dangling_references: usize,
}

/// Name of the kind of a root value.
fn value_kind(decoded: &Decoded) -> String {
    match &decoded.root {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Function(_) => "function".to_string(),
        Value::Ref(_) => decoded
            .graph
            .resolve(&decoded.root)
            .map(|o| o.kind().to_string())
            .unwrap_or_else(|| "dangling".to_string()),
    }
}

/// Decode a document and summarize its structure.
pub fn inspect_file(config: &AppConfig, input: &Path) -> Result<InspectReport, CodecError> {
    let (document, decoded) = read_document(config, input)?;
    let stats = decoded.graph.stats(&decoded.root);

    let by_kind = ObjectKind::ALL
        .iter()
        .filter_map(|kind| {
            stats
                .by_kind
                .get(kind)
                .map(|count| (kind.as_str().to_string(), *count))
        })
        .collect();

    Ok(InspectReport {
        version: document.version,
        root_kind: value_kind(&decoded),
        reachable: stats.reachable,
        by_kind,
        shared_references: stats.shared_references,
        dangling_references: stats.dangling_references,
    })
}

/// Show a document summary.
pub fn cmd_inspect(config: &AppConfig, input: &Path, json_mode: bool) -> Result<Outcome, CodecError> {
    let report = inspect_file(config, input)?;

    if json_mode {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        println!("{}", text);
        return Ok(Outcome::Success);
    }

    println!("Document Summary");
    println!("================");
    println!("File:     {:?}", input);
    println!("Version:  {}", report.version);
    println!("Root:     {}", report.root_kind);
    println!();
    println!("Composites:         {}", report.reachable);
    for (kind, count) in &report.by_kind {
        println!("  {:<18}{}", kind, count);
    }
    println!("Shared references:  {}", report.shared_references);
    if report.dangling_references > 0 {
        println!("Dangling references: {}", report.dangling_references);
    }

    Ok(Outcome::Success)
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Check that a document survives decode and re-encode.
pub fn verify_file(config: &AppConfig, input: &Path) -> Result<bool, CodecError> {
    let text = read_input(config, input)?;
    verify_document(&text)
}

/// Verify a document, reporting `Unstable` when the round trip differs.
pub fn cmd_verify(config: &AppConfig, input: &Path, json_mode: bool) -> Result<Outcome, CodecError> {
    let stable = verify_file(config, input)?;

    if json_mode {
        let output = serde_json::json!({
            "file": input.to_string_lossy(),
            "stable": stable,
        });
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        println!("{}", text);
    } else if stable {
        println!("OK: {:?} round-trips cleanly", input);
    } else {
        println!("UNSTABLE: {:?} does not survive a round trip", input);
    }

    Ok(if stable {
        Outcome::Success
    } else {
        Outcome::Unstable
    })
}

// =============================================================================
// FLATTEN COMMAND
// =============================================================================

/// Decode a structural document and render it in the flat format.
pub fn flatten_file(config: &AppConfig, input: &Path) -> Result<String, CodecError> {
    let (_, decoded) = read_document(config, input)?;
    let stats = decoded.graph.stats(&decoded.root);
    if stats.shared_references > 0 {
        tracing::warn!(
            revisits = stats.shared_references,
            "flat output replaces revisited composites with \"[Circular]\""
        );
    }
    FlatCodec::new(config.codec).encode_text(&decoded.graph, &decoded.root)
}

/// Convert a document to the flat format.
pub fn cmd_flatten(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    quiet: bool,
) -> Result<Outcome, CodecError> {
    let text = flatten_file(config, input)?;
    write_output(&text, output, quiet)?;
    Ok(Outcome::Success)
}

// =============================================================================
// NORMALIZE COMMAND
// =============================================================================

/// Decode a structural document and encode it again.
pub fn normalize_file(config: &AppConfig, input: &Path) -> Result<String, CodecError> {
    let (_, decoded) = read_document(config, input)?;
    StructuralCodec::new(config.codec).encode_text(&decoded.graph, &decoded.root)
}

/// Rewrite a document in canonical structural form.
pub fn cmd_normalize(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    quiet: bool,
) -> Result<Outcome, CodecError> {
    let text = normalize_file(config, input)?;
    write_output(&text, output, quiet)?;
    Ok(Outcome::Success)
}
