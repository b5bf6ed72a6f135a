//! # Formats
//!
//! The two textual codecs and the capability trait they share.
//!
//! - [`structural`]: identity-tracking, type-tagged, versioned documents.
//!   Shared and cyclic structure round-trips exactly.
//! - [`flat`]: inline `_type` tags for timestamps, maps and sets only.
//!   Any composite seen twice becomes `"[Circular]"`.
//!
//! Both are pure transformations between an [`ObjectGraph`] and text. Reading
//! and writing the text is the caller's business.

pub mod flat;
pub mod structural;

pub use flat::FlatCodec;
pub use structural::{Document, StructuralCodec};

use crate::primitives::MAX_DOCUMENT_SIZE;
use crate::{CodecError, ObjectGraph, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// CODEC TRAIT
// =============================================================================

/// A text codec for rooted object graphs.
///
/// Implementations differ in what they guarantee: `supports_cycles()` tells
/// whether shared and cyclic structure survives a round trip.
pub trait Codec {
    /// Short identifier for logs and CLI output.
    fn name(&self) -> &'static str;

    /// Whether identity (sharing and cycles) is preserved.
    fn supports_cycles(&self) -> bool;

    /// Encode `root` (and everything reachable from it) to text.
    fn encode_text(&self, graph: &ObjectGraph, root: &Value) -> Result<String, CodecError>;

    /// Rebuild a graph from text.
    fn decode_text(&self, text: &str) -> Result<Decoded, CodecError>;
}

/// Rendering options shared by both codecs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecOptions {
    /// Indent the output.
    pub pretty: bool,
}

/// The result of decoding: a fresh graph and the root value within it.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub graph: ObjectGraph,
    pub root: Value,
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Reject input larger than `MAX_DOCUMENT_SIZE` before parsing it.
pub(crate) fn check_size(text: &str) -> Result<(), CodecError> {
    if text.len() > MAX_DOCUMENT_SIZE {
        return Err(CodecError::TooLarge {
            size: text.len(),
            max: MAX_DOCUMENT_SIZE,
        });
    }
    Ok(())
}

/// Scalar number to JSON, the way a JavaScript-style stringifier would.
///
/// Integral values within the safe-integer range are written without a
/// fraction; non-finite values become `null`.
pub(crate) fn number_to_json(n: f64) -> serde_json::Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < MAX_SAFE {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Render a JSON tree as text.
pub(crate) fn render(json: &serde_json::Value, options: CodecOptions) -> Result<String, CodecError> {
    let result = if options.pretty {
        serde_json::to_string_pretty(json)
    } else {
        serde_json::to_string(json)
    };
    result.map_err(|e| CodecError::Serialization(e.to_string()))
}
