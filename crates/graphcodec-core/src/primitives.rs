//! # Format Primitives
//!
//! Fixed constants shared by the codecs.
//!
//! These are compiled into the binary and never change at runtime.

/// Current structural document format version.
///
/// Decoding rejects any other value.
pub const FORMAT_VERSION: u64 = 1;

/// Maximum accepted document size for decoding.
///
/// Validated BEFORE parsing so oversized input is never allocated into a tree.
pub const MAX_DOCUMENT_SIZE: usize = 256 * 1024 * 1024; // 256 MB

// =============================================================================
// STRUCTURAL TAGS
// =============================================================================

pub const TAG_MAP: &str = "__Map__";
pub const TAG_SET: &str = "__Set__";
pub const TAG_TEXT_RANGE: &str = "__TextRange__";
pub const TAG_RANGE_COLLECTION: &str = "__TextRangeCollection__";
pub const TAG_PARSE_NODE: &str = "__ParseNode__";
pub const TAG_DIAGNOSTIC: &str = "__Diagnostic__";
pub const TAG_DATE: &str = "__Date__";
pub const TAG_REGEXP: &str = "__RegExp__";
pub const TAG_CIRCULAR: &str = "__Circular__";

/// Every reserved tag string. A record with a single key from this list is
/// read back as a tagged node.
pub const RESERVED_TAGS: [&str; 9] = [
    TAG_MAP,
    TAG_SET,
    TAG_TEXT_RANGE,
    TAG_RANGE_COLLECTION,
    TAG_PARSE_NODE,
    TAG_DIAGNOSTIC,
    TAG_DATE,
    TAG_REGEXP,
    TAG_CIRCULAR,
];

// =============================================================================
// FLAT FORMAT
// =============================================================================

/// Discriminant key of flat-format tagged objects.
pub const FLAT_TYPE_KEY: &str = "_type";

/// Payload key of flat-format tagged objects.
pub const FLAT_VALUE_KEY: &str = "value";

/// Replaces any composite the flat encoder has already written.
pub const CIRCULAR_SENTINEL: &str = "[Circular]";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_distinct() {
        for (i, a) in RESERVED_TAGS.iter().enumerate() {
            for b in &RESERVED_TAGS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn format_version_is_one() {
        assert_eq!(FORMAT_VERSION, 1);
    }
}
