//! # graphcodec-core
//!
//! Structural codec for in-memory object graphs - THE LOGIC.
//!
//! Converts a rooted, possibly cyclic object graph into a self-describing
//! JSON document and rebuilds an equivalent graph from it. Shared and cyclic
//! structure is preserved through per-call identity assignment; a fixed set
//! of value kinds (timestamps, patterns, maps, sets, text ranges, range
//! collections, parse nodes, diagnostics) is tagged so decoding picks the
//! right reconstruction rule.
//!
//! A secondary flat codec shares the vocabulary but not the identity
//! guarantees: revisited composites become `"[Circular]"`.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no I/O, no async, no process-wide state
//! - Every encode/decode call owns its tables and discards them on return
//! - The source graph is never mutated

// =============================================================================
// MODULES
// =============================================================================

pub mod formats;
pub mod graph;
pub mod primitives;
pub mod types;
pub mod verify;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AccessError, Accessor, CodecError, Diagnostic, MapEntries, Object, ObjectId, ObjectKind,
    ParseNode, Pattern, Property, RangeCollection, Record, SetMembers, TextRange, Timestamp,
    Value,
};

// =============================================================================
// RE-EXPORTS: Graph
// =============================================================================

pub use graph::{structurally_equal, GraphStats, ObjectGraph};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::structural::{decode, decode_document, encode, encode_to_string};
pub use formats::{Codec, CodecOptions, Decoded, Document, FlatCodec, StructuralCodec};

// =============================================================================
// RE-EXPORTS: Verification
// =============================================================================

pub use verify::{verify_document, verify_roundtrip};
