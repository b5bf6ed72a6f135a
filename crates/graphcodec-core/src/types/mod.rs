//! # Core Type Definitions
//!
//! This module contains the value model shared by both codecs:
//! - Scalar and reference values (`Value`, `ObjectId`)
//! - Composite value kinds (`Object` and its payload types)
//! - Record properties, including fallible accessors (`Property`, `Accessor`)
//! - Error types (`CodecError`, `AccessError`)
//!
//! ## Identity
//!
//! Composite values live in an [`ObjectGraph`](crate::ObjectGraph) arena.
//! Two `Value::Ref`s holding the same `ObjectId` are the *same* value; this
//! is how shared and cyclic structure is expressed.

mod timestamp;

pub use timestamp::Timestamp;

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Index of a composite value inside an `ObjectGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

// =============================================================================
// VALUE
// =============================================================================

/// A value as seen by the codecs.
///
/// Scalars are stored inline; composites are referenced by `ObjectId`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absence. Dropped from records, written as `null` elsewhere.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A callable value. Never encoded; only its name is kept in memory.
    Function(String),
    /// A composite value stored in the graph.
    Ref(ObjectId),
}

impl Value {
    /// Create a string value.
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Returns the referenced object id, if this is a composite.
    #[must_use]
    pub fn as_ref_id(&self) -> Option<ObjectId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// True for `Undefined` and `Function`, the values that encode to absence.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Undefined | Self::Function(_))
    }

    /// SameValueZero equality, used for map keys and set members.
    ///
    /// `NaN` equals `NaN`, `+0` equals `-0`, references compare by identity.
    #[must_use]
    pub fn same_value_zero(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self == other,
        }
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Self::Ref(id)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

// =============================================================================
// RECORD PROPERTIES
// =============================================================================

/// Failure raised by a computed property.
#[derive(Debug, Clone, Error)]
#[error("property access failed: {0}")]
pub struct AccessError(pub String);

type AccessorFn = dyn Fn() -> Result<Value, AccessError> + Send + Sync;

/// A computed record property that may fail when read.
#[derive(Clone)]
pub struct Accessor(Arc<AccessorFn>);

impl Accessor {
    /// Wrap a closure as an accessor.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value, AccessError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Read the property.
    pub fn read(&self) -> Result<Value, AccessError> {
        (self.0)()
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor(..)")
    }
}

/// One slot of a record.
#[derive(Debug, Clone)]
pub enum Property {
    Value(Value),
    Accessor(Accessor),
}

impl Property {
    /// Resolve the slot to a value.
    pub fn read(&self) -> Result<Value, AccessError> {
        match self {
            Self::Value(v) => Ok(v.clone()),
            Self::Accessor(a) => a.read(),
        }
    }
}

/// A plain composite: own string keys in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Record {
    properties: IndexMap<String, Property>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a stored property. Existing keys keep their position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties
            .insert(key.into(), Property::Value(value.into()));
    }

    /// Set a computed property.
    pub fn set_accessor(&mut self, key: impl Into<String>, accessor: Accessor) {
        self.properties
            .insert(key.into(), Property::Accessor(accessor));
    }

    /// Builder form of [`Record::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up a slot by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Iterate own properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Property)> {
        self.properties.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

// =============================================================================
// CONTAINERS
// =============================================================================

/// Key-unique, insertion-ordered associative mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapEntries {
    entries: Vec<(Value, Value)>,
}

impl MapEntries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An overwritten key keeps its original position.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.same_value_zero(key))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unique-element set in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetMembers {
    members: Vec<Value>,
}

impl SetMembers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Returns `false` if an equal member was already present.
    pub fn insert(&mut self, value: Value) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.members.push(value);
        true
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.members.iter().any(|m| m.same_value_zero(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.members.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// =============================================================================
// DOMAIN KINDS
// =============================================================================

/// A regular-expression object: source text plus flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: String,
    pub flags: String,
}

impl Pattern {
    #[must_use]
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }
}

/// A `(start, length)` span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: u64,
    pub length: u64,
}

impl TextRange {
    #[must_use]
    pub const fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }
}

/// An indexable, countable sequence of text ranges.
///
/// `items` normally holds references to `Object::TextRange` values.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCollection {
    pub items: Vec<Value>,
    pub count: u64,
}

impl RangeCollection {
    /// Build a collection whose count matches its items.
    #[must_use]
    pub fn from_items(items: Vec<Value>) -> Self {
        let count = items.len() as u64;
        Self { items, count }
    }
}

/// Summary of a parse tree node.
///
/// Only `node_type`, `id`, `start` and `length` survive encoding; `detail`
/// (parent, children, anything else) is never written.
#[derive(Debug, Clone, Default)]
pub struct ParseNode {
    pub node_type: u32,
    pub id: u64,
    pub start: u64,
    pub length: u64,
    pub detail: IndexMap<String, Value>,
}

impl ParseNode {
    #[must_use]
    pub fn new(node_type: u32, id: u64, start: u64, length: u64) -> Self {
        Self {
            node_type,
            id,
            start,
            length,
            detail: IndexMap::new(),
        }
    }
}

/// A diagnostic message attached to a range.
///
/// Only `category`, `message` and `range` survive encoding.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub category: u32,
    pub message: String,
    pub range: Value,
    pub detail: IndexMap<String, Value>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(category: u32, message: impl Into<String>, range: Value) -> Self {
        Self {
            category,
            message: message.into(),
            range,
            detail: IndexMap::new(),
        }
    }
}

// =============================================================================
// OBJECT
// =============================================================================

/// A composite value. One variant per recognized kind.
#[derive(Debug, Clone)]
pub enum Object {
    Timestamp(Timestamp),
    Pattern(Pattern),
    Map(MapEntries),
    Set(SetMembers),
    TextRange(TextRange),
    RangeCollection(RangeCollection),
    ParseNode(ParseNode),
    Diagnostic(Diagnostic),
    Sequence(Vec<Value>),
    Record(Record),
}

impl Object {
    /// The kind discriminant of this object.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Timestamp(_) => ObjectKind::Timestamp,
            Self::Pattern(_) => ObjectKind::Pattern,
            Self::Map(_) => ObjectKind::Map,
            Self::Set(_) => ObjectKind::Set,
            Self::TextRange(_) => ObjectKind::TextRange,
            Self::RangeCollection(_) => ObjectKind::RangeCollection,
            Self::ParseNode(_) => ObjectKind::ParseNode,
            Self::Diagnostic(_) => ObjectKind::Diagnostic,
            Self::Sequence(_) => ObjectKind::Sequence,
            Self::Record(_) => ObjectKind::Record,
        }
    }
}

/// Discriminant of `Object`, ordered by encode dispatch priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Timestamp,
    Pattern,
    Map,
    Set,
    TextRange,
    RangeCollection,
    ParseNode,
    Diagnostic,
    Sequence,
    Record,
}

impl ObjectKind {
    /// Every kind, in dispatch order.
    pub const ALL: [ObjectKind; 10] = [
        Self::Timestamp,
        Self::Pattern,
        Self::Map,
        Self::Set,
        Self::TextRange,
        Self::RangeCollection,
        Self::ParseNode,
        Self::Diagnostic,
        Self::Sequence,
        Self::Record,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Pattern => "pattern",
            Self::Map => "map",
            Self::Set => "set",
            Self::TextRange => "text_range",
            Self::RangeCollection => "range_collection",
            Self::ParseNode => "parse_node",
            Self::Diagnostic => "diagnostic",
            Self::Sequence => "sequence",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the codecs.
///
/// Property-level failures during encode never show up here; they are
/// recovered by dropping the key.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The document is not in the supported format.
    #[error("Unsupported cache format: {0}")]
    Format(String),

    /// The raw text is not well-formed JSON.
    #[error("failed to deserialize cache: {0}")]
    Parse(#[from] serde_json::Error),

    /// The input exceeds the size limit.
    #[error("Document size {size} bytes exceeds maximum allowed {max} bytes")]
    TooLarge { size: usize, max: usize },

    /// A tagged node carries a payload of the wrong shape.
    #[error("Malformed {tag} node: {reason}")]
    MalformedNode { tag: &'static str, reason: String },

    /// A circular marker names an identity no node carries.
    #[error("Unresolved circular reference: {0}")]
    UnresolvedReference(u64),

    /// Rendering the document as text failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_zero_nan_and_signed_zero() {
        assert!(Value::Number(f64::NAN).same_value_zero(&Value::Number(f64::NAN)));
        assert!(Value::Number(0.0).same_value_zero(&Value::Number(-0.0)));
        assert!(!Value::Null.same_value_zero(&Value::Undefined));
        assert!(!Value::Ref(ObjectId(1)).same_value_zero(&Value::Ref(ObjectId(2))));
    }

    #[test]
    fn map_overwrite_keeps_position() {
        let mut map = MapEntries::new();
        map.insert("a".into(), 1.0.into());
        map.insert("b".into(), 2.0.into());
        map.insert("a".into(), 3.0.into());

        let keys: Vec<_> = map.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![Value::string("a"), Value::string("b")]);
        assert_eq!(map.get(&"a".into()), Some(&Value::Number(3.0)));
    }

    #[test]
    fn set_rejects_duplicates() {
        let mut set = SetMembers::new();
        assert!(set.insert(1.0.into()));
        assert!(!set.insert(1.0.into()));
        assert!(set.insert(Value::Ref(ObjectId(0))));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn record_overwrite_keeps_order() {
        let mut record = Record::new().with("x", 1.0).with("y", 2.0);
        record.set("x", 5.0);

        let keys: Vec<_> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[test]
    fn failing_accessor_reports_error() {
        let accessor = Accessor::new(|| Err(AccessError("boom".to_string())));
        let prop = Property::Accessor(accessor);
        assert!(prop.read().is_err());
    }

    #[test]
    fn parse_error_message_has_context() {
        let err = serde_json::from_str::<serde_json::Value>("not json")
            .map_err(CodecError::from)
            .expect_err("must fail");
        assert!(err.to_string().starts_with("failed to deserialize cache: "));
    }

    #[test]
    fn kinds_listed_in_dispatch_order() {
        let mut sorted = ObjectKind::ALL;
        sorted.sort();
        assert_eq!(sorted, ObjectKind::ALL);
    }
}
