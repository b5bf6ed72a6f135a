//! # Structural Format
//!
//! Versioned, identity-preserving text documents:
//!
//! ```text
//! { "version": 1, "data": <encoded-tree>, "refs": [] }
//! ```
//!
//! ## Encoding
//!
//! Depth-first, pre-order. Every composite is assigned the next integer
//! identity the first time it is reached; a later visit to the same
//! `ObjectId` writes `{"__Circular__": <identity>}` instead of descending.
//! Composites other than sequences and records are written as single-key
//! objects whose key is a reserved tag (see `primitives::RESERVED_TAGS`).
//!
//! ## Decoding
//!
//! Two passes over the parsed tree. The first reserves an arena slot for
//! every composite node in the same pre-order the encoder assigned
//! identities, so slot `n` is identity `n`. The second fills the slots.
//! A circular marker resolves to its slot whether the target appears before
//! or after it in the text.
//!
//! ## Limitation
//!
//! A real record with exactly one key equal to a reserved tag is read back
//! as a tagged node. The tagged payload reserves identities differently from
//! the record it replaced, so every later identity shifts: markers after the
//! collision may fail to resolve or point at the wrong object. Records with
//! any other number of keys are never treated as tagged.

use super::{check_size, number_to_json, Codec, CodecOptions, Decoded};
use crate::primitives::{
    FORMAT_VERSION, TAG_CIRCULAR, TAG_DATE, TAG_DIAGNOSTIC, TAG_MAP, TAG_PARSE_NODE,
    TAG_RANGE_COLLECTION, TAG_REGEXP, TAG_SET, TAG_TEXT_RANGE,
};
use crate::{
    CodecError, Diagnostic, MapEntries, Object, ObjectGraph, ObjectId, ParseNode, Pattern,
    RangeCollection, Record, SetMembers, TextRange, Timestamp, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;

// =============================================================================
// DOCUMENT
// =============================================================================

/// A structural document: format version, encoded tree, reference table.
///
/// `refs` is always written empty. Identities are implied by pre-order
/// position, so decoding never needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: u64,
    pub data: Json,
    #[serde(default)]
    pub refs: Vec<Json>,
}

impl Document {
    /// Wrap an encoded tree in a current-version document.
    #[must_use]
    pub fn new(data: Json) -> Self {
        Self {
            version: FORMAT_VERSION,
            data,
            refs: Vec::new(),
        }
    }

    /// Validate the format version.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.version != FORMAT_VERSION {
            return Err(CodecError::Format(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Build a document from parsed JSON, checking the version first.
    pub fn from_json(raw: Json) -> Result<Self, CodecError> {
        let Json::Object(mut fields) = raw else {
            return Err(CodecError::Format(
                "Document is not a JSON object".to_string(),
            ));
        };

        let version = match fields.get("version") {
            None => {
                return Err(CodecError::Format(
                    "Missing version field".to_string(),
                ))
            }
            Some(v) => v.as_u64().filter(|n| *n == FORMAT_VERSION).ok_or_else(|| {
                CodecError::Format(format!(
                    "Unsupported version: {} (expected {})",
                    v, FORMAT_VERSION
                ))
            })?,
        };

        let data = fields.remove("data").unwrap_or(Json::Null);
        let refs = match fields.remove("refs") {
            Some(Json::Array(refs)) => refs,
            _ => Vec::new(),
        };

        Ok(Self {
            version,
            data,
            refs,
        })
    }

    /// Render compactly.
    pub fn to_text(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Serialization(e.to_string()))
    }

    /// Render with indentation.
    pub fn to_text_pretty(&self) -> Result<String, CodecError> {
        serde_json::to_string_pretty(self).map_err(|e| CodecError::Serialization(e.to_string()))
    }
}

// =============================================================================
// PUBLIC OPERATIONS
// =============================================================================

/// Encode `root` and everything reachable from it.
///
/// Never fails. Properties whose accessor fails are dropped from their
/// record; references to ids the graph does not hold are written as `null`.
#[must_use]
pub fn encode(graph: &ObjectGraph, root: &Value) -> Document {
    let mut encoder = Encoder {
        graph,
        identities: BTreeMap::new(),
    };
    let data = encoder.value(root).unwrap_or(Json::Null);
    tracing::trace!(identities = encoder.identities.len(), "encoded structural document");
    Document::new(data)
}

/// Encode and render compactly.
pub fn encode_to_string(graph: &ObjectGraph, root: &Value) -> Result<String, CodecError> {
    encode(graph, root).to_text()
}

/// Parse and decode a structural document.
///
/// # Errors
///
/// - `TooLarge` if the text exceeds `MAX_DOCUMENT_SIZE`
/// - `Parse` if the text is not JSON
/// - `Format` if `version` is missing or unsupported
/// - `MalformedNode` / `UnresolvedReference` for inconsistent trees
pub fn decode(text: &str) -> Result<Decoded, CodecError> {
    check_size(text)?;
    let raw: Json = serde_json::from_str(text)?;
    let document = Document::from_json(raw)?;
    let decoded = decode_document(&document)?;
    tracing::debug!(
        bytes = text.len(),
        objects = decoded.graph.len(),
        "decoded structural document"
    );
    Ok(decoded)
}

/// Decode an already-parsed document.
pub fn decode_document(document: &Document) -> Result<Decoded, CodecError> {
    document.validate()?;

    let mut decoder = Decoder::default();
    decoder.reserve(&document.data);
    let root = decoder.build(&document.data)?;

    Ok(Decoded {
        graph: decoder.graph,
        root,
    })
}

// =============================================================================
// CODEC
// =============================================================================

/// The identity-preserving codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralCodec {
    options: CodecOptions,
}

impl StructuralCodec {
    #[must_use]
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

impl Codec for StructuralCodec {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn supports_cycles(&self) -> bool {
        true
    }

    fn encode_text(&self, graph: &ObjectGraph, root: &Value) -> Result<String, CodecError> {
        let document = encode(graph, root);
        if self.options.pretty {
            document.to_text_pretty()
        } else {
            document.to_text()
        }
    }

    fn decode_text(&self, text: &str) -> Result<Decoded, CodecError> {
        decode(text)
    }
}

// =============================================================================
// ENCODER
// =============================================================================

struct Encoder<'g> {
    graph: &'g ObjectGraph,
    /// ObjectId -> identity, assigned in visit order.
    identities: BTreeMap<ObjectId, u64>,
}

impl Encoder<'_> {
    /// `None` means absence.
    fn value(&mut self, value: &Value) -> Option<Json> {
        match value {
            Value::Undefined | Value::Function(_) => None,
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(Json::Bool(*b)),
            Value::Number(n) => Some(number_to_json(*n)),
            Value::String(s) => Some(Json::String(s.clone())),
            Value::Ref(id) => Some(self.reference(*id)),
        }
    }

    /// Absence inside a list position is written as `null`.
    fn element(&mut self, value: &Value) -> Json {
        self.value(value).unwrap_or(Json::Null)
    }

    fn reference(&mut self, id: ObjectId) -> Json {
        if let Some(identity) = self.identities.get(&id) {
            return tagged(TAG_CIRCULAR, Json::from(*identity));
        }
        let graph = self.graph;
        let Some(object) = graph.get(id) else {
            tracing::warn!(?id, "dangling reference encoded as null");
            return Json::Null;
        };
        let identity = self.identities.len() as u64;
        self.identities.insert(id, identity);
        self.object(object)
    }

    fn object(&mut self, object: &Object) -> Json {
        match object {
            Object::Timestamp(ts) => tagged(TAG_DATE, Json::String(ts.to_iso())),
            Object::Pattern(p) => tagged(
                TAG_REGEXP,
                json!({ "source": p.source, "flags": p.flags }),
            ),
            Object::Map(map) => {
                let entries = map
                    .iter()
                    .map(|(k, v)| Json::Array(vec![self.element(k), self.element(v)]))
                    .collect();
                tagged(TAG_MAP, Json::Array(entries))
            }
            Object::Set(set) => {
                let members = set.iter().map(|m| self.element(m)).collect();
                tagged(TAG_SET, Json::Array(members))
            }
            Object::TextRange(r) => tagged(
                TAG_TEXT_RANGE,
                json!({ "start": r.start, "length": r.length }),
            ),
            Object::RangeCollection(rc) => {
                let items: Vec<Json> = rc.items.iter().map(|i| self.element(i)).collect();
                tagged(
                    TAG_RANGE_COLLECTION,
                    json!({ "items": items, "count": rc.count }),
                )
            }
            Object::ParseNode(n) => tagged(
                TAG_PARSE_NODE,
                json!({
                    "nodeType": n.node_type,
                    "id": n.id,
                    "start": n.start,
                    "length": n.length,
                }),
            ),
            Object::Diagnostic(d) => {
                let mut payload = Map::new();
                payload.insert("category".to_string(), Json::from(d.category));
                payload.insert("message".to_string(), Json::String(d.message.clone()));
                if let Some(range) = self.value(&d.range) {
                    payload.insert("range".to_string(), range);
                }
                tagged(TAG_DIAGNOSTIC, Json::Object(payload))
            }
            Object::Sequence(items) => Json::Array(items.iter().map(|i| self.element(i)).collect()),
            Object::Record(record) => {
                let mut out = Map::new();
                for (key, property) in record.iter() {
                    match property.read() {
                        Ok(value) => {
                            if let Some(encoded) = self.value(&value) {
                                out.insert(key.clone(), encoded);
                            }
                        }
                        Err(e) => {
                            tracing::debug!(key = %key, error = %e, "dropping unreadable property");
                        }
                    }
                }
                Json::Object(out)
            }
        }
    }
}

fn tagged(tag: &str, payload: Json) -> Json {
    let mut map = Map::new();
    map.insert(tag.to_string(), payload);
    Json::Object(map)
}

// =============================================================================
// NODE CLASSIFICATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Map,
    Set,
    TextRange,
    RangeCollection,
    ParseNode,
    Diagnostic,
    Date,
    RegExp,
    Circular,
}

impl Tag {
    fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            TAG_MAP => Self::Map,
            TAG_SET => Self::Set,
            TAG_TEXT_RANGE => Self::TextRange,
            TAG_RANGE_COLLECTION => Self::RangeCollection,
            TAG_PARSE_NODE => Self::ParseNode,
            TAG_DIAGNOSTIC => Self::Diagnostic,
            TAG_DATE => Self::Date,
            TAG_REGEXP => Self::RegExp,
            TAG_CIRCULAR => Self::Circular,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Map => TAG_MAP,
            Self::Set => TAG_SET,
            Self::TextRange => TAG_TEXT_RANGE,
            Self::RangeCollection => TAG_RANGE_COLLECTION,
            Self::ParseNode => TAG_PARSE_NODE,
            Self::Diagnostic => TAG_DIAGNOSTIC,
            Self::Date => TAG_DATE,
            Self::RegExp => TAG_REGEXP,
            Self::Circular => TAG_CIRCULAR,
        }
    }
}

/// How a JSON node is interpreted.
enum Node<'a> {
    Scalar(&'a Json),
    Tagged(Tag, &'a Json),
    Sequence(&'a [Json]),
    Record(&'a Map<String, Json>),
}

fn classify(json: &Json) -> Node<'_> {
    match json {
        Json::Array(items) => Node::Sequence(items),
        Json::Object(map) => {
            if map.len() == 1 {
                if let Some((key, payload)) = map.iter().next() {
                    if let Some(tag) = Tag::from_key(key) {
                        return Node::Tagged(tag, payload);
                    }
                }
            }
            Node::Record(map)
        }
        _ => Node::Scalar(json),
    }
}

/// Encoded children of a tagged payload, in encoding order.
///
/// Malformed payloads yield no children; the fill pass reports them.
fn tagged_children(tag: Tag, payload: &Json) -> Vec<&Json> {
    match tag {
        Tag::Map => payload
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Json::as_array)
                    .flat_map(|pair| pair.iter())
                    .collect()
            })
            .unwrap_or_default(),
        Tag::Set => payload
            .as_array()
            .map(|members| members.iter().collect())
            .unwrap_or_default(),
        Tag::RangeCollection => payload
            .get("items")
            .and_then(Json::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        Tag::Diagnostic => payload.get("range").into_iter().collect(),
        Tag::TextRange | Tag::ParseNode | Tag::Date | Tag::RegExp | Tag::Circular => Vec::new(),
    }
}

// =============================================================================
// DECODER
// =============================================================================

#[derive(Default)]
struct Decoder {
    graph: ObjectGraph,
    /// identity -> arena slot.
    slots: Vec<ObjectId>,
    /// Next identity the fill pass will claim.
    cursor: usize,
}

impl Decoder {
    /// First pass: one placeholder per composite node, in pre-order.
    fn reserve(&mut self, json: &Json) {
        match classify(json) {
            Node::Scalar(_) | Node::Tagged(Tag::Circular, _) => {}
            Node::Tagged(tag, payload) => {
                self.reserve_slot();
                for child in tagged_children(tag, payload) {
                    self.reserve(child);
                }
            }
            Node::Sequence(items) => {
                self.reserve_slot();
                for item in items {
                    self.reserve(item);
                }
            }
            Node::Record(map) => {
                self.reserve_slot();
                for value in map.values() {
                    self.reserve(value);
                }
            }
        }
    }

    fn reserve_slot(&mut self) {
        let id = self.graph.alloc(Object::Record(Record::new()));
        self.slots.push(id);
    }

    /// Claim the slot for the composite about to be built.
    fn claim(&mut self) -> Result<ObjectId, CodecError> {
        let id = self.slots.get(self.cursor).copied().ok_or_else(|| {
            CodecError::Format("Identity table out of sync with document".to_string())
        })?;
        self.cursor += 1;
        Ok(id)
    }

    fn fill(&mut self, id: ObjectId, object: Object) -> Value {
        self.graph.replace(id, object);
        Value::Ref(id)
    }

    /// Second pass: build values, filling reserved slots.
    fn build(&mut self, json: &Json) -> Result<Value, CodecError> {
        match classify(json) {
            Node::Scalar(scalar) => Ok(scalar_value(scalar)),
            Node::Tagged(Tag::Circular, payload) => self.circular(payload),
            Node::Tagged(tag, payload) => {
                let id = self.claim()?;
                let object = self.tagged(tag, payload)?;
                Ok(self.fill(id, object))
            }
            Node::Sequence(items) => {
                let id = self.claim()?;
                let values = items
                    .iter()
                    .map(|item| self.build(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.fill(id, Object::Sequence(values)))
            }
            Node::Record(map) => {
                let id = self.claim()?;
                let mut record = Record::new();
                for (key, value) in map {
                    record.set(key.clone(), self.build(value)?);
                }
                Ok(self.fill(id, Object::Record(record)))
            }
        }
    }

    fn circular(&self, payload: &Json) -> Result<Value, CodecError> {
        let identity = payload
            .as_u64()
            .ok_or_else(|| malformed(Tag::Circular, "identity is not an unsigned integer"))?;
        let slot = usize::try_from(identity)
            .ok()
            .and_then(|i| self.slots.get(i))
            .ok_or(CodecError::UnresolvedReference(identity))?;
        tracing::trace!(identity, "resolved circular marker");
        Ok(Value::Ref(*slot))
    }

    fn tagged(&mut self, tag: Tag, payload: &Json) -> Result<Object, CodecError> {
        match tag {
            Tag::Date => {
                let text = payload
                    .as_str()
                    .ok_or_else(|| malformed(tag, "payload is not a string"))?;
                let ts = Timestamp::parse_iso(text)
                    .ok_or_else(|| malformed(tag, format!("invalid ISO-8601 date '{text}'")))?;
                Ok(Object::Timestamp(ts))
            }
            Tag::RegExp => Ok(Object::Pattern(Pattern::new(
                field_str(tag, payload, "source")?,
                field_str(tag, payload, "flags")?,
            ))),
            Tag::Map => {
                let entries = payload
                    .as_array()
                    .ok_or_else(|| malformed(tag, "payload is not an array"))?;
                let mut map = MapEntries::new();
                for entry in entries {
                    let (key, value) = match entry.as_array().map(Vec::as_slice) {
                        Some([k, v]) => (k, v),
                        _ => return Err(malformed(tag, "entry is not a [key, value] pair")),
                    };
                    let key = self.build(key)?;
                    let value = self.build(value)?;
                    map.insert(key, value);
                }
                Ok(Object::Map(map))
            }
            Tag::Set => {
                let members = payload
                    .as_array()
                    .ok_or_else(|| malformed(tag, "payload is not an array"))?;
                let mut set = SetMembers::new();
                for member in members {
                    set.insert(self.build(member)?);
                }
                Ok(Object::Set(set))
            }
            Tag::TextRange => Ok(Object::TextRange(TextRange::new(
                field_u64(tag, payload, "start")?,
                field_u64(tag, payload, "length")?,
            ))),
            Tag::RangeCollection => {
                let items = payload
                    .get("items")
                    .and_then(Json::as_array)
                    .ok_or_else(|| malformed(tag, "missing items array"))?
                    .iter()
                    .map(|item| self.build(item))
                    .collect::<Result<Vec<_>, _>>()?;
                let count = field_u64(tag, payload, "count")?;
                Ok(Object::RangeCollection(RangeCollection { items, count }))
            }
            Tag::ParseNode => Ok(Object::ParseNode(ParseNode::new(
                field_u32(tag, payload, "nodeType")?,
                field_u64(tag, payload, "id")?,
                field_u64(tag, payload, "start")?,
                field_u64(tag, payload, "length")?,
            ))),
            Tag::Diagnostic => {
                let category = field_u32(tag, payload, "category")?;
                let message = field_str(tag, payload, "message")?;
                let range = match payload.get("range") {
                    Some(range) => self.build(range)?,
                    None => Value::Undefined,
                };
                Ok(Object::Diagnostic(Diagnostic::new(category, message, range)))
            }
            Tag::Circular => Err(malformed(tag, "marker used as a composite")),
        }
    }
}

fn scalar_value(json: &Json) -> Value {
    match json {
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        Json::String(s) => Value::String(s.clone()),
        _ => Value::Null,
    }
}

fn malformed(tag: Tag, reason: impl Into<String>) -> CodecError {
    CodecError::MalformedNode {
        tag: tag.as_str(),
        reason: reason.into(),
    }
}

fn field_u64(tag: Tag, payload: &Json, key: &str) -> Result<u64, CodecError> {
    payload
        .get(key)
        .and_then(Json::as_u64)
        .ok_or_else(|| malformed(tag, format!("'{key}' is not an unsigned integer")))
}

fn field_u32(tag: Tag, payload: &Json, key: &str) -> Result<u32, CodecError> {
    let n = field_u64(tag, payload, key)?;
    u32::try_from(n).map_err(|_| malformed(tag, format!("'{key}' out of range: {n}")))
}

fn field_str(tag: Tag, payload: &Json, key: &str) -> Result<String, CodecError> {
    payload
        .get(key)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(tag, format!("'{key}' is not a string")))
}

// =============================================================================
// TESTS
// =============================================================================
