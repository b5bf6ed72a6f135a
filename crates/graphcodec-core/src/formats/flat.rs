//! # Flat Format
//!
//! Plain JSON with inline tags for three container kinds:
//!
//! ```text
//! {"_type": "Date", "value": "2024-01-01T00:00:00.000Z"}
//! {"_type": "Map",  "value": [[key, value], ...]}
//! {"_type": "Set",  "value": [member, ...]}
//! ```
//!
//! There is no identity table. The encoder keeps a visited set and writes
//! the string `"[Circular]"` the second time it meets any composite, whether
//! the revisit is a cycle or plain sharing. The decoder cannot invert that.
//!
//! Patterns, text ranges, range collections, parse nodes and diagnostics
//! have no tag here; they are written as plain objects of their summary
//! fields and come back as records.

use super::{check_size, number_to_json, render, Codec, CodecOptions, Decoded};
use crate::primitives::{CIRCULAR_SENTINEL, FLAT_TYPE_KEY, FLAT_VALUE_KEY};
use crate::{
    CodecError, MapEntries, Object, ObjectGraph, ObjectId, Record, SetMembers, Timestamp, Value,
};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeSet;

const TYPE_DATE: &str = "Date";
const TYPE_MAP: &str = "Map";
const TYPE_SET: &str = "Set";

// =============================================================================
// CODEC
// =============================================================================

/// The lossy, identity-free codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatCodec {
    options: CodecOptions,
}

impl FlatCodec {
    #[must_use]
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

impl Codec for FlatCodec {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn supports_cycles(&self) -> bool {
        false
    }

    fn encode_text(&self, graph: &ObjectGraph, root: &Value) -> Result<String, CodecError> {
        render(&encode(graph, root), self.options)
    }

    fn decode_text(&self, text: &str) -> Result<Decoded, CodecError> {
        decode(text)
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Encode `root` to a flat JSON tree.
#[must_use]
pub fn encode(graph: &ObjectGraph, root: &Value) -> Json {
    let mut encoder = Encoder {
        graph,
        visited: BTreeSet::new(),
    };
    encoder.value(root).unwrap_or(Json::Null)
}

/// Parse flat JSON text and rebuild the three tagged container kinds.
pub fn decode(text: &str) -> Result<Decoded, CodecError> {
    check_size(text)?;
    let raw: Json = serde_json::from_str(text)?;
    let mut graph = ObjectGraph::new();
    let root = build(&mut graph, &raw);
    Ok(Decoded { graph, root })
}

// =============================================================================
// ENCODER
// =============================================================================

struct Encoder<'g> {
    graph: &'g ObjectGraph,
    visited: BTreeSet<ObjectId>,
}

impl Encoder<'_> {
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

    fn element(&mut self, value: &Value) -> Json {
        self.value(value).unwrap_or(Json::Null)
    }

    fn reference(&mut self, id: ObjectId) -> Json {
        if !self.visited.insert(id) {
            return Json::String(CIRCULAR_SENTINEL.to_string());
        }
        let graph = self.graph;
        match graph.get(id) {
            Some(object) => self.object(object),
            None => Json::Null,
        }
    }

    fn object(&mut self, object: &Object) -> Json {
        match object {
            Object::Timestamp(ts) => typed(TYPE_DATE, Json::String(ts.to_iso())),
            Object::Map(map) => {
                let entries = map
                    .iter()
                    .map(|(k, v)| Json::Array(vec![self.element(k), self.element(v)]))
                    .collect();
                typed(TYPE_MAP, Json::Array(entries))
            }
            Object::Set(set) => {
                let members = set.iter().map(|m| self.element(m)).collect();
                typed(TYPE_SET, Json::Array(members))
            }
            Object::Pattern(p) => json!({ "source": p.source, "flags": p.flags }),
            Object::TextRange(r) => json!({ "start": r.start, "length": r.length }),
            Object::RangeCollection(rc) => {
                let items: Vec<Json> = rc.items.iter().map(|i| self.element(i)).collect();
                json!({ "items": items, "count": rc.count })
            }
            Object::ParseNode(n) => json!({
                "nodeType": n.node_type,
                "id": n.id,
                "start": n.start,
                "length": n.length,
            }),
            Object::Diagnostic(d) => {
                let mut out = Map::new();
                out.insert("category".to_string(), Json::from(d.category));
                out.insert("message".to_string(), Json::String(d.message.clone()));
                if let Some(range) = self.value(&d.range) {
                    out.insert("range".to_string(), range);
                }
                Json::Object(out)
            }
            Object::Sequence(items) => Json::Array(items.iter().map(|i| self.element(i)).collect()),
            Object::Record(record) => {
                let mut out = Map::new();
                for (key, property) in record.iter() {
                    if let Ok(value) = property.read() {
                        if let Some(encoded) = self.value(&value) {
                            out.insert(key.clone(), encoded);
                        }
                    }
                }
                Json::Object(out)
            }
        }
    }
}

fn typed(kind: &str, value: Json) -> Json {
    let mut map = Map::new();
    map.insert(FLAT_TYPE_KEY.to_string(), Json::String(kind.to_string()));
    map.insert(FLAT_VALUE_KEY.to_string(), value);
    Json::Object(map)
}

// =============================================================================
// DECODER
// =============================================================================

fn build(graph: &mut ObjectGraph, json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => {
            let values = items.iter().map(|i| build(graph, i)).collect();
            graph.insert(Object::Sequence(values))
        }
        Json::Object(map) => match typed_object(graph, map) {
            Some(object) => graph.insert(object),
            None => {
                let mut record = Record::new();
                for (key, value) in map {
                    record.set(key.clone(), build(graph, value));
                }
                graph.insert(Object::Record(record))
            }
        },
    }
}

/// Rebuild a `_type`-tagged object. `None` when the shape does not fit, in
/// which case the object is kept as a plain record.
fn typed_object(graph: &mut ObjectGraph, map: &Map<String, Json>) -> Option<Object> {
    let kind = map.get(FLAT_TYPE_KEY)?.as_str()?;
    let value = map.get(FLAT_VALUE_KEY)?;
    match kind {
        TYPE_DATE => Timestamp::parse_iso(value.as_str()?).map(Object::Timestamp),
        TYPE_MAP => {
            let entries = value.as_array()?;
            let pairs = entries
                .iter()
                .map(|e| match e.as_array().map(Vec::as_slice) {
                    Some([k, v]) => Some((k, v)),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;
            let mut out = MapEntries::new();
            for (k, v) in pairs {
                let key = build(graph, k);
                let value = build(graph, v);
                out.insert(key, value);
            }
            Some(Object::Map(out))
        }
        TYPE_SET => {
            let members = value.as_array()?;
            let mut out = SetMembers::new();
            for m in members {
                out.insert(build(graph, m));
            }
            Some(Object::Set(out))
        }
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{structurally_equal, Pattern, TextRange};

    #[test]
    fn self_reference_degrades_to_sentinel() {
        let mut graph = ObjectGraph::new();
        let id = graph.alloc(Object::Record(Record::new()));
        if let Some(Object::Record(r)) = graph.get_mut(id) {
            r.set("self", id);
        }

        let out = encode(&graph, &Value::Ref(id));
        assert_eq!(out, json!({ "self": "[Circular]" }));
    }

    #[test]
    fn sharing_also_degrades() {
        let mut graph = ObjectGraph::new();
        let shared = graph.insert(Object::Record(Record::new().with("x", 1.0)));
        let root = graph.insert(Object::Record(
            Record::new().with("a", shared.clone()).with("b", shared),
        ));

        assert_eq!(
            encode(&graph, &root),
            json!({ "a": { "x": 1 }, "b": "[Circular]" })
        );
    }

    #[test]
    fn tagged_containers_roundtrip() {
        let mut graph = ObjectGraph::new();
        let date = graph.insert(Object::Timestamp(Timestamp::from_millis(86_400_000)));
        let mut set = SetMembers::new();
        set.insert(1.0.into());
        set.insert("two".into());
        let set = graph.insert(Object::Set(set));
        let mut map = MapEntries::new();
        map.insert("when".into(), date);
        map.insert("which".into(), set);
        let root = graph.insert(Object::Map(map));

        let text = FlatCodec::default().encode_text(&graph, &root).expect("encode");
        assert!(text.contains(r#""_type":"Date","value":"1970-01-02T00:00:00.000Z""#));

        let decoded = decode(&text).expect("decode");
        assert!(structurally_equal(
            (&graph, &root),
            (&decoded.graph, &decoded.root)
        ));
    }

    #[test]
    fn untagged_kinds_become_records() {
        let mut graph = ObjectGraph::new();
        let range = graph.insert(Object::TextRange(TextRange::new(3, 4)));
        let pattern = graph.insert(Object::Pattern(Pattern::new("x", "g")));
        let root = graph.insert(Object::Sequence(vec![range, pattern]));

        let out = encode(&graph, &root);
        assert_eq!(
            out,
            json!([{ "start": 3, "length": 4 }, { "source": "x", "flags": "g" }])
        );

        let decoded = decode(&out.to_string()).expect("decode");
        let Some(Object::Sequence(items)) = decoded.graph.resolve(&decoded.root) else {
            unreachable!("root must decode to a sequence");
        };
        assert!(items
            .iter()
            .all(|i| matches!(decoded.graph.resolve(i), Some(Object::Record(_)))));
    }

    #[test]
    fn unknown_type_passes_through() {
        let decoded = decode(r#"{"_type":"Widget","value":1}"#).expect("decode");
        assert!(matches!(
            decoded.graph.resolve(&decoded.root),
            Some(Object::Record(r)) if r.len() == 2
        ));
    }

    #[test]
    fn bad_date_payload_stays_record() {
        let decoded = decode(r#"{"_type":"Date","value":"soon"}"#).expect("decode");
        assert!(matches!(
            decoded.graph.resolve(&decoded.root),
            Some(Object::Record(_))
        ));
    }

    #[test]
    fn sentinel_is_not_inverted() {
        let decoded = decode(r#"{"self":"[Circular]"}"#).expect("decode");
        let Some(Object::Record(r)) = decoded.graph.resolve(&decoded.root) else {
            unreachable!("root must decode to a record");
        };
        assert_eq!(
            r.get("self").and_then(|p| p.read().ok()),
            Some(Value::string(CIRCULAR_SENTINEL))
        );
    }

    #[test]
    fn malformed_text_is_parse_error() {
        assert!(matches!(decode("{"), Err(CodecError::Parse(_))));
    }
}
