//! # Object Graph
//!
//! The arena holding every composite value reachable from a root.
//!
//! Composites are addressed by `ObjectId` (their index in the arena), so
//! identity, sharing and cycles are plain integer bookkeeping. Both codecs
//! read from an `ObjectGraph` when encoding and build a fresh one when
//! decoding.

use crate::{Object, ObjectId, ObjectKind, Property, Value};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPH
// =============================================================================

/// Arena of composite values.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    objects: Vec<Object>,
}

impl ObjectGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object and return its id.
    pub fn alloc(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u64);
        self.objects.push(object);
        id
    }

    /// Store an object and return a reference value to it.
    pub fn insert(&mut self, object: Object) -> Value {
        Value::Ref(self.alloc(object))
    }

    /// Look up an object.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0 as usize)
    }

    /// Look up an object for modification.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id.0 as usize)
    }

    /// Overwrite the object stored at `id`. Returns `false` if `id` is unknown.
    pub fn replace(&mut self, id: ObjectId, object: Object) -> bool {
        match self.get_mut(id) {
            Some(slot) => {
                *slot = object;
                true
            }
            None => false,
        }
    }

    /// Resolve a value to the object it references.
    #[must_use]
    pub fn resolve(&self, value: &Value) -> Option<&Object> {
        value.as_ref_id().and_then(|id| self.get(id))
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects with their ids, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i as u64), o))
    }

    /// Summarize what an encoder would walk from `root`.
    #[must_use]
    pub fn stats(&self, root: &Value) -> GraphStats {
        let mut stats = GraphStats::default();
        let mut visited = BTreeSet::new();
        let mut stack = vec![root.clone()];

        while let Some(value) = stack.pop() {
            let Value::Ref(id) = value else {
                continue;
            };
            if !visited.insert(id) {
                stats.shared_references += 1;
                continue;
            }
            let Some(object) = self.get(id) else {
                stats.dangling_references += 1;
                continue;
            };
            stats.reachable += 1;
            *stats.by_kind.entry(object.kind()).or_insert(0) += 1;

            let mut children = encoded_children(object);
            children.reverse();
            stack.extend(children);
        }

        stats
    }
}

/// Values an encoder descends into for `object`, in encoding order.
///
/// Parse-node and diagnostic `detail`, and record properties whose accessor
/// fails, are not walked.
fn encoded_children(object: &Object) -> Vec<Value> {
    match object {
        Object::Timestamp(_) | Object::Pattern(_) | Object::TextRange(_) | Object::ParseNode(_) => {
            Vec::new()
        }
        Object::Map(map) => map
            .iter()
            .flat_map(|(k, v)| [k.clone(), v.clone()])
            .collect(),
        Object::Set(set) => set.iter().cloned().collect(),
        Object::RangeCollection(rc) => rc.items.clone(),
        Object::Diagnostic(d) => vec![d.range.clone()],
        Object::Sequence(items) => items.clone(),
        Object::Record(record) => record
            .iter()
            .filter_map(|(_, p)| p.read().ok())
            .collect(),
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Shape of the composite structure reachable from a root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Distinct composites reachable from the root.
    pub reachable: usize,
    /// Reachable composites per kind.
    pub by_kind: BTreeMap<ObjectKind, usize>,
    /// Edges that point at an already-visited composite (sharing or cycles).
    pub shared_references: usize,
    /// References to ids the graph does not hold.
    pub dangling_references: usize,
}

// =============================================================================
// STRUCTURAL EQUALITY
// =============================================================================

/// Compare two rooted graphs for structural equality.
///
/// Kinds, scalar contents and ordering must match, and the sharing pattern
/// must be the same: the pairing between left and right ids is a bijection.
/// Objects are compared as an encoder would see them: failing accessors,
/// absent record values and parse-node or diagnostic `detail` are ignored.
#[must_use]
pub fn structurally_equal(left: (&ObjectGraph, &Value), right: (&ObjectGraph, &Value)) -> bool {
    let mut cmp = Comparison {
        left: left.0,
        right: right.0,
        forward: BTreeMap::new(),
        backward: BTreeMap::new(),
    };
    cmp.values(left.1, right.1)
}

struct Comparison<'a> {
    left: &'a ObjectGraph,
    right: &'a ObjectGraph,
    forward: BTreeMap<ObjectId, ObjectId>,
    backward: BTreeMap<ObjectId, ObjectId>,
}

impl Comparison<'_> {
    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Ref(x), Value::Ref(y)) => self.refs(*x, *y),
            (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
            _ => a == b,
        }
    }

    fn refs(&mut self, x: ObjectId, y: ObjectId) -> bool {
        match (self.forward.get(&x), self.backward.get(&y)) {
            (Some(mapped), _) => return *mapped == y,
            (None, Some(_)) => return false,
            (None, None) => {}
        }
        self.forward.insert(x, y);
        self.backward.insert(y, x);

        let (left, right) = (self.left, self.right);
        match (left.get(x), right.get(y)) {
            (Some(a), Some(b)) => self.objects(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn sequences<'v>(
        &mut self,
        a: impl ExactSizeIterator<Item = &'v Value>,
        b: impl ExactSizeIterator<Item = &'v Value>,
    ) -> bool {
        a.len() == b.len() && a.zip(b).all(|(x, y)| self.values(x, y))
    }

    fn objects(&mut self, a: &Object, b: &Object) -> bool {
        match (a, b) {
            (Object::Timestamp(x), Object::Timestamp(y)) => x == y,
            (Object::Pattern(x), Object::Pattern(y)) => x == y,
            (Object::TextRange(x), Object::TextRange(y)) => x == y,
            (Object::Map(x), Object::Map(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .zip(y.iter())
                        .all(|((ka, va), (kb, vb))| self.values(ka, kb) && self.values(va, vb))
            }
            (Object::Set(x), Object::Set(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| self.values(p, q))
            }
            (Object::RangeCollection(x), Object::RangeCollection(y)) => {
                x.count == y.count && self.sequences(x.items.iter(), y.items.iter())
            }
            (Object::ParseNode(x), Object::ParseNode(y)) => {
                x.node_type == y.node_type
                    && x.id == y.id
                    && x.start == y.start
                    && x.length == y.length
            }
            (Object::Diagnostic(x), Object::Diagnostic(y)) => {
                x.category == y.category
                    && x.message == y.message
                    && self.values(&x.range, &y.range)
            }
            (Object::Sequence(x), Object::Sequence(y)) => self.sequences(x.iter(), y.iter()),
            (Object::Record(x), Object::Record(y)) => {
                let xs = visible_properties(x.iter());
                let ys = visible_properties(y.iter());
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && self.values(va, vb))
            }
            _ => false,
        }
    }
}

fn visible_properties<'a>(
    props: impl Iterator<Item = (&'a String, &'a Property)>,
) -> Vec<(&'a str, Value)> {
    props
        .filter_map(|(k, p)| match p.read() {
            Ok(v) if !v.is_absent() => Some((k.as_str(), v)),
            _ => None,
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
