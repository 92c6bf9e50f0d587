//! Runtime values as seen by the dispatcher.
//!
//! Values live in a `Heap` arena and refer to each other by `ObjRef`. An `ObjRef`
//! is the value's identity: two references to the same slot are the same object,
//! which is what lets a container hold itself without any owning cycle.
//!
//! ```text
//! Heap
//! ├── #0  List [#1, #0]      <- holds itself
//! └── #1  Int 7
//! ```

use crate::dispatch::Visualize;
use crate::error::IntrospectionError;
use crate::model::{Child, View};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nesting bound for structural comparison. Cyclic containers hit it instead of looping.
pub const MAX_COMPARE_DEPTH: usize = 64;

/// Identity of a value in a `Heap`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjRef(u32);

impl ObjRef {
    /// Raw slot index.
    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn from_index(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjRef(#{})", self.0)
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named attribute of a module, class or object.
///
/// Reading an attribute may fail; the failure is kept so the dispatcher can skip the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: Result<ObjRef, IntrospectionError>,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: ObjRef) -> Self {
        Self {
            name: name.into(),
            value: Ok(value),
        }
    }

    /// An attribute whose lookup raises.
    pub fn raising(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: Err(IntrospectionError::AttributeRaised {
                name: name.clone(),
                reason: reason.into(),
            }),
            name,
        }
    }

    /// Dunder names are never shown.
    pub fn is_public(&self) -> bool {
        !self.name.starts_with("__")
    }
}

/// A callable parameter. Parameters without a default are positional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub default: Option<ObjRef>,
}

impl Param {
    pub fn positional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn keyword(name: impl Into<String>, default: ObjRef) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }
}

/// The closed set of runtime shapes the dispatcher understands.
#[derive(Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ObjRef>),
    Tuple(Vec<ObjRef>),
    /// Distinct members, in insertion order. `Heap::set` and `Heap::push` keep them distinct.
    Set(Vec<ObjRef>),
    /// Insertion-ordered key/value pairs, one per key identity. See `Heap::insert`.
    Dict(Vec<(ObjRef, ObjRef)>),
    Function {
        name: String,
        params: Vec<Param>,
    },
    Module {
        name: String,
        attrs: Vec<Attr>,
    },
    Class {
        name: String,
        attrs: Vec<Attr>,
    },
    /// An instance. `class` should name a `Value::Class`.
    Object {
        class: ObjRef,
        attrs: Vec<Attr>,
    },
    /// Already a view; shown as-is.
    View(View<Child>),
    /// Describes its own view.
    Custom(Box<dyn Visualize>),
}

impl Value {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// Shape name, used in motifs and comparison errors.
    pub fn shape_name(&self) -> &str {
        match self {
            Value::Null => "None",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Tuple(_) => "Tuple",
            Value::Set(_) => "Set",
            Value::Dict(_) => "Dict",
            Value::Function { .. } => "Function",
            Value::Module { .. } => "Module",
            Value::Class { .. } => "Class",
            Value::Object { .. } => "Instance",
            Value::View(_) => "View",
            Value::Custom(custom) => custom.type_name(),
        }
    }
}

/// Arena of runtime values.
#[derive(Debug, Default)]
pub struct Heap {
    values: Vec<Value>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and return its identity.
    ///
    /// # Panics
    ///
    /// If every 32-bit identity is already taken. `try_alloc` reports that instead.
    pub fn alloc(&mut self, value: Value) -> ObjRef {
        match self.try_alloc(value) {
            Ok(obj) => obj,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_alloc(&mut self, value: Value) -> Result<ObjRef, IntrospectionError> {
        self.try_alloc_cyclic(|_| value)
    }

    /// Store a value built from its own identity, for values that refer to themselves.
    ///
    /// # Panics
    ///
    /// Under the same condition as `alloc`.
    pub fn alloc_cyclic(&mut self, build: impl FnOnce(ObjRef) -> Value) -> ObjRef {
        match self.try_alloc_cyclic(build) {
            Ok(obj) => obj,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_alloc_cyclic(
        &mut self,
        build: impl FnOnce(ObjRef) -> Value,
    ) -> Result<ObjRef, IntrospectionError> {
        let obj = next_ref(self.values.len())?;
        self.values.push(build(obj));
        Ok(obj)
    }

    pub fn get(&self, obj: ObjRef) -> Option<&Value> {
        self.values.get(obj.0 as usize)
    }

    pub fn get_mut(&mut self, obj: ObjRef) -> Option<&mut Value> {
        self.values.get_mut(obj.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // =========================================================================
    // Convenience constructors
    // =========================================================================

    pub fn null(&mut self) -> ObjRef {
        self.alloc(Value::Null)
    }

    pub fn bool(&mut self, b: bool) -> ObjRef {
        self.alloc(Value::Bool(b))
    }

    pub fn int(&mut self, i: i64) -> ObjRef {
        self.alloc(Value::Int(i))
    }

    pub fn float(&mut self, f: f64) -> ObjRef {
        self.alloc(Value::Float(f))
    }

    pub fn str(&mut self, s: impl Into<String>) -> ObjRef {
        self.alloc(Value::Str(s.into()))
    }

    pub fn list(&mut self, items: impl IntoIterator<Item = ObjRef>) -> ObjRef {
        self.alloc(Value::List(items.into_iter().collect()))
    }

    pub fn tuple(&mut self, items: impl IntoIterator<Item = ObjRef>) -> ObjRef {
        self.alloc(Value::Tuple(items.into_iter().collect()))
    }

    /// Repeated members are kept once, at their first position.
    pub fn set(&mut self, items: impl IntoIterator<Item = ObjRef>) -> ObjRef {
        let mut members = Vec::new();
        for item in items {
            add_member(&mut members, item);
        }
        self.alloc(Value::Set(members))
    }

    /// A repeated key keeps its first position and takes the last value.
    pub fn dict(&mut self, pairs: impl IntoIterator<Item = (ObjRef, ObjRef)>) -> ObjRef {
        let mut entries = Vec::new();
        for (key, value) in pairs {
            upsert(&mut entries, key, value);
        }
        self.alloc(Value::Dict(entries))
    }

    /// Append `item` to a list or tuple, or add it to a set if absent.
    /// Returns false for any other shape.
    pub fn push(&mut self, container: ObjRef, item: ObjRef) -> bool {
        match self.get_mut(container) {
            Some(Value::List(items)) | Some(Value::Tuple(items)) => {
                items.push(item);
                true
            }
            Some(Value::Set(members)) => {
                add_member(members, item);
                true
            }
            _ => false,
        }
    }

    /// Set `dict[key] = value`. Keys match by identity; an existing key keeps its
    /// position. Returns false for any other shape.
    pub fn insert(&mut self, dict: ObjRef, key: ObjRef, value: ObjRef) -> bool {
        match self.get_mut(dict) {
            Some(Value::Dict(pairs)) => {
                upsert(pairs, key, value);
                true
            }
            _ => false,
        }
    }

    /// Type name shown for a value; instances report their class name.
    pub fn type_name(&self, obj: ObjRef) -> String {
        match self.get(obj) {
            Some(Value::Object { class, .. }) => match self.get(*class) {
                Some(Value::Class { name, .. }) => name.clone(),
                _ => "object".to_string(),
            },
            Some(value) => value.shape_name().to_string(),
            None => "<dangling>".to_string(),
        }
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Compare two values the way the generic-object rule needs.
    ///
    /// Scalars and containers compare structurally; functions, modules, classes,
    /// instances and views compare by identity. Custom values cannot be compared.
    pub fn try_eq(&self, a: ObjRef, b: ObjRef) -> Result<bool, IntrospectionError> {
        self.eq_at_depth(a, b, 0)
    }

    fn eq_at_depth(&self, a: ObjRef, b: ObjRef, depth: usize) -> Result<bool, IntrospectionError> {
        if a == b {
            return Ok(true);
        }
        if depth >= MAX_COMPARE_DEPTH {
            return Err(IntrospectionError::DepthExceeded {
                depth: MAX_COMPARE_DEPTH,
            });
        }
        let left = self.get(a).ok_or(IntrospectionError::Dangling(a))?;
        let right = self.get(b).ok_or(IntrospectionError::Dangling(b))?;

        match (left, right) {
            (Value::Custom(_), _) | (_, Value::Custom(_)) => Err(IntrospectionError::Incomparable {
                left: left.shape_name().to_string(),
                right: right.shape_name().to_string(),
            }),
            (Value::Null, Value::Null) => Ok(true),
            (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
            (Value::Int(x), Value::Int(y)) => Ok(x == y),
            (Value::Float(x), Value::Float(y)) => Ok(x == y),
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
                Ok(*i as f64 == *f)
            }
            (Value::Str(x), Value::Str(y)) => Ok(x == y),
            (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
                self.seq_eq(x, y, depth)
            }
            (Value::Set(x), Value::Set(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for item in x {
                    if !self.contains(y, *item, depth)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Dict(x), Value::Dict(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for (key, value) in x {
                    let mut matched = false;
                    for (other_key, other_value) in y {
                        if self.eq_at_depth(*key, *other_key, depth + 1)? {
                            matched = self.eq_at_depth(*value, *other_value, depth + 1)?;
                            break;
                        }
                    }
                    if !matched {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn seq_eq(&self, x: &[ObjRef], y: &[ObjRef], depth: usize) -> Result<bool, IntrospectionError> {
        if x.len() != y.len() {
            return Ok(false);
        }
        for (a, b) in x.iter().zip(y) {
            if !self.eq_at_depth(*a, *b, depth + 1)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn contains(
        &self,
        items: &[ObjRef],
        needle: ObjRef,
        depth: usize,
    ) -> Result<bool, IntrospectionError> {
        for item in items {
            if self.eq_at_depth(*item, needle, depth + 1)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn next_ref(len: usize) -> Result<ObjRef, IntrospectionError> {
    u32::try_from(len)
        .map(ObjRef)
        .map_err(|_| IntrospectionError::HeapFull { len })
}

fn add_member(members: &mut Vec<ObjRef>, item: ObjRef) {
    if !members.contains(&item) {
        members.push(item);
    }
}

fn upsert(pairs: &mut Vec<(ObjRef, ObjRef)>, key: ObjRef, value: ObjRef) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(pair) => pair.1 = value,
        None => pairs.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identity_is_slot() {
        let mut heap = Heap::new();
        let a = heap.int(1);
        let b = heap.int(1);
        assert_ne!(a, b);
        assert_eq!(heap.try_eq(a, b), Ok(true));
    }

    #[test]
    fn test_list_can_hold_itself() {
        let mut heap = Heap::new();
        let list = heap.list([]);
        assert!(heap.push(list, list));
        match heap.get(list) {
            Some(Value::List(items)) => assert_eq!(items, &vec![list]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dict_keys_are_unique() {
        let mut heap = Heap::new();
        let k = heap.str("k");
        let other = heap.str("other");
        let one = heap.int(1);
        let two = heap.int(2);

        let dict = heap.dict([]);
        assert!(heap.insert(dict, k, one));
        assert!(heap.insert(dict, other, one));
        assert!(heap.insert(dict, k, two));
        match heap.get(dict) {
            Some(Value::Dict(pairs)) => assert_eq!(pairs, &vec![(k, two), (other, one)]),
            other => panic!("unexpected {:?}", other),
        }

        let built = heap.dict([(k, one), (other, one), (k, two)]);
        assert_eq!(heap.try_eq(dict, built), Ok(true));
        assert!(matches!(heap.get(built), Some(Value::Dict(pairs)) if pairs.len() == 2));
    }

    #[test]
    fn test_set_members_are_unique() {
        let mut heap = Heap::new();
        let a = heap.int(1);
        let b = heap.int(2);
        let set = heap.set([a, a, b]);
        assert!(heap.push(set, b));
        assert!(heap.push(set, set));
        match heap.get(set) {
            Some(Value::Set(members)) => assert_eq!(members, &vec![a, b, set]),
            other => panic!("unexpected {:?}", other),
        }

        // Lists keep repeats.
        let list = heap.list([a, a]);
        heap.push(list, a);
        assert!(matches!(heap.get(list), Some(Value::List(items)) if items.len() == 3));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_identity_space_exhaustion_is_an_error() {
        let last = u32::MAX as usize;
        assert_eq!(next_ref(last), Ok(ObjRef(u32::MAX)));
        assert_eq!(
            next_ref(last + 1),
            Err(IntrospectionError::HeapFull { len: last + 1 })
        );

        let mut heap = Heap::new();
        assert_eq!(heap.try_alloc(Value::Null), Ok(ObjRef(0)));
        let cyclic = heap.try_alloc_cyclic(|this| Value::List(vec![this])).unwrap();
        assert!(matches!(heap.get(cyclic), Some(Value::List(items)) if items == &vec![cyclic]));
    }

    #[test]
    fn test_structural_equality() {
        let mut heap = Heap::new();
        let one = heap.int(1);
        let one_f = heap.float(1.0);
        let s = heap.str("x");
        let l1 = heap.list([one, s]);
        let l2 = heap.list([one_f, s]);
        let t = heap.tuple([one, s]);
        assert_eq!(heap.try_eq(l1, l2), Ok(true));
        assert_eq!(heap.try_eq(l1, t), Ok(false));

        let k = heap.str("k");
        let d1 = heap.dict([(k, one)]);
        let d2 = heap.dict([(k, one_f)]);
        let d3 = heap.dict([(k, s)]);
        assert_eq!(heap.try_eq(d1, d2), Ok(true));
        assert_eq!(heap.try_eq(d1, d3), Ok(false));
    }

    #[test]
    fn test_cyclic_comparison_fails_instead_of_looping() {
        let mut heap = Heap::new();
        let a = heap.list([]);
        heap.push(a, a);
        let b = heap.list([]);
        heap.push(b, b);
        assert!(matches!(
            heap.try_eq(a, b),
            Err(IntrospectionError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn test_raising_attribute() {
        let attr = Attr::raising("data", "not available");
        assert!(attr.value.is_err());
        assert!(attr.is_public());
        assert!(!Attr::raising("__dict__", "x").is_public());
    }

    #[test]
    fn test_instance_type_name() {
        let mut heap = Heap::new();
        let class = heap.alloc(Value::Class {
            name: "Point".into(),
            attrs: vec![],
        });
        let obj = heap.alloc(Value::Object {
            class,
            attrs: vec![],
        });
        assert_eq!(heap.type_name(obj), "Point");
        assert_eq!(heap.type_name(class), "Class");
    }
}
