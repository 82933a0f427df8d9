//! Core types - Values, props records, callbacks, and the output tree.
//!
//! Props are open records: any field name can be present, and enhancers merge
//! records instead of mutating them. Every transformation returns a new
//! [`Props`]; the old one is left untouched and stays valid for identity
//! comparisons.
//!
//! # Equality
//!
//! Two notions of equality are used:
//! - `PartialEq` is structural (lists and records compared element by element).
//! - [`Value::same`] is one level deep: scalars and strings by value, lists,
//!   records, callbacks and events by pointer. Shallow comparison of state
//!   records is built on it.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{EnhanceError, Result};
use crate::host::event::Event;
use crate::unit::Unit;

// =============================================================================
// Callback
// =============================================================================

/// A function value stored in props (event handlers, state updaters).
///
/// Cloning a callback is cheap and keeps its identity, so two clones
/// compare equal while two separately created callbacks never do.
#[derive(Clone)]
pub struct Callback {
    name: Rc<str>,
    f: Rc<dyn Fn(&[Value]) -> Result<Value>>,
}

impl Callback {
    /// Wrap a closure as a callback.
    pub fn new(name: impl Into<Rc<str>>, f: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
        Self {
            name: name.into(),
            f: Rc::new(f),
        }
    }

    /// Invoke the callback with positional arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.f)(args)
    }

    /// Name the callback was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if both handles point at the same closure.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({})", self.name)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A single field value inside [`Props`].
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<[Value]>),
    Record(Props),
    Callback(Callback),
    Event(Event),
}

impl Value {
    /// One-level equality: scalars by value, containers by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
            (Value::Callback(a), Value::Callback(b)) => a.ptr_eq(b),
            (Value::Event(a), Value::Event(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Truthiness used by predicates: null, false, zero, NaN and "" are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Props> {
        match self {
            Value::Record(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Value::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Value::Event(event) => Some(event),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => self.same(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(props) => write!(f, "{props}"),
            Value::Callback(cb) => write!(f, "fn {}", cb.name()),
            Value::Event(event) => write!(f, "event {}", event.kind()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value.into())
    }
}

impl From<Props> for Value {
    fn from(value: Props) -> Self {
        Value::Record(value)
    }
}

impl From<Callback> for Value {
    fn from(value: Callback) -> Self {
        Value::Callback(value)
    }
}

impl From<Event> for Value {
    fn from(value: Event) -> Self {
        Value::Event(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Props - Immutable open record
// =============================================================================

/// Immutable field record passed into rendering units.
///
/// Cheap to clone (shared storage). Identity is preserved by clones and
/// exposed through [`Props::ptr_eq`].
#[derive(Clone, Default)]
pub struct Props(Rc<BTreeMap<String, Value>>);

impl Props {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(name, value)` pairs. Later pairs win.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Props(Rc::new(
            pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    pub fn record(&self, key: &str) -> Option<&Props> {
        self.get(key).and_then(Value::as_record)
    }

    /// Field that must hold a callback.
    pub fn callback(&self, key: &str) -> Result<&Callback> {
        match self.get(key) {
            Some(Value::Callback(cb)) => Ok(cb),
            Some(_) => Err(EnhanceError::NotCallable(key.to_string())),
            None => Err(EnhanceError::MissingField(key.to_string())),
        }
    }

    /// True if the field exists and is truthy.
    pub fn truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(Value::is_truthy)
    }

    /// New record with one field set.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Props {
        let mut map = (*self.0).clone();
        map.insert(key.into(), value.into());
        Props(Rc::new(map))
    }

    /// New record without the given field.
    pub fn without(&self, key: &str) -> Props {
        if !self.contains(key) {
            return self.clone();
        }
        let mut map = (*self.0).clone();
        map.remove(key);
        Props(Rc::new(map))
    }

    /// New record with `over`'s fields laid on top of this one's.
    ///
    /// Merging an empty record returns `self` unchanged (same identity).
    pub fn merge(&self, over: &Props) -> Props {
        if over.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return over.clone();
        }
        let mut map = (*self.0).clone();
        for (k, v) in over.iter() {
            map.insert(k.to_string(), v.clone());
        }
        Props(Rc::new(map))
    }

    /// Same-field-set, [`Value::same`] on every field.
    pub fn shallow_eq(&self, other: &Props) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| v.same(o)))
    }

    /// True if both records share storage.
    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Props {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Props::from_pairs(iter)
    }
}

/// Build a [`Props`] record: `props! { "name" => "Jack", "age" => 18 }`.
#[macro_export]
macro_rules! props {
    () => {
        $crate::types::Props::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::types::Props::from_pairs([
            $(($key, $crate::types::Value::from($value))),+
        ])
    };
}

// =============================================================================
// Node - Output tree
// =============================================================================

/// A host element: tag, attributes, children.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: Rc<str>,
    pub attrs: Props,
    pub children: Vec<Node>,
}

/// Renderable output produced by rendering units.
///
/// `Node::Unit` is a deferred invocation of another unit; the host resolves
/// it, instantiating stateful units once and keeping them across renders.
/// A resolved tree never contains `Node::Unit`.
#[derive(Clone, Debug, Default)]
pub enum Node {
    #[default]
    Empty,
    Text(Rc<str>),
    Element(Element),
    Fragment(Vec<Node>),
    Unit(Unit, Props),
}

impl Node {
    pub fn text(content: impl Into<Rc<str>>) -> Self {
        Node::Text(content.into())
    }

    /// Element without attributes.
    pub fn tag(tag: impl Into<Rc<str>>, children: Vec<Node>) -> Self {
        Node::element(tag, Props::new(), children)
    }

    pub fn element(tag: impl Into<Rc<str>>, attrs: Props, children: Vec<Node>) -> Self {
        Node::Element(Element {
            tag: tag.into(),
            attrs,
            children,
        })
    }

    pub fn fragment(children: Vec<Node>) -> Self {
        Node::Fragment(children)
    }

    /// Deferred invocation of `unit` with `props`.
    pub fn unit(unit: &Unit, props: Props) -> Self {
        Node::Unit(unit.clone(), props)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Empty, Node::Empty) => true,
            (Node::Text(a), Node::Text(b)) => a == b,
            (Node::Element(a), Node::Element(b)) => a == b,
            (Node::Fragment(a), Node::Fragment(b)) => a == b,
            (Node::Unit(ua, pa), Node::Unit(ub, pb)) => ua.ptr_eq(ub) && pa == pb,
            _ => false,
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::text(value)
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::text(value)
    }
}

/// Compact markup form, e.g. `<h1>Jack</h1>`. Callback attributes are omitted.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => Ok(()),
            Node::Text(text) => write!(f, "{text}"),
            Node::Fragment(children) => children.iter().try_for_each(|c| write!(f, "{c}")),
            Node::Element(el) => {
                write!(f, "<{}", el.tag)?;
                for (k, v) in el.attrs.iter() {
                    if !matches!(v, Value::Callback(_)) {
                        write!(f, " {k}=\"{v}\"")?;
                    }
                }
                write!(f, ">")?;
                for child in &el.children {
                    write!(f, "{child}")?;
                }
                write!(f, "</{}>", el.tag)
            }
            Node::Unit(unit, _) => write!(f, "<{} />", unit.name()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_right_wins() {
        let base = props! { "name" => "Tom", "age" => 30 };
        let merged = base.merge(&props! { "name" => "Jack" });

        assert_eq!(merged.str("name"), Some("Jack"));
        assert_eq!(merged.int("age"), Some(30));
        assert_eq!(base.str("name"), Some("Tom"), "merge must not touch the original");
    }

    #[test]
    fn test_merge_empty_keeps_identity() {
        let base = props! { "a" => 1 };
        assert!(base.merge(&Props::new()).ptr_eq(&base));
        assert!(Props::new().merge(&base).ptr_eq(&base));
    }

    #[test]
    fn test_with_and_without_are_new_records() {
        let base = props! { "a" => 1 };
        let added = base.with("b", 2);
        let removed = added.without("a");

        assert!(!added.ptr_eq(&base));
        assert_eq!(added.len(), 2);
        assert_eq!(removed.keys().collect::<Vec<_>>(), vec!["b"]);
        assert!(base.without("zzz").ptr_eq(&base));
    }

    #[test]
    fn test_shallow_eq_compares_one_level() {
        let list: Value = vec![Value::from(1)].into();
        let a = props! { "n" => 1, "s" => "x", "l" => list.clone() };
        let b = props! { "n" => 1, "s" => "x", "l" => list };
        assert!(a.shallow_eq(&b), "same scalars and same list pointer");

        let c = props! { "n" => 1, "s" => "x", "l" => vec![Value::from(1)] };
        assert!(!a.shallow_eq(&c), "structurally equal but distinct list");
        assert_eq!(a, c, "structural equality still holds");
    }

    #[test]
    fn test_callback_identity() {
        let cb = Callback::new("noop", |_| Ok(Value::Null));
        let other = Callback::new("noop", |_| Ok(Value::Null));

        assert_eq!(cb, cb.clone());
        assert_ne!(cb, other);
    }

    #[test]
    fn test_callback_field_errors() {
        let p = props! { "n" => 1 };
        assert_eq!(
            p.callback("n").unwrap_err(),
            EnhanceError::NotCallable("n".into())
        );
        assert_eq!(
            p.callback("missing").unwrap_err(),
            EnhanceError::MissingField("missing".into())
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::from(props! {}).is_truthy());
    }

    #[test]
    fn test_node_display() {
        let node = Node::fragment(vec![
            Node::element("h1", props! { "color" => "navy" }, vec!["Jack".into()]),
            Node::Empty,
            Node::tag("small", vec!["18".into()]),
        ]);
        assert_eq!(
            node.to_string(),
            "<h1 color=\"navy\">Jack</h1><small>18</small>"
        );
    }
}
