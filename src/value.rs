// this_file: src/value.rs

//! The growing JSON value tree.
//!
//! This mirrors `vexy_json_core::ast::value::Value` in spirit — a tagged
//! variant over the six JSON cases with `Display`/accessor conveniences —
//! but two things differ because the tree is mutated in place while a
//! consumer may be holding a reference to it:
//!
//! - Arrays and objects wrap `Rc<RefCell<_>>` so a cloned `JsonValue`
//!   observes later in-place growth of the same container, rather than a
//!   frozen snapshot.
//! - Objects use `indexmap::IndexMap` rather than a hash map, so
//!   insertion order survives — the same structure `serde_json`'s
//!   `preserve_order` feature reaches for internally.
//!
//! Numbers are a single `f64`, not an `Integer`/`Float` split.

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A shared, growable JSON array.
pub type SharedArray = Rc<RefCell<Vec<JsonValue>>>;
/// A shared, growable JSON object, preserving insertion order.
pub type SharedObject = Rc<RefCell<IndexMap<String, JsonValue>>>;

/// Any JSON value, at any point during incremental construction.
///
/// An emitted `JsonValue` is only ever a snapshot of the top-level slot:
/// cloning an `Array` or `Object` clones the `Rc`, so both the consumer's
/// copy and the builder's continue to observe the same underlying
/// container as it grows. Cloning a `String` takes an owned copy frozen
/// at that instant: strings are logically monotone but physically
/// replaced each time they grow.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum JsonValue {
    /// JSON `null`.
    Null,
    /// JSON `true`/`false`.
    Boolean(bool),
    /// A JSON number, decoded to `f64`.
    Number(f64),
    /// A JSON string, already escape-decoded.
    String(String),
    /// A JSON array.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_array"))]
    Array(SharedArray),
    /// A JSON object.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_object"))]
    Object(SharedObject),
}

#[cfg(feature = "serde")]
fn serialize_array<S: serde::Serializer>(arr: &SharedArray, s: S) -> Result<S::Ok, S::Error> {
    use serde::Serialize;
    arr.borrow().serialize(s)
}

#[cfg(feature = "serde")]
fn serialize_object<S: serde::Serializer>(obj: &SharedObject, s: S) -> Result<S::Ok, S::Error> {
    use serde::Serialize;
    obj.borrow().serialize(s)
}

impl JsonValue {
    /// Creates a new, empty shared array value.
    pub fn new_array() -> (JsonValue, SharedArray) {
        let arr = Rc::new(RefCell::new(Vec::new()));
        (JsonValue::Array(arr.clone()), arr)
    }

    /// Creates a new, empty shared object value.
    pub fn new_object() -> (JsonValue, SharedObject) {
        let obj = Rc::new(RefCell::new(IndexMap::new()));
        (JsonValue::Object(obj.clone()), obj)
    }

    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// If the value is a boolean, returns it.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            JsonValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is a number, returns it.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// If the value is a string, returns a borrow of it.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// If the value is an array, returns its shared handle.
    pub fn as_array(&self) -> Option<&SharedArray> {
        match self {
            JsonValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// If the value is an object, returns its shared handle.
    pub fn as_object(&self) -> Option<&SharedObject> {
        match self {
            JsonValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

/// Writes `s` as a JSON string literal, with quotes and escaping — unlike
/// Rust's `{:?}`, which renders a control character below `0x20` as
/// `\u{7}` (valid Rust, not valid JSON), this always emits the four-digit
/// `\u00XX` form JSON requires, and uses the short escapes for the
/// handful of characters that have one.
fn write_json_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\u{8}' => write!(f, "\\b")?,
            '\u{c}' => write!(f, "\\f")?,
            '\n' => write!(f, "\\n")?,
            '\r' => write!(f, "\\r")?,
            '\t' => write!(f, "\\t")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonValue::Null => write!(f, "null"),
            JsonValue::Boolean(b) => write!(f, "{b}"),
            JsonValue::Number(n) => write!(f, "{n}"),
            JsonValue::String(s) => write_json_string(f, s),
            JsonValue::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            JsonValue::Object(obj) => {
                write!(f, "{{")?;
                for (i, (k, v)) in obj.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write_json_string(f, k)?;
                    write!(f, ":{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_clone_shares_storage() {
        let (value, handle) = JsonValue::new_array();
        let cloned = value.clone();
        handle.borrow_mut().push(JsonValue::Number(1.0));
        assert_eq!(cloned.as_array().unwrap().borrow().len(), 1);
    }

    #[test]
    fn object_preserves_insertion_order_and_last_wins() {
        let (value, handle) = JsonValue::new_object();
        handle
            .borrow_mut()
            .insert("a".to_string(), JsonValue::Number(1.0));
        handle
            .borrow_mut()
            .insert("b".to_string(), JsonValue::Number(2.0));
        handle
            .borrow_mut()
            .insert("a".to_string(), JsonValue::Number(3.0));
        let obj = value.as_object().unwrap().borrow();
        let keys: Vec<_> = obj.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(obj["a"], JsonValue::Number(3.0));
    }

    #[test]
    fn proto_like_keys_are_ordinary_entries() {
        let (value, handle) = JsonValue::new_object();
        handle
            .borrow_mut()
            .insert("__proto__".to_string(), JsonValue::Number(1.0));
        let obj = value.as_object().unwrap().borrow();
        assert_eq!(obj.get("__proto__"), Some(&JsonValue::Number(1.0)));
    }
}
