//! Containers accepted by [`save`](super::save) and returned by [`load`](super::load).

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array, Dimension};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::NdArray;

/// A value stored under a key of a [`Record`].
///
/// Only [`Value::Array`] can be written in the npy/npz modes; the generic
/// object mode accepts every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Numeric array.
    Array(NdArray),
    /// Floating point scalar.
    Float(f64),
    /// Integer scalar.
    Integer(i64),
    /// Boolean flag.
    Bool(bool),
    /// Free text.
    Text(String),
    /// Ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Array(_) => "array",
            Value::Float(_) => "float",
            Value::Integer(_) => "integer",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    /// Borrow the array if this value is one.
    pub const fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

impl From<NdArray> for Value {
    fn from(arr: NdArray) -> Self {
        Value::Array(arr)
    }
}

impl<D: Dimension> From<Array<f64, D>> for Value {
    fn from(arr: Array<f64, D>) -> Self {
        Value::Array(arr.into())
    }
}

impl<D: Dimension> From<Array<Complex64, D>> for Value {
    fn from(arr: Array<Complex64, D>) -> Self {
        Value::Array(arr.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Mapping from unique string keys to values.
///
/// Keys are kept sorted so that archives are written in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    entries: BTreeMap<String, Value>,
}

impl Record {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous value stored under `key`.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder flavour of [`Record::insert`].
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Array stored under `key`, if that value is an array.
    pub fn array(&self, key: &str) -> Option<&NdArray> {
        self.get(key).and_then(Value::as_array)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the record has no entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Anything that can be persisted: a single array or a mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// A single dense array.
    Array(NdArray),
    /// A mapping of named values.
    Mapping(Record),
}

impl Data {
    /// Borrow the array if this is [`Data::Array`].
    pub const fn as_array(&self) -> Option<&NdArray> {
        match self {
            Data::Array(arr) => Some(arr),
            Data::Mapping(_) => None,
        }
    }

    /// Borrow the record if this is [`Data::Mapping`].
    pub const fn as_mapping(&self) -> Option<&Record> {
        match self {
            Data::Mapping(rec) => Some(rec),
            Data::Array(_) => None,
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Array(arr) => write!(f, "array of {} with shape {:?}", arr.dtype(), arr.shape()),
            Data::Mapping(rec) => write!(f, "mapping with {} entries", rec.len()),
        }
    }
}

impl From<NdArray> for Data {
    fn from(arr: NdArray) -> Self {
        Data::Array(arr)
    }
}

impl From<Record> for Data {
    fn from(rec: Record) -> Self {
        Data::Mapping(rec)
    }
}

impl<D: Dimension> From<Array<f64, D>> for Data {
    fn from(arr: Array<f64, D>) -> Self {
        Data::Array(arr.into())
    }
}

impl<D: Dimension> From<Array<Complex64, D>> for Data {
    fn from(arr: Array<Complex64, D>) -> Self {
        Data::Array(arr.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_record_keeps_keys_sorted_and_unique() {
        let mut rec = Record::new().with("b", 1.0).with("a", array![1.0, 2.0]);
        assert_eq!(rec.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        let previous = rec.insert("b", "text");
        assert_eq!(previous, Some(Value::Float(1.0)));
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.get("b").map(Value::type_name), Some("text"));
    }

    #[test]
    fn test_record_array_accessor() {
        let rec: Record = [("x", array![1.0, 2.0])].into_iter().collect();
        assert_eq!(rec.array("x").map(NdArray::len), Some(2));
        assert!(rec.array("missing").is_none());
    }

    #[test]
    fn test_data_display_describes_content() {
        let arr = Data::from(array![[1.0, 2.0]]);
        assert_eq!(arr.to_string(), "array of float64 with shape [1, 2]");
        let map = Data::from(Record::new().with("k", 1_i64));
        assert_eq!(map.to_string(), "mapping with 1 entries");
    }
}
