//! Generic attribute tree exchanged with Terraform
//!
//! Terraform hands configuration, plans and state to the provider as a
//! dynamically typed tree. [`AttrValue`] models that tree: objects and string
//! maps are both [`AttrValue::Map`], lists and sets are [`AttrValue::List`],
//! and nested blocks are lists of maps. Values Terraform does not know yet
//! (during planning) are [`AttrValue::Unknown`].
//!
//! On the wire the tree is exchanged as [`ValueAny`], which carries the
//! msgpack encoding of unknown values. Terraform numbers in this provider are
//! always integral.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tf_provider::value::ValueAny;

/// A dynamically typed configuration or state value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "ValueAny", into = "ValueAny")]
pub enum AttrValue {
    /// Absent value
    #[default]
    Null,
    /// Value not known until apply
    Unknown,
    /// Boolean
    Bool(bool),
    /// Number
    Int(i64),
    /// String
    String(String),
    /// List, set, or list of nested blocks
    List(Vec<AttrValue>),
    /// Object, string map, or a single nested block
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Empty object value
    pub fn empty_map() -> Self {
        AttrValue::Map(BTreeMap::new())
    }

    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Whether the value is unknown
    pub fn is_unknown(&self) -> bool {
        matches!(self, AttrValue::Unknown)
    }

    /// Whether the value is null or unknown
    pub fn is_absent(&self) -> bool {
        self.is_null() || self.is_unknown()
    }

    /// Whether the value equals the zero value of its type
    ///
    /// Null counts as zero. Unknown never does.
    pub fn is_zero(&self) -> bool {
        match self {
            AttrValue::Null => true,
            AttrValue::Unknown => false,
            AttrValue::Bool(b) => !b,
            AttrValue::Int(i) => *i == 0,
            AttrValue::String(s) => s.is_empty(),
            AttrValue::List(l) => l.is_empty(),
            AttrValue::Map(m) => m.is_empty(),
        }
    }

    /// Short name of the dynamic type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Unknown => "unknown",
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "number",
            AttrValue::String(_) => "string",
            AttrValue::List(_) => "list",
            AttrValue::Map(_) => "map",
        }
    }

    /// Look up a key when the value is a map
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        match self {
            AttrValue::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Mutable lookup of a key when the value is a map
    pub fn get_mut(&mut self, key: &str) -> Option<&mut AttrValue> {
        match self {
            AttrValue::Map(m) => m.get_mut(key),
            _ => None,
        }
    }

    /// Set a key, turning a null value into an empty map first
    ///
    /// Setting a key on a non-map value is a no-op.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        if self.is_null() {
            *self = AttrValue::empty_map();
        }
        if let AttrValue::Map(m) = self {
            m.insert(key.into(), value.into());
        }
    }

    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the list payload
    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Borrow the map payload
    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Wrap a single object as a one-element block list
    pub fn block(value: AttrValue) -> AttrValue {
        AttrValue::List(vec![value])
    }

    /// Replace every unknown value in the tree with null
    pub fn unknowns_to_null(self) -> AttrValue {
        match self {
            AttrValue::Unknown => AttrValue::Null,
            AttrValue::List(l) => {
                AttrValue::List(l.into_iter().map(AttrValue::unknowns_to_null).collect())
            }
            AttrValue::Map(m) => AttrValue::Map(
                m.into_iter()
                    .map(|(k, v)| (k, v.unknowns_to_null()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Convert into a JSON value; unknown becomes null
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            AttrValue::Null | AttrValue::Unknown => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::String(s) => Value::String(s.clone()),
            AttrValue::List(l) => Value::Array(l.iter().map(AttrValue::to_json).collect()),
            AttrValue::Map(m) => {
                Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

impl From<serde_json::Value> for AttrValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => AttrValue::String(n.to_string()),
            },
            Value::String(s) => AttrValue::String(s),
            Value::Array(a) => AttrValue::List(a.into_iter().map(AttrValue::from).collect()),
            Value::Object(o) => {
                AttrValue::Map(o.into_iter().map(|(k, v)| (k, AttrValue::from(v))).collect())
            }
        }
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<i32> for AttrValue {
    fn from(i: i32) -> Self {
        AttrValue::Int(i64::from(i))
    }
}

impl From<u64> for AttrValue {
    fn from(u: u64) -> Self {
        AttrValue::Int(i64::try_from(u).unwrap_or(i64::MAX))
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl<T: Into<AttrValue>> From<Vec<T>> for AttrValue {
    fn from(v: Vec<T>) -> Self {
        AttrValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AttrValue>> From<BTreeMap<String, T>> for AttrValue {
    fn from(m: BTreeMap<String, T>) -> Self {
        AttrValue::Map(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or_default()
    }
}

// =============================================================================
// Builder used by flatteners
// =============================================================================

/// Builds an object value, omitting zero-valued optional fields
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    fields: BTreeMap<String, AttrValue>,
}

impl ObjectBuilder {
    /// Start an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field unconditionally
    pub fn set(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Set a field unless it is the zero value of its type
    pub fn set_nonzero(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        let value = value.into();
        if !value.is_zero() {
            self.fields.insert(key.to_string(), value);
        }
        self
    }

    /// Set a field when present
    pub fn set_opt<T: Into<AttrValue>>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.fields.insert(key.to_string(), value.into());
        }
        self
    }

    /// Set a single nested block when present
    pub fn set_block(mut self, key: &str, value: Option<AttrValue>) -> Self {
        if let Some(value) = value {
            self.fields.insert(key.to_string(), AttrValue::block(value));
        }
        self
    }

    /// Set a list of nested blocks unless empty
    pub fn set_blocks(mut self, key: &str, values: Vec<AttrValue>) -> Self {
        if !values.is_empty() {
            self.fields.insert(key.to_string(), AttrValue::List(values));
        }
        self
    }

    /// Finish the object
    pub fn build(self) -> AttrValue {
        AttrValue::Map(self.fields)
    }
}

// =============================================================================
// Wire form
// =============================================================================

impl From<ValueAny> for AttrValue {
    fn from(value: ValueAny) -> Self {
        match value {
            ValueAny::Null => AttrValue::Null,
            ValueAny::Unknown => AttrValue::Unknown,
            ValueAny::Bool(b) => AttrValue::Bool(b),
            ValueAny::Number(i) => AttrValue::Int(i),
            ValueAny::String(s) => AttrValue::String(s),
            ValueAny::List(l) => AttrValue::List(l.into_iter().map(AttrValue::from).collect()),
            ValueAny::Map(m) => {
                AttrValue::Map(m.into_iter().map(|(k, v)| (k, AttrValue::from(v))).collect())
            }
        }
    }
}

impl From<AttrValue> for ValueAny {
    fn from(value: AttrValue) -> Self {
        match value {
            AttrValue::Null => ValueAny::Null,
            AttrValue::Unknown => ValueAny::Unknown,
            AttrValue::Bool(b) => ValueAny::Bool(b),
            AttrValue::Int(i) => ValueAny::Number(i),
            AttrValue::String(s) => ValueAny::String(s),
            AttrValue::List(l) => ValueAny::List(l.into_iter().map(ValueAny::from).collect()),
            AttrValue::Map(m) => {
                ValueAny::Map(m.into_iter().map(|(k, v)| (k, ValueAny::from(v))).collect())
            }
        }
    }
}
