//! Typed reads out of an [`AttrValue`] object
//!
//! Expanders use [`Fields`] to pull typed values out of configuration. Absent,
//! null and unknown values read as the zero value of the requested type; a
//! value of the wrong dynamic type is a [`Error::Decode`] naming the full
//! attribute path.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::value::AttrValue;
use crate::Result;

static EMPTY: BTreeMap<String, AttrValue> = BTreeMap::new();

/// Read-only view over one object of the attribute tree
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    fields: &'a BTreeMap<String, AttrValue>,
    path: String,
}

impl<'a> Fields<'a> {
    /// View an object value rooted at `path`
    ///
    /// Null and unknown are treated as an empty object.
    pub fn new(value: &'a AttrValue, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        match value {
            AttrValue::Map(fields) => Ok(Self { fields, path }),
            AttrValue::Null | AttrValue::Unknown => Ok(Self {
                fields: &EMPTY,
                path,
            }),
            other => Err(Error::decode(
                path,
                format!("expected an object, got {}", other.type_name()),
            )),
        }
    }

    /// Attribute path of this object
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Attribute path of a key in this object
    pub fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// Raw value of a key; null when absent
    pub fn raw(&self, key: &str) -> &'a AttrValue {
        static NULL: AttrValue = AttrValue::Null;
        self.fields.get(key).unwrap_or(&NULL)
    }

    fn mismatch(&self, key: &str, expected: &str, got: &AttrValue) -> Error {
        Error::decode(
            self.path_of(key),
            format!("expected {}, got {}", expected, got.type_name()),
        )
    }

    /// String value; empty when absent
    pub fn string(&self, key: &str) -> Result<String> {
        Ok(self.opt_string(key)?.unwrap_or_default())
    }

    /// String value; `None` when absent or empty
    pub fn opt_string(&self, key: &str) -> Result<Option<String>> {
        match self.raw(key) {
            AttrValue::String(s) if s.is_empty() => Ok(None),
            AttrValue::String(s) => Ok(Some(s.clone())),
            v if v.is_absent() => Ok(None),
            other => Err(self.mismatch(key, "a string", other)),
        }
    }

    /// Boolean value; false when absent
    pub fn bool(&self, key: &str) -> Result<bool> {
        Ok(self.opt_bool(key)?.unwrap_or_default())
    }

    /// Boolean value; `None` when absent
    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.raw(key) {
            AttrValue::Bool(b) => Ok(Some(*b)),
            v if v.is_absent() => Ok(None),
            other => Err(self.mismatch(key, "a bool", other)),
        }
    }

    /// Integer value; zero when absent
    pub fn int(&self, key: &str) -> Result<i64> {
        Ok(self.opt_int(key)?.unwrap_or_default())
    }

    /// Integer value; `None` when absent
    pub fn opt_int(&self, key: &str) -> Result<Option<i64>> {
        match self.raw(key) {
            AttrValue::Int(i) => Ok(Some(*i)),
            v if v.is_absent() => Ok(None),
            other => Err(self.mismatch(key, "an integer", other)),
        }
    }

    /// List or set of strings; empty when absent
    pub fn strings(&self, key: &str) -> Result<Vec<String>> {
        self.list(key)?
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_absent())
            .map(|(i, v)| match v {
                AttrValue::String(s) => Ok(s.clone()),
                other => Err(Error::decode(
                    format!("{}.{}", self.path_of(key), i),
                    format!("expected a string, got {}", other.type_name()),
                )),
            })
            .collect()
    }

    /// List of strings; `None` when absent or empty
    pub fn opt_strings(&self, key: &str) -> Result<Option<Vec<String>>> {
        let items = self.strings(key)?;
        Ok((!items.is_empty()).then_some(items))
    }

    /// List or set of integers; empty when absent
    pub fn ints(&self, key: &str) -> Result<Vec<i64>> {
        self.list(key)?
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_absent())
            .map(|(i, v)| match v {
                AttrValue::Int(n) => Ok(*n),
                other => Err(Error::decode(
                    format!("{}.{}", self.path_of(key), i),
                    format!("expected an integer, got {}", other.type_name()),
                )),
            })
            .collect()
    }

    /// Map of strings; empty when absent
    pub fn string_map(&self, key: &str) -> Result<BTreeMap<String, String>> {
        match self.raw(key) {
            AttrValue::Map(m) => m
                .iter()
                .filter(|(_, v)| !v.is_absent())
                .map(|(k, v)| match v {
                    AttrValue::String(s) => Ok((k.clone(), s.clone())),
                    other => Err(Error::decode(
                        format!("{}.{}", self.path_of(key), k),
                        format!("expected a string, got {}", other.type_name()),
                    )),
                })
                .collect(),
            v if v.is_absent() => Ok(BTreeMap::new()),
            other => Err(self.mismatch(key, "a map", other)),
        }
    }

    /// Map of strings; `None` when absent or empty
    pub fn opt_string_map(&self, key: &str) -> Result<Option<BTreeMap<String, String>>> {
        let map = self.string_map(key)?;
        Ok((!map.is_empty()).then_some(map))
    }

    fn list(&self, key: &str) -> Result<&'a [AttrValue]> {
        match self.raw(key) {
            AttrValue::List(l) => Ok(l),
            v if v.is_absent() => Ok(&[]),
            other => Err(self.mismatch(key, "a list", other)),
        }
    }

    /// Nested block list; each element must be an object
    pub fn blocks(&self, key: &str) -> Result<Vec<Fields<'a>>> {
        let base = self.path_of(key);
        self.list(key)?
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let path = format!("{}.{}", base, i);
                match v {
                    AttrValue::Map(fields) => Ok(Fields { fields, path }),
                    v if v.is_absent() => Ok(Fields {
                        fields: &EMPTY,
                        path,
                    }),
                    other => Err(Error::decode(
                        path,
                        format!("expected an object, got {}", other.type_name()),
                    )),
                }
            })
            .collect()
    }

    /// First element of a single-item nested block; `None` when empty
    pub fn block(&self, key: &str) -> Result<Option<Fields<'a>>> {
        Ok(self.blocks(key)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> AttrValue {
        AttrValue::from(json!({
            "name": "main",
            "empty": "",
            "replicas": 3,
            "paused": true,
            "secrets": ["tls", "auth"],
            "groups": [1000, 2000],
            "labels": {"app": "alertmanager"},
            "spec": [{"version": "v0.21.0", "port": "9093"}],
            "wrong": 5,
        }))
    }

    #[test]
    fn reads_typed_values() {
        let t = tree();
        let f = Fields::new(&t, "").expect("object");

        assert_eq!(f.string("name").expect("string"), "main");
        assert_eq!(f.opt_string("empty").expect("string"), None);
        assert_eq!(f.int("replicas").expect("int"), 3);
        assert!(f.bool("paused").expect("bool"));
        assert_eq!(f.strings("secrets").expect("list"), vec!["tls", "auth"]);
        assert_eq!(f.ints("groups").expect("list"), vec![1000, 2000]);
        assert_eq!(
            f.string_map("labels").expect("map").get("app").map(String::as_str),
            Some("alertmanager")
        );
    }

    #[test]
    fn absent_values_read_as_zero() {
        let t = tree();
        let f = Fields::new(&t, "").expect("object");

        assert_eq!(f.string("nope").expect("string"), "");
        assert_eq!(f.int("nope").expect("int"), 0);
        assert!(!f.bool("nope").expect("bool"));
        assert!(f.strings("nope").expect("list").is_empty());
        assert!(f.block("nope").expect("block").is_none());
        assert_eq!(f.opt_bool("nope").expect("bool"), None);
    }

    #[test]
    fn unknown_values_read_as_zero() {
        let mut t = tree();
        t.insert("name", AttrValue::Unknown);
        let f = Fields::new(&t, "").expect("object");
        assert_eq!(f.opt_string("name").expect("string"), None);
    }

    #[test]
    fn type_mismatch_names_path() {
        let t = tree();
        let f = Fields::new(&t, "spec.0").expect("object");

        let err = f.string("wrong").expect_err("number is not a string");
        assert_eq!(err.field(), Some("spec.0.wrong"));

        let err = f.blocks("secrets").expect_err("strings are not objects");
        assert_eq!(err.field(), Some("spec.0.secrets.0"));
    }

    #[test]
    fn nested_block_paths_accumulate() {
        let t = tree();
        let f = Fields::new(&t, "").expect("object");
        let spec = f.block("spec").expect("block").expect("present");

        assert_eq!(spec.path(), "spec.0");
        assert_eq!(spec.string("version").expect("string"), "v0.21.0");
        let err = spec.int("port").expect_err("string is not an int");
        assert_eq!(err.field(), Some("spec.0.port"));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let v = AttrValue::from("scalar");
        assert!(Fields::new(&v, "metadata.0").is_err());
        assert!(Fields::new(&AttrValue::Null, "metadata.0").is_ok());
    }
}
