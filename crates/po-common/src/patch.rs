//! JSON-Patch construction for in-place updates
//!
//! Updates are sent as `application/json-patch+json`. Operations are built
//! from field level differences between prior and planned state and kept in
//! the order they are added.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::Result;

/// One JSON-Patch operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Add a member or replace it if present
    Add {
        /// JSON pointer of the target
        path: String,
        /// New value
        value: Value,
    },
    /// Replace an existing member
    Replace {
        /// JSON pointer of the target
        path: String,
        /// New value
        value: Value,
    },
    /// Remove an existing member
    Remove {
        /// JSON pointer of the target
        path: String,
    },
}

impl PatchOperation {
    /// JSON pointer this operation targets
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Remove { path } => path,
        }
    }
}

/// Ordered list of patch operations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PatchOperations(Vec<PatchOperation>);

impl PatchOperations {
    /// Empty operation list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one operation
    pub fn push(&mut self, op: PatchOperation) {
        self.0.push(op);
    }

    /// Whether no operations were collected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the operations in order
    pub fn iter(&self) -> impl Iterator<Item = &PatchOperation> {
        self.0.iter()
    }

    /// Serialize to the JSON-Patch wire format
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Convert into a typed `json_patch::Patch` for the kube client
    pub fn to_json_patch(&self) -> Result<json_patch::Patch> {
        let value = serde_json::to_value(self)?;
        serde_json::from_value(value).map_err(|e| Error::serialization(e.to_string()))
    }
}

impl Extend<PatchOperation> for PatchOperations {
    fn extend<T: IntoIterator<Item = PatchOperation>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for PatchOperations {
    type Item = PatchOperation;
    type IntoIter = std::vec::IntoIter<PatchOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Escape a map key for use as one JSON pointer token
pub fn escape_pointer_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Diff two string maps stored at `prefix`
///
/// Removes come first for keys missing from `new`, then a replace for each
/// changed key and an add for each new key, in key order. Keys outside both
/// maps are never touched. `present` says whether the target object on the
/// server has a map at `prefix` at all; when it has none, the new keys are
/// added as one map since there is nothing to address members of.
pub fn diff_string_map(
    prefix: &str,
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
    present: bool,
) -> PatchOperations {
    let mut ops = PatchOperations::new();
    let prefix = prefix.trim_end_matches('/');

    if old == new {
        return ops;
    }
    if !present {
        if !new.is_empty() {
            ops.push(PatchOperation::Add {
                path: prefix.to_string(),
                value: string_map_value(new),
            });
        }
        return ops;
    }

    for key in old.keys().filter(|k| !new.contains_key(*k)) {
        ops.push(PatchOperation::Remove {
            path: format!("{}/{}", prefix, escape_pointer_token(key)),
        });
    }
    for (key, value) in new {
        let path = format!("{}/{}", prefix, escape_pointer_token(key));
        match old.get(key) {
            Some(prev) if prev == value => {}
            Some(_) => ops.push(PatchOperation::Replace {
                path,
                value: Value::String(value.clone()),
            }),
            None => ops.push(PatchOperation::Add {
                path,
                value: Value::String(value.clone()),
            }),
        }
    }
    ops
}

fn string_map_value(m: &BTreeMap<String, String>) -> Value {
    Value::Object(
        m.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Replace the whole `/spec` of an object
pub fn replace_spec<T: Serialize>(spec: &T) -> Result<PatchOperation> {
    Ok(PatchOperation::Replace {
        path: "/spec".to_string(),
        value: serde_json::to_value(spec)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn diff_emits_removes_then_replaces_and_adds() {
        let old = map(&[("app", "am"), ("team", "infra"), ("gone", "x")]);
        let new = map(&[("app", "alertmanager"), ("team", "infra"), ("tier", "monitoring")]);

        let ops = diff_string_map("/metadata/labels", &old, &new, true);
        let json = serde_json::to_value(&ops).expect("serialize");

        assert_eq!(
            json,
            json!([
                {"op": "remove", "path": "/metadata/labels/gone"},
                {"op": "replace", "path": "/metadata/labels/app", "value": "alertmanager"},
                {"op": "add", "path": "/metadata/labels/tier", "value": "monitoring"},
            ])
        );
    }

    #[test]
    fn diff_escapes_pointer_tokens() {
        let old = map(&[("keep", "1")]);
        let new = map(&[("keep", "1"), ("app.kubernetes.io/name", "prom"), ("a~b", "c")]);

        let ops = diff_string_map("/metadata/annotations/", &old, &new, true);
        let paths: Vec<_> = ops.iter().map(PatchOperation::path).collect();

        assert_eq!(
            paths,
            vec![
                "/metadata/annotations/app.kubernetes.io~1name",
                "/metadata/annotations/a~0b",
            ]
        );
    }

    fn apply(doc: serde_json::Value, ops: &PatchOperations) -> serde_json::Value {
        let mut doc = doc;
        json_patch::patch(&mut doc, &ops.to_json_patch().expect("patch")).expect("apply");
        doc
    }

    #[test]
    fn diff_leaves_untracked_keys_alone() {
        let live = json!({"metadata": {
            "annotations": {"kubectl.kubernetes.io/last-applied-configuration": "{}"},
            "labels": {"app.kubernetes.io/managed-by": "helm", "team": "sre"},
        }});

        let ops = diff_string_map(
            "/metadata/annotations",
            &BTreeMap::new(),
            &map(&[("team", "sre")]),
            true,
        );
        assert_eq!(
            serde_json::to_value(&ops).expect("serialize"),
            json!([{"op": "add", "path": "/metadata/annotations/team", "value": "sre"}])
        );
        let patched = apply(live.clone(), &ops);
        assert_eq!(
            patched["metadata"]["annotations"]["kubectl.kubernetes.io/last-applied-configuration"],
            "{}"
        );

        let ops = diff_string_map(
            "/metadata/labels",
            &map(&[("team", "sre")]),
            &BTreeMap::new(),
            true,
        );
        assert_eq!(
            serde_json::to_value(&ops).expect("serialize"),
            json!([{"op": "remove", "path": "/metadata/labels/team"}])
        );
        let patched = apply(live, &ops);
        assert_eq!(
            patched["metadata"]["labels"],
            json!({"app.kubernetes.io/managed-by": "helm"})
        );
    }

    #[test]
    fn diff_adds_whole_map_when_missing_on_server() {
        let some = map(&[("app", "prom")]);
        let none = BTreeMap::new();

        let ops = diff_string_map("/metadata/labels", &none, &some, false);
        assert_eq!(
            serde_json::to_value(&ops).expect("serialize"),
            json!([{"op": "add", "path": "/metadata/labels", "value": {"app": "prom"}}])
        );
        assert_eq!(
            apply(json!({"metadata": {}}), &ops),
            json!({"metadata": {"labels": {"app": "prom"}}})
        );

        assert!(diff_string_map("/metadata/labels", &some, &none, false).is_empty());
        assert!(diff_string_map("/metadata/labels", &some, &some, true).is_empty());
    }

    #[test]
    fn replace_spec_targets_spec_root() {
        let op = replace_spec(&json!({"replicas": 3})).expect("serialize");
        assert_eq!(op.path(), "/spec");

        let mut ops = PatchOperations::new();
        ops.push(op);
        let body = String::from_utf8(ops.to_json().expect("json")).expect("utf8");
        assert_eq!(
            body,
            r#"[{"op":"replace","path":"/spec","value":{"replicas":3}}]"#
        );
    }

    #[test]
    fn converts_to_typed_json_patch() {
        let mut ops = diff_string_map(
            "/metadata/labels",
            &map(&[("a", "1")]),
            &map(&[("a", "2")]),
            true,
        );
        ops.push(replace_spec(&json!({"groups": []})).expect("serialize"));

        let patch = ops.to_json_patch().expect("valid patch");
        assert_eq!(patch.0.len(), 2);
    }
}
