//! Standard object metadata shared by every resource

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use po_common::patch::{diff_string_map, PatchOperations};
use po_common::schema::{AttrType, Attribute, Block, Validator};
use po_common::validation::is_internal_key;
use po_common::{AttrValue, Fields, ObjectBuilder, Result};

/// Namespace objects are created in when configuration does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Schema of the `metadata` block of a namespaced object
///
/// With `generatable`, the server may generate the name from a prefix
/// (`generate_name`), which conflicts with an explicit `name`.
pub fn namespaced_metadata_schema(object: &str, generatable: bool) -> Block {
    let mut name = Attribute::optional_computed(
        AttrType::String,
        format!("Name of the {}, must be unique. Cannot be updated.", object),
    )
    .force_new()
    .validator(Validator::Name);
    if generatable {
        name = name.conflicts_with(&["generate_name"]);
    }

    let block = Block::new(format!("Standard {}'s metadata.", object))
        .attribute(
            "annotations",
            Attribute::optional(
                AttrType::StringMap,
                format!(
                    "An unstructured key value map stored with the {} that may be used to store arbitrary metadata.",
                    object
                ),
            )
            .validator(Validator::Annotations),
        )
        .attribute(
            "labels",
            Attribute::optional(
                AttrType::StringMap,
                format!(
                    "Map of string keys and values that can be used to organize and categorize (scope and select) the {}.",
                    object
                ),
            )
            .validator(Validator::Labels),
        )
        .attribute("name", name)
        .attribute(
            "namespace",
            Attribute::optional(
                AttrType::String,
                format!("Namespace defines the space within which name of the {} must be unique.", object),
            )
            .force_new()
            .default_value(DEFAULT_NAMESPACE),
        )
        .attribute(
            "generation",
            Attribute::computed(
                AttrType::Int,
                "A sequence number representing a specific generation of the desired state.",
            ),
        )
        .attribute(
            "resource_version",
            Attribute::computed(
                AttrType::String,
                "An opaque value that represents the internal version of this object.",
            ),
        )
        .attribute(
            "self_link",
            Attribute::computed(AttrType::String, "A URL representing this object."),
        )
        .attribute(
            "uid",
            Attribute::computed(
                AttrType::String,
                "The unique in time and space value for this object.",
            ),
        );

    if generatable {
        block.attribute(
            "generate_name",
            Attribute::optional(
                AttrType::String,
                "Prefix, used by the server, to generate a unique name ONLY IF the `name` field has not been provided.",
            )
            .force_new()
            .conflicts_with(&["name"]),
        )
    } else {
        block
    }
}

/// Read the configured metadata
///
/// The namespace falls back to [`DEFAULT_NAMESPACE`].
pub fn expand_metadata(fields: &Fields<'_>) -> Result<ObjectMeta> {
    Ok(ObjectMeta {
        annotations: fields.opt_string_map("annotations")?,
        labels: fields.opt_string_map("labels")?,
        generate_name: fields.opt_string("generate_name")?,
        name: fields.opt_string("name")?,
        namespace: Some(
            fields
                .opt_string("namespace")?
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        ),
        ..Default::default()
    })
}

/// Flatten observed metadata
///
/// Labels and annotations the cluster manages itself are dropped unless
/// `configured` (the metadata block from configuration or prior state)
/// already tracks them.
pub fn flatten_metadata(meta: &ObjectMeta, configured: &AttrValue) -> AttrValue {
    let annotations = without_internal_keys(
        meta.annotations.as_ref(),
        configured.get("annotations").unwrap_or(&AttrValue::Null),
    );
    let labels = without_internal_keys(
        meta.labels.as_ref(),
        configured.get("labels").unwrap_or(&AttrValue::Null),
    );

    ObjectBuilder::new()
        .set_nonzero("annotations", annotations)
        .set_nonzero("labels", labels)
        .set_opt("generate_name", meta.generate_name.clone())
        .set_opt("name", meta.name.clone())
        .set_opt("namespace", meta.namespace.clone())
        .set_opt("generation", meta.generation)
        .set_opt("resource_version", meta.resource_version.clone())
        .set_opt("self_link", meta.self_link.clone())
        .set_opt("uid", meta.uid.clone())
        .build()
}

fn without_internal_keys(
    observed: Option<&BTreeMap<String, String>>,
    configured: &AttrValue,
) -> BTreeMap<String, String> {
    observed
        .into_iter()
        .flatten()
        .filter(|(k, _)| !is_internal_key(k) || configured.get(k).is_some())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Patch operations for label and annotation changes between two metadata blocks
///
/// `live` is the metadata of the object as currently stored; keys it carries
/// that neither block tracks are left untouched.
pub fn patch_metadata(
    prior: &Fields<'_>,
    planned: &Fields<'_>,
    live: &ObjectMeta,
) -> Result<PatchOperations> {
    let mut ops = PatchOperations::new();
    ops.extend(diff_string_map(
        "/metadata/annotations",
        &prior.string_map("annotations")?,
        &planned.string_map("annotations")?,
        live.annotations.is_some(),
    ));
    ops.extend(diff_string_map(
        "/metadata/labels",
        &prior.string_map("labels")?,
        &planned.string_map("labels")?,
        live.labels.is_some(),
    ));
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use po_common::patch::PatchOperation;
    use serde_json::json;

    #[test]
    fn generatable_schema_declares_conflict() {
        let schema = namespaced_metadata_schema("alertmanager", true);
        assert_eq!(schema.attributes["name"].conflicts_with, vec!["generate_name"]);
        assert!(schema.attributes["generate_name"].force_new);
        assert!(schema.description.contains("alertmanager"));

        let plain = namespaced_metadata_schema("prometheus", false);
        assert!(!plain.attributes.contains_key("generate_name"));
        assert!(plain.attributes["name"].conflicts_with.is_empty());
    }

    #[test]
    fn name_and_generate_name_conflict() {
        let schema = namespaced_metadata_schema("prometheus rule", true);
        let config = AttrValue::from(json!({"name": "rules", "generate_name": "rules-"}));
        let errors = schema.validate(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn expand_defaults_namespace() {
        let config = AttrValue::from(json!({
            "name": "main",
            "labels": {"app": "alertmanager"},
            "annotations": {},
        }));
        let fields = Fields::new(&config, "metadata.0").expect("object");

        let meta = expand_metadata(&fields).expect("expand");
        assert_eq!(meta.name.as_deref(), Some("main"));
        assert_eq!(meta.namespace.as_deref(), Some(DEFAULT_NAMESPACE));
        assert_eq!(meta.annotations, None);
        assert_eq!(
            meta.labels,
            Some(BTreeMap::from([("app".to_string(), "alertmanager".to_string())]))
        );
    }

    #[test]
    fn flatten_drops_untracked_internal_keys() {
        let meta = ObjectMeta {
            name: Some("main".to_string()),
            namespace: Some("monitoring".to_string()),
            uid: Some("8f1c".to_string()),
            generation: Some(2),
            annotations: Some(BTreeMap::from([
                (
                    "kubectl.kubernetes.io/last-applied-configuration".to_string(),
                    "{}".to_string(),
                ),
                ("team".to_string(), "infra".to_string()),
            ])),
            labels: Some(BTreeMap::from([(
                "app.kubernetes.io/managed-by".to_string(),
                "terraform".to_string(),
            )])),
            ..Default::default()
        };
        let configured = AttrValue::from(json!({
            "labels": {"app.kubernetes.io/managed-by": "terraform"},
        }));

        let flat = flatten_metadata(&meta, &configured);
        assert_eq!(
            flat,
            AttrValue::from(json!({
                "annotations": {"team": "infra"},
                "labels": {"app.kubernetes.io/managed-by": "terraform"},
                "name": "main",
                "namespace": "monitoring",
                "generation": 2,
                "uid": "8f1c",
            }))
        );
    }

    #[test]
    fn patch_covers_labels_and_annotations() {
        let prior = AttrValue::from(json!({
            "annotations": {"owner": "a"},
            "labels": {"app": "prom", "old": "x"},
        }));
        let planned = AttrValue::from(json!({
            "annotations": {"owner": "b"},
            "labels": {"app": "prom"},
        }));

        let live = ObjectMeta {
            annotations: Some(BTreeMap::from([("owner".to_string(), "a".to_string())])),
            labels: Some(BTreeMap::from([
                ("app".to_string(), "prom".to_string()),
                ("old".to_string(), "x".to_string()),
            ])),
            ..Default::default()
        };
        let ops = patch_metadata(
            &Fields::new(&prior, "metadata.0").expect("object"),
            &Fields::new(&planned, "metadata.0").expect("object"),
            &live,
        )
        .expect("diff");

        let ops: Vec<_> = ops.into_iter().collect();
        assert_eq!(
            ops,
            vec![
                PatchOperation::Replace {
                    path: "/metadata/annotations/owner".to_string(),
                    value: json!("b"),
                },
                PatchOperation::Remove {
                    path: "/metadata/labels/old".to_string(),
                },
            ]
        );
    }

    #[test]
    fn patch_creates_missing_label_map() {
        let prior = AttrValue::from(json!({"name": "main"}));
        let planned = AttrValue::from(json!({"name": "main", "labels": {"team": "sre"}}));
        let live = ObjectMeta {
            annotations: Some(BTreeMap::from([(
                "kubectl.kubernetes.io/last-applied-configuration".to_string(),
                "{}".to_string(),
            )])),
            ..Default::default()
        };

        let ops = patch_metadata(
            &Fields::new(&prior, "metadata.0").expect("object"),
            &Fields::new(&planned, "metadata.0").expect("object"),
            &live,
        )
        .expect("diff");

        let ops: Vec<_> = ops.into_iter().collect();
        assert_eq!(
            ops,
            vec![PatchOperation::Add {
                path: "/metadata/labels".to_string(),
                value: json!({"team": "sre"}),
            }]
        );
    }
}
