//! References to a single key of a Secret or ConfigMap

use k8s_openapi::api::core::v1::{ConfigMapKeySelector, SecretKeySelector};
use po_common::schema::{AttrType, Attribute, Block};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};

/// Schema of a Secret key reference
pub fn secret_key_selector_schema() -> Block {
    Block::new("Selects a key of a Secret in the object's namespace")
        .attribute(
            "key",
            Attribute::optional(AttrType::String, "The key of the secret to select from."),
        )
        .attribute(
            "name",
            Attribute::optional(AttrType::String, "Name of the referent."),
        )
        .attribute(
            "optional",
            Attribute::optional(
                AttrType::Bool,
                "Specify whether the Secret or its key must be defined.",
            ),
        )
}

/// Schema of a ConfigMap key reference
pub fn config_map_key_selector_schema() -> Block {
    Block::new("Selects a key of a ConfigMap in the object's namespace")
        .attribute(
            "key",
            Attribute::optional(AttrType::String, "The key to select."),
        )
        .attribute(
            "name",
            Attribute::optional(AttrType::String, "Name of the referent."),
        )
        .attribute(
            "optional",
            Attribute::optional(
                AttrType::Bool,
                "Specify whether the ConfigMap or its key must be defined.",
            ),
        )
}

/// Read a Secret key reference
pub fn expand_secret_key_ref(fields: &Fields<'_>) -> Result<SecretKeySelector> {
    Ok(SecretKeySelector {
        key: fields.string("key")?,
        name: fields.string("name")?,
        optional: fields.opt_bool("optional")?,
    })
}

/// Flatten a Secret key reference
pub fn flatten_secret_key_ref(selector: &SecretKeySelector) -> AttrValue {
    ObjectBuilder::new()
        .set_nonzero("key", selector.key.as_str())
        .set_nonzero("name", selector.name.as_str())
        .set_opt("optional", selector.optional)
        .build()
}

/// Read a ConfigMap key reference
pub fn expand_config_map_key_ref(fields: &Fields<'_>) -> Result<ConfigMapKeySelector> {
    Ok(ConfigMapKeySelector {
        key: fields.string("key")?,
        name: fields.string("name")?,
        optional: fields.opt_bool("optional")?,
    })
}

/// Flatten a ConfigMap key reference
pub fn flatten_config_map_key_ref(selector: &ConfigMapKeySelector) -> AttrValue {
    ObjectBuilder::new()
        .set_nonzero("key", selector.key.as_str())
        .set_nonzero("name", selector.name.as_str())
        .set_opt("optional", selector.optional)
        .build()
}
