//! Pod tolerations

use k8s_openapi::api::core::v1::Toleration;
use po_common::schema::{AttrType, Attribute, Block, Validator};
use po_common::{AttrValue, Error, Fields, ObjectBuilder, Result};

/// Schema of one toleration
pub fn toleration_schema() -> Block {
    Block::new("Toleration of a node taint")
        .attribute(
            "effect",
            Attribute::optional(
                AttrType::String,
                "Effect indicates the taint effect to match. Empty means match all taint effects. When specified, allowed values are NoSchedule, PreferNoSchedule and NoExecute.",
            )
            .validator(Validator::OneOf(&["NoSchedule", "PreferNoSchedule", "NoExecute"])),
        )
        .attribute(
            "key",
            Attribute::optional(
                AttrType::String,
                "Key is the taint key that the toleration applies to. Empty means match all taint keys. If the key is empty, operator must be Exists.",
            ),
        )
        .attribute(
            "operator",
            Attribute::optional(
                AttrType::String,
                "Operator represents a key's relationship to the value. Valid operators are Exists and Equal.",
            )
            .default_value("Equal")
            .validator(Validator::OneOf(&["Exists", "Equal"])),
        )
        .attribute(
            "toleration_seconds",
            Attribute::optional(
                AttrType::String,
                "TolerationSeconds represents the period of time the toleration (which must be of effect NoExecute) tolerates the taint.",
            )
            .validator(Validator::NullableInt),
        )
        .attribute(
            "value",
            Attribute::optional(
                AttrType::String,
                "Value is the taint value the toleration matches to. If the operator is Exists, the value should be empty.",
            ),
        )
}

/// Read a list of tolerations
pub fn expand_tolerations(blocks: &[Fields<'_>]) -> Result<Vec<Toleration>> {
    blocks.iter().map(expand_toleration).collect()
}

fn expand_toleration(fields: &Fields<'_>) -> Result<Toleration> {
    let toleration_seconds = fields
        .opt_string("toleration_seconds")?
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                Error::decode(
                    fields.path_of("toleration_seconds"),
                    format!("{:?} is not an integer", s),
                )
            })
        })
        .transpose()?;

    Ok(Toleration {
        effect: fields.opt_string("effect")?,
        key: fields.opt_string("key")?,
        operator: fields.opt_string("operator")?,
        toleration_seconds,
        value: fields.opt_string("value")?,
    })
}

/// Flatten a list of tolerations
pub fn flatten_tolerations(tolerations: &[Toleration]) -> Vec<AttrValue> {
    tolerations
        .iter()
        .map(|t| {
            ObjectBuilder::new()
                .set_opt("effect", t.effect.clone())
                .set_opt("key", t.key.clone())
                .set_opt("operator", t.operator.clone())
                .set_opt("toleration_seconds", t.toleration_seconds.map(|s| s.to_string()))
                .set_opt("value", t.value.clone())
                .build()
        })
        .collect()
}
