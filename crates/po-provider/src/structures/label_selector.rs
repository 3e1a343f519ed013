//! Label selectors

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use po_common::schema::{AttrType, Attribute, Block, NestedBlock, Validator};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};

/// Schema of a label selector
pub fn label_selector_schema() -> Block {
    Block::new("A label query over a set of resources")
        .attribute(
            "match_labels",
            Attribute::optional(
                AttrType::StringMap,
                "A map of {key,value} pairs. A single {key,value} in the matchLabels map is equivalent to an element of `match_expressions`, whose key field is \"key\", the operator is \"In\", and the values array contains only \"value\".",
            )
            .validator(Validator::Labels),
        )
        .block(
            "match_expressions",
            NestedBlock::list(
                Block::new("A label selector requirement")
                    .attribute(
                        "key",
                        Attribute::optional(
                            AttrType::String,
                            "The label key that the selector applies to.",
                        ),
                    )
                    .attribute(
                        "operator",
                        Attribute::optional(
                            AttrType::String,
                            "A key's relationship to a set of values.",
                        )
                        .validator(Validator::OneOf(&["In", "NotIn", "Exists", "DoesNotExist"])),
                    )
                    .attribute(
                        "values",
                        Attribute::optional(
                            AttrType::StringSet,
                            "An array of string values. Must be empty when the operator is Exists or DoesNotExist.",
                        ),
                    ),
            ),
        )
}

/// Read a label selector
pub fn expand_label_selector(fields: &Fields<'_>) -> Result<LabelSelector> {
    let match_expressions = fields
        .blocks("match_expressions")?
        .iter()
        .map(|expr| {
            Ok(LabelSelectorRequirement {
                key: expr.string("key")?,
                operator: expr.string("operator")?,
                values: expr.opt_strings("values")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LabelSelector {
        match_labels: fields.opt_string_map("match_labels")?,
        match_expressions: (!match_expressions.is_empty()).then_some(match_expressions),
    })
}

/// Flatten a label selector
pub fn flatten_label_selector(selector: &LabelSelector) -> AttrValue {
    let expressions = selector
        .match_expressions
        .iter()
        .flatten()
        .map(|expr| {
            ObjectBuilder::new()
                .set_nonzero("key", expr.key.as_str())
                .set_nonzero("operator", expr.operator.as_str())
                .set_nonzero("values", expr.values.clone().unwrap_or_default())
                .build()
        })
        .collect();

    ObjectBuilder::new()
        .set_nonzero("match_labels", selector.match_labels.clone().unwrap_or_default())
        .set_blocks("match_expressions", expressions)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip() {
        let config = AttrValue::from(json!({
            "match_labels": {"team": "infra"},
            "match_expressions": [
                {"key": "tier", "operator": "In", "values": ["backend", "frontend"]},
                {"key": "canary", "operator": "DoesNotExist"},
            ],
        }));
        let fields = Fields::new(&config, "spec.0.selector.0").expect("object");

        let selector = expand_label_selector(&fields).expect("expand");
        let exprs = selector.match_expressions.as_ref().expect("expressions");
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[1].values, None);

        assert_eq!(flatten_label_selector(&selector), config);
    }

    #[test]
    fn empty_block_selects_everything() {
        let config = AttrValue::empty_map();
        let fields = Fields::new(&config, "spec.0.rule_selector.0").expect("object");

        let selector = expand_label_selector(&fields).expect("expand");
        assert_eq!(selector, LabelSelector::default());
        assert_eq!(flatten_label_selector(&selector), AttrValue::empty_map());
    }

    #[test]
    fn rejects_unknown_operator() {
        let config = AttrValue::from(json!({
            "match_expressions": [{"key": "tier", "operator": "Like"}],
        }));
        let errors = label_selector_schema().validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("match_expressions.0.operator"));
    }
}
