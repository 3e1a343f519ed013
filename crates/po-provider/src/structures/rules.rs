//! Recording and alerting rule groups

use po_common::schema::{AttrType, Attribute, Block, NestedBlock, Validator};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};
use po_crd::{Rule, RuleGroup};

use super::{expand_int_or_string, flatten_int_or_string};

/// Schema of one rule
pub fn rule_schema() -> Block {
    Block::new("Rule describes an alerting or recording rule")
        .attribute(
            "record",
            Attribute::optional(AttrType::String, "Name of the time series to output to. Must be a valid metric name."),
        )
        .attribute(
            "alert",
            Attribute::optional(AttrType::String, "Name of the alert. Must be a valid label value."),
        )
        .attribute(
            "expr",
            Attribute::required(AttrType::String, "PromQL expression to evaluate."),
        )
        .attribute(
            "for",
            Attribute::optional(AttrType::String, "Alerts are considered firing once they have been returned for this long."),
        )
        .attribute(
            "labels",
            Attribute::optional(AttrType::StringMap, "Labels to add or overwrite.")
                .validator(Validator::Labels),
        )
        .attribute(
            "annotations",
            Attribute::optional(AttrType::StringMap, "Annotations to add to each alert."),
        )
}

/// Schema of one rule group
pub fn rule_group_schema() -> Block {
    Block::new("RuleGroup is a list of sequentially evaluated recording and alerting rules")
        .attribute("name", Attribute::required(AttrType::String, "Name of the rule group."))
        .attribute(
            "interval",
            Attribute::optional(AttrType::String, "Interval determines how often rules in the group are evaluated."),
        )
        .block("rules", NestedBlock::list(rule_schema()))
}

fn expand_rule(fields: &Fields<'_>) -> Result<Rule> {
    Ok(Rule {
        record: fields.string("record")?,
        alert: fields.string("alert")?,
        expr: expand_int_or_string(fields.string("expr")?),
        for_: fields.string("for")?,
        labels: fields.string_map("labels")?,
        annotations: fields.string_map("annotations")?,
    })
}

/// Read a list of rule groups
pub fn expand_rule_groups(blocks: &[Fields<'_>]) -> Result<Vec<RuleGroup>> {
    blocks
        .iter()
        .map(|group| {
            let rules = group
                .blocks("rules")?
                .iter()
                .map(expand_rule)
                .collect::<Result<_>>()?;
            Ok(RuleGroup {
                name: group.string("name")?,
                interval: group.string("interval")?,
                rules,
            })
        })
        .collect()
}

fn flatten_rule(rule: &Rule) -> AttrValue {
    ObjectBuilder::new()
        .set_nonzero("record", rule.record.as_str())
        .set_nonzero("alert", rule.alert.as_str())
        .set("expr", flatten_int_or_string(&rule.expr))
        .set_nonzero("for", rule.for_.as_str())
        .set_nonzero("labels", rule.labels.clone())
        .set_nonzero("annotations", rule.annotations.clone())
        .build()
}

/// Flatten a list of rule groups
pub fn flatten_rule_groups(groups: &[RuleGroup]) -> Vec<AttrValue> {
    groups
        .iter()
        .map(|group| {
            ObjectBuilder::new()
                .set("name", group.name.as_str())
                .set_nonzero("interval", group.interval.as_str())
                .set_blocks("rules", group.rules.iter().map(flatten_rule).collect())
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use serde_json::json;

    fn groups(config: &AttrValue) -> Result<Vec<RuleGroup>> {
        let spec = Fields::new(config, "spec.0")?;
        expand_rule_groups(&spec.blocks("groups")?)
    }

    #[test]
    fn rule_groups_round_trip() {
        let config = AttrValue::from(json!({
            "groups": [{
                "name": "node.rules",
                "interval": "1m",
                "rules": [{
                    "record": "instance:node_cpu:rate5m",
                    "expr": "rate(node_cpu_seconds_total[5m])",
                }, {
                    "alert": "NodeDown",
                    "expr": "up{job=\"node\"} == 0",
                    "for": "5m",
                    "labels": {"severity": "critical"},
                    "annotations": {"summary": "Node {{ $labels.instance }} is down"},
                }]
            }]
        }));

        let groups = groups(&config).expect("expand");
        assert_eq!(groups[0].rules.len(), 2);
        assert_eq!(groups[0].rules[1].for_, "5m");

        assert_eq!(
            AttrValue::List(flatten_rule_groups(&groups)),
            *config.get("groups").expect("groups")
        );
    }

    #[test]
    fn numeric_expressions_are_sent_as_numbers() {
        let config = AttrValue::from(json!({
            "groups": [{"name": "always", "rules": [{"alert": "Watchdog", "expr": "1"}]}]
        }));

        let groups = groups(&config).expect("expand");
        assert_eq!(groups[0].rules[0].expr, IntOrString::Int(1));

        let flat = flatten_rule_groups(&groups);
        let rules = flat[0].get("rules").and_then(AttrValue::as_list).expect("rules");
        assert_eq!(rules[0].get("expr"), Some(&AttrValue::from("1")));
    }

    #[test]
    fn rule_labels_are_validated() {
        let errors = rule_schema().validate(&AttrValue::from(json!({
            "expr": "up == 0",
            "labels": {"bad key": "x"},
        })));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("labels"));
    }
}
