//! `po_prometheus_rule`: recording and alerting rules

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use po_common::schema::{Block, NestedBlock};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};
use po_crd::{PrometheusRule, PrometheusRuleSpec};

use super::MonitoringResource;
use crate::structures::rules::{expand_rule_groups, flatten_rule_groups, rule_group_schema};

/// Schema of the PrometheusRule `spec` block
pub fn prometheus_rule_spec_schema() -> Block {
    let mut groups = rule_group_schema();
    groups.description = "Content of Prometheus rule file".to_string();
    Block::new("Spec defines the specification of the desired behavior of the PrometheusRule")
        .block("groups", NestedBlock::list(groups))
}

/// Read the PrometheusRule `spec` block
pub fn expand_prometheus_rule_spec(fields: &Fields<'_>) -> Result<PrometheusRuleSpec> {
    Ok(PrometheusRuleSpec {
        groups: expand_rule_groups(&fields.blocks("groups")?)?,
    })
}

/// Flatten a PrometheusRule spec
pub fn flatten_prometheus_rule_spec(spec: &PrometheusRuleSpec) -> AttrValue {
    ObjectBuilder::new()
        .set_blocks("groups", flatten_rule_groups(&spec.groups))
        .build()
}

/// The `po_prometheus_rule` resource kind
pub struct PrometheusRuleResource;

impl MonitoringResource for PrometheusRuleResource {
    type Object = PrometheusRule;
    type Spec = PrometheusRuleSpec;

    const KIND: &'static str = "PrometheusRule";
    const NAME: &'static str = "prometheus_rule";

    fn spec_schema() -> Block {
        prometheus_rule_spec_schema()
    }

    fn expand_spec(fields: &Fields<'_>) -> Result<PrometheusRuleSpec> {
        expand_prometheus_rule_spec(fields)
    }

    fn flatten_spec(spec: &PrometheusRuleSpec) -> AttrValue {
        flatten_prometheus_rule_spec(spec)
    }

    fn new_object(metadata: ObjectMeta, spec: PrometheusRuleSpec) -> PrometheusRule {
        PrometheusRule { metadata, spec }
    }

    fn spec_of(object: &PrometheusRule) -> &PrometheusRuleSpec {
        &object.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spec_round_trip_and_wire_format() {
        let config = AttrValue::from(json!({
            "groups": [{
                "name": "kube-apiserver.rules",
                "rules": [{
                    "alert": "KubeAPIDown",
                    "expr": "absent(up{job=\"apiserver\"} == 1)",
                    "for": "15m",
                    "labels": {"severity": "critical"},
                }],
            }]
        }));
        let fields = Fields::new(&config, "spec.0").expect("object");

        let spec = expand_prometheus_rule_spec(&fields).expect("expand");
        assert_eq!(flatten_prometheus_rule_spec(&spec), config);

        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["groups"][0]["rules"][0]["for"], "15m");
        assert_eq!(json["groups"][0]["rules"][0]["alert"], "KubeAPIDown");
        assert!(json["groups"][0].get("interval").is_none());
    }

    #[test]
    fn empty_spec() {
        let spec = expand_prometheus_rule_spec(
            &Fields::new(&AttrValue::Null, "spec.0").expect("null is empty"),
        )
        .expect("expand");
        assert!(spec.groups.is_empty());
        assert_eq!(flatten_prometheus_rule_spec(&spec), AttrValue::empty_map());
    }
}
