//! PrometheusRule custom resource

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Recording and alerting rules loaded by Prometheus
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.coreos.com",
    version = "v1",
    kind = "PrometheusRule",
    plural = "prometheusrules",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusRuleSpec {
    /// Rule groups, evaluated independently
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<RuleGroup>,
}

/// A named group of rules sharing an evaluation interval
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroup {
    /// Group name, unique within the resource
    pub name: String,
    /// Evaluation interval
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,
    /// Rules of the group
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A recording or alerting rule
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Series name written by a recording rule
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub record: String,
    /// Alert name of an alerting rule
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alert: String,
    /// PromQL expression
    pub expr: IntOrString,
    /// How long the expression must hold before the alert fires
    #[serde(rename = "for", default, skip_serializing_if = "String::is_empty")]
    pub for_: String,
    /// Labels added to the result
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations added to alerts
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;
    use serde_json::json;

    #[test]
    fn resource_identity() {
        assert_eq!(PrometheusRule::kind(&()), "PrometheusRule");
        assert_eq!(PrometheusRule::plural(&()), "prometheusrules");
    }

    #[test]
    fn rule_uses_for_keyword_on_the_wire() {
        let rule = Rule {
            record: String::new(),
            alert: "HighErrorRate".to_string(),
            expr: IntOrString::String("rate(errors_total[5m]) > 0.1".to_string()),
            for_: "10m".to_string(),
            labels: BTreeMap::from([("severity".to_string(), "page".to_string())]),
            annotations: BTreeMap::new(),
        };

        assert_eq!(
            serde_json::to_value(&rule).expect("serialize"),
            json!({
                "alert": "HighErrorRate",
                "expr": "rate(errors_total[5m]) > 0.1",
                "for": "10m",
                "labels": {"severity": "page"},
            })
        );
    }

    #[test]
    fn numeric_expressions_stay_numeric() {
        let group: RuleGroup = serde_json::from_value(json!({
            "name": "always",
            "rules": [{"alert": "Watchdog", "expr": 1}],
        }))
        .expect("deserialize");

        assert_eq!(group.rules[0].expr, IntOrString::Int(1));
        assert!(group.interval.is_empty());
    }
}
