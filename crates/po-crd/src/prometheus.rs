//! Prometheus custom resource

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, PodSecurityContext, ResourceRequirements, Toleration, Volume,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::TlsConfig;

/// Desired state of a Prometheus server
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.coreos.com",
    version = "v1",
    kind = "Prometheus",
    plural = "prometheuses",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusSpec {
    /// Image used when `image` is unset
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_image: String,
    /// Full image reference, overrides base image, version, tag and sha
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Secrets mounted into the Prometheus pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
    /// ConfigMaps mounted into the Prometheus pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_maps: Vec<String>,
    /// URL Prometheus is reachable under from outside
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_url: String,
    /// Service account the pods run as
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,
    /// Stop reconciliation of the underlying StatefulSet
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,
    /// Number of Prometheus instances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Prometheus version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Image tag, overrides version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    /// Image digest, overrides version and tag
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha: String,
    /// Name of the web port
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub port_name: String,
    /// Priority class assigned to the pods
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority_class_name: String,
    /// Listen on loopback only
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub listen_local: bool,
    /// How long samples are kept
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub retention: String,
    /// Maximum size of stored blocks
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub retention_size: String,
    /// Extra containers merged into the pod template
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<Container>,
    /// Init containers merged into the pod template
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init_containers: Vec<Container>,
    /// Node selector for the pods
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    /// Pod level security settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<PodSecurityContext>,
    /// Resource requests and limits of the Prometheus container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Extra volumes of the pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    /// Tolerations of the pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
    /// ServiceMonitors selected for target discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_monitor_selector: Option<LabelSelector>,
    /// Namespaces searched for ServiceMonitors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_monitor_namespace_selector: Option<LabelSelector>,
    /// PodMonitors selected for target discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_monitor_selector: Option<LabelSelector>,
    /// Namespaces searched for PodMonitors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_monitor_namespace_selector: Option<LabelSelector>,
    /// PrometheusRules loaded by this server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_selector: Option<LabelSelector>,
    /// Namespaces searched for PrometheusRules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_namespace_selector: Option<LabelSelector>,
    /// Where alerts are sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerting: Option<AlertingSpec>,
}

/// Alertmanagers a Prometheus server sends alerts to
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertingSpec {
    /// Alertmanager endpoints
    #[serde(default)]
    pub alertmanagers: Vec<AlertmanagerEndpoints>,
}

/// A Service fronting Alertmanager instances
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertmanagerEndpoints {
    /// Namespace of the Service
    pub namespace: String,
    /// Name of the Service
    pub name: String,
    /// Service port, by name or number
    pub port: IntOrString,
    /// HTTP scheme used to reach Alertmanager
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    /// Prefix prepended to the push path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path_prefix: String,
    /// TLS settings for the connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
    /// File holding the bearer token used for authentication
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bearer_token_file: String,
    /// Alertmanager API version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;
    use serde_json::json;

    #[test]
    fn resource_identity() {
        assert_eq!(Prometheus::kind(&()), "Prometheus");
        assert_eq!(Prometheus::plural(&()), "prometheuses");
        assert_eq!(Prometheus::api_version(&()), "monitoring.coreos.com/v1");
    }

    #[test]
    fn alerting_endpoint_port_accepts_name_or_number() {
        let alerting: AlertingSpec = serde_json::from_value(json!({
            "alertmanagers": [
                {"namespace": "monitoring", "name": "alertmanager", "port": "web"},
                {"namespace": "monitoring", "name": "am-raw", "port": 9093, "apiVersion": "v2"},
            ]
        }))
        .expect("deserialize");

        assert_eq!(alerting.alertmanagers[0].port, IntOrString::String("web".to_string()));
        assert_eq!(alerting.alertmanagers[1].port, IntOrString::Int(9093));
        assert_eq!(alerting.alertmanagers[1].api_version, "v2");
    }

    #[test]
    fn selectors_serialize_in_camel_case() {
        let spec = PrometheusSpec {
            retention: "24h".to_string(),
            service_monitor_selector: Some(LabelSelector {
                match_labels: Some(BTreeMap::from([("team".to_string(), "infra".to_string())])),
                ..Default::default()
            }),
            rule_namespace_selector: Some(LabelSelector::default()),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&spec).expect("serialize"),
            json!({
                "retention": "24h",
                "serviceMonitorSelector": {"matchLabels": {"team": "infra"}},
                "ruleNamespaceSelector": {},
            })
        );
    }
}
