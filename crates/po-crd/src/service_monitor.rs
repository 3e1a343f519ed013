//! ServiceMonitor custom resource

use k8s_openapi::api::core::v1::SecretKeySelector;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{BasicAuth, RelabelConfig, TlsConfig};

/// Services scraped by Prometheus
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.coreos.com",
    version = "v1",
    kind = "ServiceMonitor",
    plural = "servicemonitors",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMonitorSpec {
    /// Service label whose value becomes the job label
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job_label: String,
    /// Service labels copied onto scraped series
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_labels: Vec<String>,
    /// Pod labels copied onto scraped series
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pod_target_labels: Vec<String>,
    /// Scrape endpoints of the selected Services
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Services to scrape
    #[serde(default)]
    pub selector: LabelSelector,
    /// Namespaces the Services are selected from
    #[serde(default, skip_serializing_if = "NamespaceSelector::is_empty")]
    pub namespace_selector: NamespaceSelector,
    /// Per scrape limit on accepted samples
    #[serde(default, skip_serializing_if = "crate::is_zero")]
    pub sample_limit: u64,
}

/// Namespaces to select Services from
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {
    /// Select all namespaces
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub any: bool,
    /// Explicit namespace names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_names: Vec<String>,
}

impl NamespaceSelector {
    /// Whether the selector restricts nothing, meaning the object's own namespace
    pub fn is_empty(&self) -> bool {
        !self.any && self.match_names.is_empty()
    }
}

/// One scrapeable port of a Service
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Named Service port
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub port: String,
    /// HTTP path to scrape
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// HTTP scheme to scrape with
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    /// Scrape interval
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,
    /// Timeout after which a scrape is abandoned
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scrape_timeout: String,
    /// TLS settings for scraping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
    /// File holding the bearer token used for scraping
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bearer_token_file: String,
    /// Secret key holding the bearer token used for scraping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token_secret: Option<SecretKeySelector>,
    /// Keep target labels on conflict
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub honor_labels: bool,
    /// Keep timestamps exposed by the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honor_timestamps: Option<bool>,
    /// Basic authentication for scraping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
    /// Relabeling applied to samples before ingestion
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_relabelings: Vec<RelabelConfig>,
    /// Relabeling applied to targets before scraping
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relabelings: Vec<RelabelConfig>,
    /// Proxy used for scraping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;
    use serde_json::json;

    #[test]
    fn resource_identity() {
        assert_eq!(ServiceMonitor::kind(&()), "ServiceMonitor");
        assert_eq!(ServiceMonitor::plural(&()), "servicemonitors");
    }

    #[test]
    fn selector_is_always_sent() {
        let spec = ServiceMonitorSpec {
            endpoints: vec![Endpoint {
                port: "web".to_string(),
                honor_timestamps: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&spec).expect("serialize"),
            json!({
                "endpoints": [{"port": "web", "honorTimestamps": true}],
                "selector": {},
            })
        );
    }

    #[test]
    fn namespace_selector_any() {
        let spec: ServiceMonitorSpec = serde_json::from_value(json!({
            "endpoints": [],
            "selector": {"matchLabels": {"app": "api"}},
            "namespaceSelector": {"any": true},
            "sampleLimit": 5000,
        }))
        .expect("deserialize");

        assert!(spec.namespace_selector.any);
        assert!(!spec.namespace_selector.is_empty());
        assert_eq!(spec.sample_limit, 5000);
    }
}
