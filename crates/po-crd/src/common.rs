//! Types shared by several resources: TLS settings, basic auth and relabeling

use k8s_openapi::api::core::v1::{ConfigMapKeySelector, SecretKeySelector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to data held in either a Secret or a ConfigMap
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretOrConfigMap {
    /// Secret key containing the data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretKeySelector>,
    /// ConfigMap key containing the data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapKeySelector>,
}

impl SecretOrConfigMap {
    /// Whether neither source is set
    pub fn is_empty(&self) -> bool {
        self.secret.is_none() && self.config_map.is_none()
    }
}

/// TLS settings for scraping targets or reaching Alertmanager
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// CA certificate from a Secret or ConfigMap
    #[serde(default, skip_serializing_if = "SecretOrConfigMap::is_empty")]
    pub ca: SecretOrConfigMap,
    /// Client certificate from a Secret or ConfigMap
    #[serde(default, skip_serializing_if = "SecretOrConfigMap::is_empty")]
    pub cert: SecretOrConfigMap,
    /// Secret key containing the client key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_secret: Option<SecretKeySelector>,
    /// Server name used to verify the target hostname
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server_name: String,
    /// Disable target certificate validation
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub insecure_skip_verify: bool,
    /// Path to the CA certificate inside the Prometheus container
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_file: String,
    /// Path to the client certificate inside the Prometheus container
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert_file: String,
    /// Path to the client key inside the Prometheus container
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_file: String,
}

/// Basic authentication credentials read from Secrets
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BasicAuth {
    /// Secret key containing the username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<SecretKeySelector>,
    /// Secret key containing the password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretKeySelector>,
}

/// A Prometheus relabeling rule
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelabelConfig {
    /// Labels whose values are concatenated and matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_labels: Vec<String>,
    /// Separator between concatenated source label values
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub separator: String,
    /// Label written by replace actions
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_label: String,
    /// Regular expression matched against the extracted value
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub regex: String,
    /// Modulus applied to the hash of the source label values
    #[serde(default, skip_serializing_if = "crate::is_zero")]
    pub modulus: u64,
    /// Replacement value for replace actions
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub replacement: String,
    /// Action performed on a match
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tls_config_uses_operator_field_names() {
        let tls = TlsConfig {
            ca: SecretOrConfigMap {
                config_map: Some(ConfigMapKeySelector {
                    name: "ca-bundle".to_string(),
                    key: "ca.crt".to_string(),
                    ..Default::default()
                }),
                secret: None,
            },
            key_secret: Some(SecretKeySelector {
                name: "client".to_string(),
                key: "tls.key".to_string(),
                ..Default::default()
            }),
            insecure_skip_verify: true,
            ca_file: "/etc/ca.crt".to_string(),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&tls).expect("serialize"),
            json!({
                "ca": {"configMap": {"name": "ca-bundle", "key": "ca.crt"}},
                "keySecret": {"name": "client", "key": "tls.key"},
                "insecureSkipVerify": true,
                "caFile": "/etc/ca.crt",
            })
        );
    }

    #[test]
    fn relabel_config_omits_zero_values() {
        let rc: RelabelConfig = serde_json::from_value(json!({
            "sourceLabels": ["__meta_kubernetes_pod_name"],
            "targetLabel": "pod",
        }))
        .expect("deserialize");

        assert_eq!(rc.modulus, 0);
        assert_eq!(
            serde_json::to_value(&rc).expect("serialize"),
            json!({"sourceLabels": ["__meta_kubernetes_pod_name"], "targetLabel": "pod"})
        );
    }
}
