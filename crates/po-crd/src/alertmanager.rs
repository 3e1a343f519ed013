//! Alertmanager custom resource

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, PodSecurityContext, ResourceRequirements, Toleration, Volume, VolumeMount,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of an Alertmanager cluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.coreos.com",
    version = "v1",
    kind = "Alertmanager",
    plural = "alertmanagers",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AlertmanagerSpec {
    /// Image used when `image` is unset
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_image: String,
    /// Full image reference, overrides base image, version, tag and sha
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Secrets mounted into the Alertmanager pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
    /// ConfigMaps mounted into the Alertmanager pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_maps: Vec<String>,
    /// URL Alertmanager is reachable under from outside
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_url: String,
    /// Service account the pods run as
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_name: String,
    /// Stop reconciliation of the underlying StatefulSet
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,
    /// Number of Alertmanager instances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Alertmanager version
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
    /// Resource requests and limits of the Alertmanager container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Extra volumes of the pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    /// Extra mounts of the Alertmanager container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    /// Tolerations of the pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;
    use serde_json::json;

    #[test]
    fn resource_identity() {
        assert_eq!(Alertmanager::group(&()), "monitoring.coreos.com");
        assert_eq!(Alertmanager::version(&()), "v1");
        assert_eq!(Alertmanager::kind(&()), "Alertmanager");
        assert_eq!(Alertmanager::plural(&()), "alertmanagers");
    }

    #[test]
    fn spec_serializes_only_set_fields() {
        let spec = AlertmanagerSpec {
            base_image: "quay.io/prometheus/alertmanager".to_string(),
            replicas: Some(3),
            external_url: "https://alerts.example.com".to_string(),
            node_selector: BTreeMap::from([("role".to_string(), "monitoring".to_string())]),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&spec).expect("serialize"),
            json!({
                "baseImage": "quay.io/prometheus/alertmanager",
                "replicas": 3,
                "externalUrl": "https://alerts.example.com",
                "nodeSelector": {"role": "monitoring"},
            })
        );
    }

    #[test]
    fn tolerates_unknown_fields_from_server() {
        let am: Alertmanager = serde_json::from_value(json!({
            "apiVersion": "monitoring.coreos.com/v1",
            "kind": "Alertmanager",
            "metadata": {"name": "main", "namespace": "monitoring"},
            "spec": {"replicas": 1, "retention": "120h"},
            "status": {"availableReplicas": 1},
        }))
        .expect("deserialize");

        assert_eq!(am.spec.replicas, Some(1));
        assert_eq!(am.metadata.name.as_deref(), Some("main"));
    }
}
