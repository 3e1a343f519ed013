//! `po_alertmanager`: an Alertmanager cluster

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use po_common::schema::{Block, NestedBlock};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};
use po_crd::{Alertmanager, AlertmanagerSpec};

use super::workload::workload_spec_schema;
use super::MonitoringResource;
use crate::structures::container::{expand_containers, flatten_containers};
use crate::structures::opt_int32;
use crate::structures::resources::{expand_resource_requirements, flatten_resource_requirements};
use crate::structures::security_context::{
    expand_pod_security_context, flatten_pod_security_context,
};
use crate::structures::toleration::{expand_tolerations, flatten_tolerations};
use crate::structures::volume::{
    expand_volume_mounts, expand_volumes, flatten_volume_mounts, flatten_volumes,
    volume_mount_schema,
};

/// Image the operator deploys when none is configured
pub const DEFAULT_BASE_IMAGE: &str = "quay.io/prometheus/alertmanager";

/// Default cluster size
pub const DEFAULT_REPLICAS: i64 = 3;

/// Schema of the Alertmanager `spec` block
pub fn alertmanager_spec_schema() -> Block {
    workload_spec_schema("Alertmanager", DEFAULT_BASE_IMAGE, DEFAULT_REPLICAS)
        .block("volume_mount", NestedBlock::list(volume_mount_schema()))
}

/// Read the Alertmanager `spec` block
pub fn expand_alertmanager_spec(fields: &Fields<'_>) -> Result<AlertmanagerSpec> {
    Ok(AlertmanagerSpec {
        base_image: fields.string("base_image")?,
        image: fields.opt_string("image")?,
        secrets: fields.strings("secrets")?,
        config_maps: fields.strings("config_maps")?,
        external_url: fields.string("external_url")?,
        service_account_name: fields.string("service_account_name")?,
        paused: fields.bool("paused")?,
        replicas: opt_int32(fields, "replicas")?,
        version: fields.string("version")?,
        tag: fields.string("tag")?,
        sha: fields.string("sha")?,
        port_name: fields.string("port_name")?,
        priority_class_name: fields.string("priority_class_name")?,
        listen_local: fields.bool("listen_local")?,
        containers: expand_containers(&fields.blocks("container")?)?,
        init_containers: expand_containers(&fields.blocks("init_container")?)?,
        node_selector: fields.string_map("node_selector")?,
        security_context: fields
            .block("security_context")?
            .map(|b| expand_pod_security_context(&b))
            .transpose()?,
        resources: fields
            .block("resources")?
            .map(|b| expand_resource_requirements(&b))
            .transpose()?,
        volumes: expand_volumes(&fields.blocks("volume")?)?,
        volume_mounts: expand_volume_mounts(&fields.blocks("volume_mount")?)?,
        tolerations: expand_tolerations(&fields.blocks("toleration")?)?,
    })
}

/// Flatten an Alertmanager spec
pub fn flatten_alertmanager_spec(spec: &AlertmanagerSpec) -> AttrValue {
    ObjectBuilder::new()
        .set_nonzero("base_image", spec.base_image.as_str())
        .set_opt("image", spec.image.clone())
        .set_nonzero("secrets", spec.secrets.clone())
        .set_nonzero("config_maps", spec.config_maps.clone())
        .set_nonzero("external_url", spec.external_url.as_str())
        .set_nonzero("service_account_name", spec.service_account_name.as_str())
        .set_nonzero("paused", spec.paused)
        .set_opt("replicas", spec.replicas)
        .set_nonzero("version", spec.version.as_str())
        .set_nonzero("tag", spec.tag.as_str())
        .set_nonzero("sha", spec.sha.as_str())
        .set_nonzero("port_name", spec.port_name.as_str())
        .set_nonzero("priority_class_name", spec.priority_class_name.as_str())
        .set_nonzero("listen_local", spec.listen_local)
        .set_blocks("container", flatten_containers(&spec.containers))
        .set_blocks("init_container", flatten_containers(&spec.init_containers))
        .set_nonzero("node_selector", spec.node_selector.clone())
        .set_block(
            "security_context",
            spec.security_context.as_ref().map(flatten_pod_security_context),
        )
        .set_block(
            "resources",
            spec.resources.as_ref().map(flatten_resource_requirements),
        )
        .set_blocks("volume", flatten_volumes(&spec.volumes))
        .set_blocks("volume_mount", flatten_volume_mounts(&spec.volume_mounts))
        .set_blocks("toleration", flatten_tolerations(&spec.tolerations))
        .build()
}

/// The `po_alertmanager` resource kind
pub struct AlertmanagerResource;

impl MonitoringResource for AlertmanagerResource {
    type Object = Alertmanager;
    type Spec = AlertmanagerSpec;

    const KIND: &'static str = "Alertmanager";
    const NAME: &'static str = "alertmanager";

    fn spec_schema() -> Block {
        alertmanager_spec_schema()
    }

    fn expand_spec(fields: &Fields<'_>) -> Result<AlertmanagerSpec> {
        expand_alertmanager_spec(fields)
    }

    fn flatten_spec(spec: &AlertmanagerSpec) -> AttrValue {
        flatten_alertmanager_spec(spec)
    }

    fn new_object(metadata: ObjectMeta, spec: AlertmanagerSpec) -> Alertmanager {
        Alertmanager { metadata, spec }
    }

    fn spec_of(object: &Alertmanager) -> &AlertmanagerSpec {
        &object.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec_config() -> AttrValue {
        AttrValue::from(json!({
            "base_image": "quay.io/prometheus/alertmanager",
            "version": "v0.27.0",
            "replicas": 3,
            "secrets": ["alertmanager-tls"],
            "external_url": "https://alerts.example.com",
            "service_account_name": "alertmanager",
            "listen_local": true,
            "node_selector": {"kubernetes.io/os": "linux"},
            "container": [{
                "name": "config-reloader",
                "image": "quay.io/prometheus-operator/prometheus-config-reloader:v0.75.0",
                "args": ["--watch-interval=30s"],
            }],
            "security_context": [{"fs_group": 2000, "run_as_non_root": true, "run_as_user": 1000}],
            "resources": [{"requests": [{"memory": "200Mi"}]}],
            "volume": [{"name": "tls", "secret": [{"secret_name": "alertmanager-tls"}]}],
            "volume_mount": [{"name": "tls", "mount_path": "/etc/tls", "read_only": true}],
            "toleration": [{"key": "dedicated", "operator": "Equal", "value": "monitoring", "effect": "NoSchedule"}],
        }))
    }

    #[test]
    fn spec_round_trip() {
        let config = spec_config();
        let fields = Fields::new(&config, "spec.0").expect("object");

        let spec = expand_alertmanager_spec(&fields).expect("expand");
        assert_eq!(spec.replicas, Some(3));
        assert!(spec.listen_local);
        assert_eq!(spec.containers[0].name, "config-reloader");
        assert_eq!(spec.volume_mounts[0].mount_path, "/etc/tls");
        assert_eq!(spec.image, None);

        assert_eq!(flatten_alertmanager_spec(&spec), config);
    }

    #[test]
    fn wire_format_uses_operator_names() {
        let config = spec_config();
        let fields = Fields::new(&config, "spec.0").expect("object");
        let spec = expand_alertmanager_spec(&fields).expect("expand");

        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["baseImage"], "quay.io/prometheus/alertmanager");
        assert_eq!(json["externalUrl"], "https://alerts.example.com");
        assert_eq!(json["volumeMounts"][0]["mountPath"], "/etc/tls");
        assert!(json.get("paused").is_none());
        assert!(json.get("image").is_none());
    }

    #[test]
    fn explicit_zero_replicas_is_kept() {
        let config = AttrValue::from(json!({"replicas": 0}));
        let fields = Fields::new(&config, "spec.0").expect("object");
        let spec = expand_alertmanager_spec(&fields).expect("expand");
        assert_eq!(spec.replicas, Some(0));
    }

    #[test]
    fn schema_has_volume_mounts() {
        let schema = alertmanager_spec_schema();
        assert!(schema.blocks.contains_key("volume_mount"));
        assert!(schema.blocks.contains_key("container"));
    }
}
