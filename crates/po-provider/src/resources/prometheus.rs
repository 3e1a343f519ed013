//! `po_prometheus`: a Prometheus server deployment

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use po_common::schema::{AttrType, Attribute, Block, NestedBlock};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};
use po_crd::{Prometheus, PrometheusSpec};

use super::workload::workload_spec_schema;
use super::MonitoringResource;
use crate::structures::alerting::{alerting_schema, expand_alerting, flatten_alerting};
use crate::structures::container::{expand_containers, flatten_containers};
use crate::structures::label_selector::{
    expand_label_selector, flatten_label_selector, label_selector_schema,
};
use crate::structures::opt_int32;
use crate::structures::resources::{expand_resource_requirements, flatten_resource_requirements};
use crate::structures::security_context::{
    expand_pod_security_context, flatten_pod_security_context,
};
use crate::structures::toleration::{expand_tolerations, flatten_tolerations};
use crate::structures::volume::{expand_volumes, flatten_volumes};

/// Image the operator deploys when none is configured
pub const DEFAULT_BASE_IMAGE: &str = "quay.io/prometheus/prometheus";

/// Default number of replicas
pub const DEFAULT_REPLICAS: i64 = 2;

/// Default time series retention
pub const DEFAULT_RETENTION: &str = "24h";

const SELECTORS: [(&str, &str); 6] = [
    (
        "service_monitor_selector",
        "ServiceMonitors to be selected for target discovery.",
    ),
    (
        "service_monitor_namespace_selector",
        "Namespaces to be selected for ServiceMonitor discovery. If nil, only check own namespace.",
    ),
    (
        "pod_monitor_selector",
        "PodMonitors to be selected for target discovery.",
    ),
    (
        "pod_monitor_namespace_selector",
        "Namespaces to be selected for PodMonitor discovery. If nil, only check own namespace.",
    ),
    (
        "rule_selector",
        "A selector to select which PrometheusRules to mount for loading alerting rules from.",
    ),
    (
        "rule_namespace_selector",
        "Namespaces to be selected for PrometheusRules discovery. If unspecified, only the same namespace as the Prometheus object is in is used.",
    ),
];

/// Schema of the Prometheus `spec` block
pub fn prometheus_spec_schema() -> Block {
    let schema = workload_spec_schema("Prometheus", DEFAULT_BASE_IMAGE, DEFAULT_REPLICAS)
        .attribute(
            "paused",
            Attribute::optional(
                AttrType::Bool,
                "When a Prometheus deployment is paused, no actions except for deletion will be performed on the underlying objects.",
            )
            .default_value(false),
        )
        .attribute(
            "listen_local",
            Attribute::optional(
                AttrType::Bool,
                "ListenLocal makes the Prometheus server listen on loopback, so that it does not bind against the Pod IP.",
            )
            .default_value(false),
        )
        .attribute(
            "retention",
            Attribute::optional(
                AttrType::String,
                "Time duration Prometheus shall retain data for. Must match the regular expression [0-9]+(ms|s|m|h|d|w|y).",
            )
            .default_value(DEFAULT_RETENTION),
        )
        .attribute(
            "retention_size",
            Attribute::optional(
                AttrType::String,
                "Maximum amount of disk space used by blocks.",
            ),
        )
        .block("alerting", NestedBlock::single(alerting_schema()));

    SELECTORS.into_iter().fold(schema, |schema, (name, description)| {
        let mut selector = label_selector_schema();
        selector.description = description.to_string();
        schema.block(name, NestedBlock::single(selector))
    })
}

fn expand_selector(fields: &Fields<'_>, key: &str) -> Result<Option<LabelSelector>> {
    fields
        .block(key)?
        .map(|b| expand_label_selector(&b))
        .transpose()
}

/// Read the Prometheus `spec` block
pub fn expand_prometheus_spec(fields: &Fields<'_>) -> Result<PrometheusSpec> {
    Ok(PrometheusSpec {
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
        retention: fields.string("retention")?,
        retention_size: fields.string("retention_size")?,
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
        tolerations: expand_tolerations(&fields.blocks("toleration")?)?,
        service_monitor_selector: expand_selector(fields, "service_monitor_selector")?,
        service_monitor_namespace_selector: expand_selector(
            fields,
            "service_monitor_namespace_selector",
        )?,
        pod_monitor_selector: expand_selector(fields, "pod_monitor_selector")?,
        pod_monitor_namespace_selector: expand_selector(fields, "pod_monitor_namespace_selector")?,
        rule_selector: expand_selector(fields, "rule_selector")?,
        rule_namespace_selector: expand_selector(fields, "rule_namespace_selector")?,
        alerting: fields
            .block("alerting")?
            .map(|b| expand_alerting(&b))
            .transpose()?,
    })
}

/// Flatten a Prometheus spec
pub fn flatten_prometheus_spec(spec: &PrometheusSpec) -> AttrValue {
    let selector = |s: &Option<LabelSelector>| s.as_ref().map(flatten_label_selector);

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
        .set_nonzero("retention", spec.retention.as_str())
        .set_nonzero("retention_size", spec.retention_size.as_str())
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
        .set_blocks("toleration", flatten_tolerations(&spec.tolerations))
        .set_block(
            "service_monitor_selector",
            selector(&spec.service_monitor_selector),
        )
        .set_block(
            "service_monitor_namespace_selector",
            selector(&spec.service_monitor_namespace_selector),
        )
        .set_block("pod_monitor_selector", selector(&spec.pod_monitor_selector))
        .set_block(
            "pod_monitor_namespace_selector",
            selector(&spec.pod_monitor_namespace_selector),
        )
        .set_block("rule_selector", selector(&spec.rule_selector))
        .set_block(
            "rule_namespace_selector",
            selector(&spec.rule_namespace_selector),
        )
        .set_block("alerting", spec.alerting.as_ref().map(flatten_alerting))
        .build()
}

/// The `po_prometheus` resource kind
pub struct PrometheusResource;

impl MonitoringResource for PrometheusResource {
    type Object = Prometheus;
    type Spec = PrometheusSpec;

    const KIND: &'static str = "Prometheus";
    const NAME: &'static str = "prometheus";

    fn spec_schema() -> Block {
        prometheus_spec_schema()
    }

    fn expand_spec(fields: &Fields<'_>) -> Result<PrometheusSpec> {
        expand_prometheus_spec(fields)
    }

    fn flatten_spec(spec: &PrometheusSpec) -> AttrValue {
        flatten_prometheus_spec(spec)
    }

    fn new_object(metadata: ObjectMeta, spec: PrometheusSpec) -> Prometheus {
        Prometheus { metadata, spec }
    }

    fn spec_of(object: &Prometheus) -> &PrometheusSpec {
        &object.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec_config() -> AttrValue {
        AttrValue::from(json!({
            "version": "v2.53.0",
            "replicas": 2,
            "retention": "15d",
            "retention_size": "40GB",
            "service_account_name": "prometheus-k8s",
            "external_url": "https://prometheus.example.com",
            "service_monitor_selector": [{"match_labels": {"team": "platform"}}],
            "service_monitor_namespace_selector": [{}],
            "rule_selector": [{
                "match_expressions": [{"key": "role", "operator": "In", "values": ["alert-rules"]}],
            }],
            "alerting": [{
                "alertmanagers": [{"namespace": "monitoring", "name": "alertmanager-main", "port": "web"}],
            }],
            "toleration": [{"operator": "Exists"}],
        }))
    }

    #[test]
    fn spec_round_trip() {
        let config = spec_config();
        let fields = Fields::new(&config, "spec.0").expect("object");

        let spec = expand_prometheus_spec(&fields).expect("expand");
        assert_eq!(spec.retention, "15d");
        assert!(spec.pod_monitor_selector.is_none());
        assert_eq!(
            spec.alerting.as_ref().map(|a| a.alertmanagers.len()),
            Some(1)
        );

        assert_eq!(flatten_prometheus_spec(&spec), config);
    }

    #[test]
    fn empty_selector_selects_everything() {
        let config = spec_config();
        let fields = Fields::new(&config, "spec.0").expect("object");
        let spec = expand_prometheus_spec(&fields).expect("expand");

        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["serviceMonitorNamespaceSelector"], json!({}));
        assert!(json.get("podMonitorSelector").is_none());
        assert_eq!(json["serviceMonitorSelector"]["matchLabels"]["team"], "platform");
    }

    #[test]
    fn defaults() {
        let schema = prometheus_spec_schema();
        let mut spec = AttrValue::from(json!({}));
        schema.apply_defaults(&mut spec);

        assert_eq!(
            spec,
            AttrValue::from(json!({
                "base_image": DEFAULT_BASE_IMAGE,
                "replicas": DEFAULT_REPLICAS,
                "retention": DEFAULT_RETENTION,
                "paused": false,
                "listen_local": false,
            }))
        );
        assert!(schema.blocks["rule_namespace_selector"]
            .block
            .description
            .contains("PrometheusRules"));
    }
}
