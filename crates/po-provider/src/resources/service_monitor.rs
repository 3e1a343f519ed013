//! `po_service_monitor`: scrape targets discovered through Services

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use po_common::schema::{AttrType, Attribute, Block, NestedBlock};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};
use po_crd::{ServiceMonitor, ServiceMonitorSpec};

use super::MonitoringResource;
use crate::structures::endpoint::{
    endpoint_schema, expand_endpoints, expand_namespace_selector, flatten_endpoints,
    flatten_namespace_selector, namespace_selector_schema,
};
use crate::structures::label_selector::{
    expand_label_selector, flatten_label_selector, label_selector_schema,
};
use crate::structures::uint64;

/// Schema of the ServiceMonitor `spec` block
pub fn service_monitor_spec_schema() -> Block {
    let mut selector = label_selector_schema();
    selector.description = "Selector to select Endpoints objects".to_string();

    Block::new("Spec defines the specification of the desired behavior of the ServiceMonitor")
        .attribute(
            "job_label",
            Attribute::optional(AttrType::String, "The label to use to retrieve the job name from."),
        )
        .attribute(
            "target_labels",
            Attribute::optional(
                AttrType::StringList,
                "TargetLabels transfers labels on the Kubernetes Service onto the target.",
            ),
        )
        .attribute(
            "pod_target_labels",
            Attribute::optional(
                AttrType::StringList,
                "PodTargetLabels transfers labels on the Kubernetes Pod onto the target.",
            ),
        )
        .attribute(
            "sample_limit",
            Attribute::optional(
                AttrType::Int,
                "SampleLimit defines per-scrape limit on number of scraped samples that will be accepted.",
            ),
        )
        .block("endpoints", NestedBlock::list(endpoint_schema()))
        .block("selector", NestedBlock::single(selector))
        .block(
            "namespace_selector",
            NestedBlock::single(namespace_selector_schema()),
        )
}

/// Read the ServiceMonitor `spec` block
pub fn expand_service_monitor_spec(fields: &Fields<'_>) -> Result<ServiceMonitorSpec> {
    Ok(ServiceMonitorSpec {
        job_label: fields.string("job_label")?,
        target_labels: fields.strings("target_labels")?,
        pod_target_labels: fields.strings("pod_target_labels")?,
        endpoints: expand_endpoints(&fields.blocks("endpoints")?)?,
        selector: fields
            .block("selector")?
            .map(|b| expand_label_selector(&b))
            .transpose()?
            .unwrap_or_default(),
        namespace_selector: fields
            .block("namespace_selector")?
            .map(|b| expand_namespace_selector(&b))
            .transpose()?
            .unwrap_or_default(),
        sample_limit: uint64(fields, "sample_limit")?,
    })
}

/// Flatten a ServiceMonitor spec
///
/// An empty selector is omitted, so it reads back the same whether or not
/// the block was configured.
pub fn flatten_service_monitor_spec(spec: &ServiceMonitorSpec) -> AttrValue {
    let selector = flatten_label_selector(&spec.selector);
    ObjectBuilder::new()
        .set_nonzero("job_label", spec.job_label.as_str())
        .set_nonzero("target_labels", spec.target_labels.clone())
        .set_nonzero("pod_target_labels", spec.pod_target_labels.clone())
        .set_blocks("endpoints", flatten_endpoints(&spec.endpoints))
        .set_block("selector", (!selector.is_zero()).then_some(selector))
        .set_block(
            "namespace_selector",
            flatten_namespace_selector(&spec.namespace_selector),
        )
        .set_nonzero("sample_limit", spec.sample_limit)
        .build()
}

/// The `po_service_monitor` resource kind
pub struct ServiceMonitorResource;

impl MonitoringResource for ServiceMonitorResource {
    type Object = ServiceMonitor;
    type Spec = ServiceMonitorSpec;

    const KIND: &'static str = "ServiceMonitor";
    const NAME: &'static str = "service_monitor";

    fn spec_schema() -> Block {
        service_monitor_spec_schema()
    }

    fn expand_spec(fields: &Fields<'_>) -> Result<ServiceMonitorSpec> {
        expand_service_monitor_spec(fields)
    }

    fn flatten_spec(spec: &ServiceMonitorSpec) -> AttrValue {
        flatten_service_monitor_spec(spec)
    }

    fn new_object(metadata: ObjectMeta, spec: ServiceMonitorSpec) -> ServiceMonitor {
        ServiceMonitor { metadata, spec }
    }

    fn spec_of(object: &ServiceMonitor) -> &ServiceMonitorSpec {
        &object.spec
    }
}
