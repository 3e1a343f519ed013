//! Spec attributes shared by the kinds that run pods (Alertmanager and Prometheus)

use po_common::schema::{AttrType, Attribute, Block, NestedBlock};

use crate::structures::container::container_schema;
use crate::structures::resources::resources_schema;
use crate::structures::security_context::pod_security_context_schema;
use crate::structures::toleration::toleration_schema;
use crate::structures::volume::volume_schema;

/// Spec schema common to pod-running kinds
///
/// `object` names the kind in descriptions; `base_image` and `replicas` are
/// its defaults.
pub(crate) fn workload_spec_schema(object: &str, base_image: &'static str, replicas: i64) -> Block {
    Block::new(format!(
        "Spec defines the specification of the desired behavior of the {} deployment",
        object
    ))
    .attribute(
        "base_image",
        Attribute::optional(AttrType::String, "Base image that is used to deploy pods, without tag.")
            .force_new()
            .default_value(base_image),
    )
    .attribute(
        "image",
        Attribute::optional(
            AttrType::String,
            format!(
                "Image if specified has precedence over baseImage, tag and sha combinations. \
                 Specifying the version is still necessary to ensure the Prometheus Operator knows what version of {} is being configured.",
                object
            ),
        )
        .force_new(),
    )
    .attribute(
        "secrets",
        Attribute::optional(
            AttrType::StringList,
            format!(
                "Secrets in the same namespace as the {} object, which shall be mounted into the pods.",
                object
            ),
        ),
    )
    .attribute(
        "config_maps",
        Attribute::optional(
            AttrType::StringList,
            format!(
                "ConfigMaps in the same namespace as the {} object, which shall be mounted into the pods.",
                object
            ),
        ),
    )
    .attribute(
        "external_url",
        Attribute::optional(
            AttrType::String,
            format!("The external URL the {} instances will be available under.", object),
        ),
    )
    .attribute(
        "service_account_name",
        Attribute::optional(AttrType::String, "Name of the ServiceAccount to use to run the pods."),
    )
    .attribute(
        "paused",
        Attribute::optional(
            AttrType::Bool,
            "If set to true all actions on the underlying managed objects are not going to be performed, except for delete actions.",
        ),
    )
    .attribute(
        "replicas",
        Attribute::optional(
            AttrType::Int,
            format!("Size is the expected size of the {} cluster.", object),
        )
        .default_value(replicas),
    )
    .attribute(
        "version",
        Attribute::optional(AttrType::String, "Version the cluster should be on.")
            .force_new(),
    )
    .attribute(
        "tag",
        Attribute::optional(
            AttrType::String,
            "Tag of the container image to be deployed. Defaults to the value of version.",
        )
        .force_new(),
    )
    .attribute(
        "sha",
        Attribute::optional(
            AttrType::String,
            "SHA of the container image to be deployed. Defaults to the value of version. Takes precedence over tag.",
        )
        .force_new(),
    )
    .attribute(
        "port_name",
        Attribute::optional(AttrType::String, "Port name used for the pods and governing service. Defaults to web."),
    )
    .attribute(
        "priority_class_name",
        Attribute::optional(AttrType::String, "Priority class assigned to the Pods."),
    )
    .attribute(
        "listen_local",
        Attribute::optional(
            AttrType::Bool,
            "Makes the server listen on loopback, so that it does not bind against the Pod IP.",
        ),
    )
    .attribute(
        "node_selector",
        Attribute::optional(
            AttrType::StringMap,
            "Define which Nodes the Pods are scheduled on.",
        ),
    )
    .block(
        "container",
        NestedBlock::list(container_schema(false)).force_new(),
    )
    .block(
        "init_container",
        NestedBlock::list(container_schema(true)).force_new(),
    )
    .block(
        "security_context",
        NestedBlock::single(pod_security_context_schema()),
    )
    .block("resources", NestedBlock::single(resources_schema()))
    .block("volume", NestedBlock::list(volume_schema()))
    .block("toleration", NestedBlock::list(toleration_schema()))
}
