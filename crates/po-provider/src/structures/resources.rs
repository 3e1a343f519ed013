//! Compute resource requests and limits

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use po_common::schema::{AttrType, Attribute, Block, NestedBlock, Validator};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};

const RESOURCE_NAMES: [&str; 2] = ["cpu", "memory"];

fn resource_list_schema(description: &'static str) -> Block {
    Block::new(description)
        .attribute(
            "cpu",
            Attribute::optional(AttrType::String, "CPU, in cores. (500m = .5 cores)")
                .validator(Validator::Quantity),
        )
        .attribute(
            "memory",
            Attribute::optional(AttrType::String, "Memory, in bytes. (500Gi = 500GiB = 500 * 1024 * 1024 * 1024)")
                .validator(Validator::Quantity),
        )
}

/// Schema of resource requirements
pub fn resources_schema() -> Block {
    Block::new("Compute resources required by the container")
        .block(
            "limits",
            NestedBlock::single(resource_list_schema(
                "Describes the maximum amount of compute resources allowed.",
            )),
        )
        .block(
            "requests",
            NestedBlock::single(resource_list_schema(
                "Describes the minimum amount of compute resources required.",
            )),
        )
}

fn expand_resource_list(fields: Option<Fields<'_>>) -> Result<Option<BTreeMap<String, Quantity>>> {
    let Some(fields) = fields else {
        return Ok(None);
    };
    let mut list = BTreeMap::new();
    for name in RESOURCE_NAMES {
        if let Some(q) = fields.opt_string(name)? {
            list.insert(name.to_string(), Quantity(q));
        }
    }
    Ok((!list.is_empty()).then_some(list))
}

fn flatten_resource_list(list: Option<&BTreeMap<String, Quantity>>) -> Option<AttrValue> {
    let list = list.filter(|l| !l.is_empty())?;
    Some(
        RESOURCE_NAMES
            .iter()
            .fold(ObjectBuilder::new(), |b, name| {
                b.set_opt(name, list.get(*name).map(|q| q.0.clone()))
            })
            .build(),
    )
}

/// Read resource requirements
pub fn expand_resource_requirements(fields: &Fields<'_>) -> Result<ResourceRequirements> {
    Ok(ResourceRequirements {
        limits: expand_resource_list(fields.block("limits")?)?,
        requests: expand_resource_list(fields.block("requests")?)?,
        ..Default::default()
    })
}

/// Flatten resource requirements
pub fn flatten_resource_requirements(resources: &ResourceRequirements) -> AttrValue {
    ObjectBuilder::new()
        .set_block("limits", flatten_resource_list(resources.limits.as_ref()))
        .set_block("requests", flatten_resource_list(resources.requests.as_ref()))
        .build()
}
