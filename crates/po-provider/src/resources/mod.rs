//! Resource kinds and the CRUD handler they share
//!
//! Each kind implements [`MonitoringResource`]: its spec schema and the
//! converters between configuration and the typed spec. [`ResourceHandler`]
//! drives create, read, exists, update, delete and import for any kind over
//! an [`ObjectStore`].

pub mod alertmanager;
pub mod prometheus;
pub mod prometheus_rule;
pub mod service_monitor;
mod workload;

use std::fmt::Debug;
use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, trace};

use po_common::id::{build_id, id_parts};
use po_common::patch::{replace_spec, PatchOperations};
use po_common::schema::{AttrType, Attribute, Block, NestedBlock};
use po_common::{AttrValue, Error, Fields, ObjectBuilder, Result};

use crate::state::ResourceData;
use crate::store::ObjectStore;
use crate::structures::metadata::{
    expand_metadata, flatten_metadata, namespaced_metadata_schema, patch_metadata,
};

pub use alertmanager::AlertmanagerResource;
pub use prometheus::PrometheusResource;
pub use prometheus_rule::PrometheusRuleResource;
pub use service_monitor::ServiceMonitorResource;

static NULL: AttrValue = AttrValue::Null;

/// A Prometheus-Operator kind managed as a Terraform resource
pub trait MonitoringResource: Send + Sync + 'static {
    /// Typed custom resource
    type Object: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Typed spec of [`Self::Object`]
    type Spec: Serialize;

    /// Kubernetes kind, used in logs and errors
    const KIND: &'static str;

    /// Terraform type name without the provider prefix
    const NAME: &'static str;

    /// Schema of the `spec` block
    fn spec_schema() -> Block;

    /// Read the `spec` block
    fn expand_spec(fields: &Fields<'_>) -> Result<Self::Spec>;

    /// Flatten a spec into the `spec` block
    fn flatten_spec(spec: &Self::Spec) -> AttrValue;

    /// Assemble an object from metadata and spec
    fn new_object(metadata: ObjectMeta, spec: Self::Spec) -> Self::Object;

    /// Borrow the spec of an object
    fn spec_of(object: &Self::Object) -> &Self::Spec;
}

/// Full schema of a resource kind: `id`, `metadata` and `spec`
pub fn resource_schema<R: MonitoringResource>() -> Block {
    let object = R::NAME.replace('_', " ");
    Block::new(format!("Manages a Prometheus-Operator {}", R::KIND))
        .attribute(
            "id",
            Attribute::computed(AttrType::String, "Namespace and name, as namespace/name"),
        )
        .block(
            "metadata",
            NestedBlock::single(namespaced_metadata_schema(&object, true)).required(),
        )
        .block("spec", NestedBlock::single(R::spec_schema()).required())
}

/// First element of a single nested block, or null
fn first_block<'a>(value: &'a AttrValue, key: &str) -> &'a AttrValue {
    value
        .get(key)
        .and_then(AttrValue::as_list)
        .and_then(|items| items.first())
        .unwrap_or(&NULL)
}

fn required_block<'a>(root: &Fields<'a>, key: &str) -> Result<Fields<'a>> {
    root.block(key)?
        .ok_or_else(|| Error::validation_for_field(key, "block is required"))
}

// =============================================================================
// Handler
// =============================================================================

/// CRUD operations of one resource kind
pub struct ResourceHandler<R: MonitoringResource> {
    store: Arc<dyn ObjectStore<R::Object>>,
    schema: Block,
}

impl<R: MonitoringResource> ResourceHandler<R> {
    /// Create a handler over the given store
    pub fn new(store: Arc<dyn ObjectStore<R::Object>>) -> Self {
        Self {
            store,
            schema: resource_schema::<R>(),
        }
    }

    /// Schema of the resource
    pub fn schema(&self) -> &Block {
        &self.schema
    }

    /// Build the typed object from a state or plan
    pub fn expand(&self, value: &AttrValue) -> Result<R::Object> {
        let root = Fields::new(value, "")?;
        let metadata = expand_metadata(&required_block(&root, "metadata")?)?;
        let spec = R::expand_spec(&required_block(&root, "spec")?)?;
        Ok(R::new_object(metadata, spec))
    }

    /// Flatten an object into state shaped like `reference`
    ///
    /// The result has the declared shape, keeps the reference's spelling of
    /// zero values and has defaults filled in.
    pub fn flatten(&self, object: &R::Object, reference: &AttrValue) -> AttrValue {
        let observed = ObjectBuilder::new()
            .set_block(
                "metadata",
                Some(flatten_metadata(object.meta(), first_block(reference, "metadata"))),
            )
            .set_block("spec", Some(R::flatten_spec(R::spec_of(object))))
            .build();
        let mut state = self
            .schema
            .reconcile(reference, self.schema.conform(observed));
        self.schema.apply_defaults(&mut state);
        state
    }

    /// Create the object, then read it back
    ///
    /// On failure the id stays empty.
    pub async fn create(&self, data: &mut ResourceData) -> Result<()> {
        let object = self.expand(data.planned())?;
        let namespace = object.meta().namespace.clone().unwrap_or_default();
        let name = object.meta().name.clone().unwrap_or_default();

        info!(kind = R::KIND, namespace = %namespace, name = %name, "creating custom resource");
        let created = self
            .store
            .create(&namespace, &object)
            .await
            .map_err(|e| e.during("create", R::KIND))?;
        info!(kind = R::KIND, id = %build_id(created.meta()), "submitted new custom resource");

        data.set_id(build_id(created.meta()));
        self.read(data).await
    }

    /// Refresh observed state; a missing object clears the id
    pub async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let id = data.id().to_string();
        let (namespace, name) = id_parts(&id)?;

        info!(kind = R::KIND, namespace, name, "reading custom resource");
        match self.store.get(namespace, name).await {
            Ok(object) => {
                info!(kind = R::KIND, namespace, name, "received custom resource");
                let state = self.flatten(&object, data.reference());
                data.set_observed(state);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(kind = R::KIND, namespace, name, "custom resource is gone");
                data.clear_id();
                Ok(())
            }
            Err(e) => {
                debug!(kind = R::KIND, namespace, name, error = %e, "received error");
                Err(e.during("read", R::KIND))
            }
        }
    }

    /// Whether the object with the given id exists
    pub async fn exists(&self, id: &str) -> Result<bool> {
        let (namespace, name) = id_parts(id)?;

        info!(kind = R::KIND, namespace, name, "checking custom resource");
        match self.store.get(namespace, name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => {
                debug!(kind = R::KIND, namespace, name, error = %e, "received error");
                Err(e.during("read", R::KIND))
            }
        }
    }

    /// Patch changed labels, annotations and spec, then read back
    ///
    /// Label and annotation changes are diffed against the stored object so
    /// keys other tools manage survive.
    pub async fn update(&self, data: &mut ResourceData) -> Result<()> {
        let id = data.id().to_string();
        let (namespace, name) = id_parts(&id)?;

        let mut ops = PatchOperations::new();
        if data.has_change("metadata") {
            let live = self
                .store
                .get(namespace, name)
                .await
                .map_err(|e| e.during("update", R::KIND))?;
            let prior = Fields::new(first_block(data.prior(), "metadata"), "metadata.0")?;
            let planned = Fields::new(first_block(data.planned(), "metadata"), "metadata.0")?;
            ops.extend(patch_metadata(&prior, &planned, live.meta())?);
        }

        if data.has_change("spec") {
            let root = Fields::new(data.planned(), "")?;
            let spec = R::expand_spec(&required_block(&root, "spec")?)?;
            ops.push(replace_spec(&spec)?);
        }

        if !ops.is_empty() {
            trace!(
                kind = R::KIND,
                namespace,
                name,
                patch = %String::from_utf8_lossy(&ops.to_json()?),
                "patch operations"
            );
            info!(kind = R::KIND, namespace, name, operations = ops.len(), "updating custom resource");
            self.store
                .patch(namespace, name, &ops)
                .await
                .map_err(|e| e.during("update", R::KIND))?;
            info!(kind = R::KIND, namespace, name, "submitted updated custom resource");
        }

        self.read(data).await
    }

    /// Delete the object and clear the id
    pub async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        let id = data.id().to_string();
        let (namespace, name) = id_parts(&id)?;

        info!(kind = R::KIND, namespace, name, "deleting custom resource");
        self.store
            .delete(namespace, name)
            .await
            .map_err(|e| e.during("delete", R::KIND))?;
        info!(kind = R::KIND, namespace, name, "submitted delete request");

        data.clear_id();
        Ok(())
    }

    /// Adopt an existing object by id
    ///
    /// Unlike [`ResourceHandler::read`], a missing object is an error.
    pub async fn import(&self, id: &str) -> Result<ResourceData> {
        let (namespace, name) = id_parts(id)?;

        let mut data = ResourceData::new(id, AttrValue::Null, AttrValue::Null);
        self.read(&mut data).await?;
        if data.id().is_empty() {
            return Err(Error::not_found(R::KIND, namespace, name).during("import", R::KIND));
        }
        Ok(data)
    }
}
