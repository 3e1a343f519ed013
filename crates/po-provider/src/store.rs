//! Namespaced object storage over the Kubernetes API
//!
//! Handlers only need four verbs on a single namespaced kind. The trait keeps
//! them mockable; [`KubeStore`] is the real implementation.

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use po_common::patch::PatchOperations;
use po_common::{Error, Result};

/// Create, get, patch and delete objects of one namespaced kind
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore<K: Send + Sync + 'static>: Send + Sync {
    /// Create an object, returning what the server stored
    async fn create(&self, namespace: &str, object: &K) -> Result<K>;

    /// Get an object; a missing object is [`Error::NotFound`]
    async fn get(&self, namespace: &str, name: &str) -> Result<K>;

    /// Apply a JSON patch to an object
    async fn patch(&self, namespace: &str, name: &str, ops: &PatchOperations) -> Result<K>;

    /// Delete an object
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Wrap operations as an `application/json-patch+json` request body
fn json_patch(ops: &PatchOperations) -> Result<Patch<()>> {
    Ok(Patch::Json(ops.to_json_patch()?))
}

/// [`ObjectStore`] backed by a kube client
pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    /// Create a store using the given client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Map a 404 onto [`Error::NotFound`] for this kind
    fn map_error(err: kube::Error, namespace: &str, name: &str) -> Error {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => {
                debug!(kind = %K::kind(&()), namespace, name, "object not found");
                Error::not_found(K::kind(&()), namespace, name)
            }
            _ => Error::from(err),
        }
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn create(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object.meta().name.as_deref().unwrap_or_default();
        self.api(namespace)
            .create(&PostParams::default(), object)
            .await
            .map_err(|e| Self::map_error(e, namespace, name))
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<K> {
        self.api(namespace)
            .get(name)
            .await
            .map_err(|e| Self::map_error(e, namespace, name))
    }

    async fn patch(&self, namespace: &str, name: &str, ops: &PatchOperations) -> Result<K> {
        self.api(namespace)
            .patch(name, &PatchParams::default(), &json_patch(ops)?)
            .await
            .map_err(|e| Self::map_error(e, namespace, name))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| Self::map_error(e, namespace, name))
    }
}
