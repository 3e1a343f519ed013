//! Provider block and client configuration
//!
//! The provider block selects the kubeconfig, context and TLS behaviour. Each
//! attribute left unset in configuration falls back to an environment
//! variable. `configure` builds the single client every resource shares.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use kube::Client;
use tf_provider::{map, Diagnostics, Provider, Schema, ValueEmpty};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use po_common::kube_utils::{create_client, KubeClientConfig};
use po_common::schema::{AttrType, Attribute, Block};
use po_common::{AttrValue, Error, Fields, Result};

use crate::resources::{
    AlertmanagerResource, MonitoringResource, PrometheusResource, PrometheusRuleResource,
    ServiceMonitorResource,
};
use crate::terraform::{report, tf_schema, validate, TerraformResource};

/// Name the provider is served under
pub const PROVIDER_NAME: &str = "po";

// =============================================================================
// Environment fallbacks
// =============================================================================

/// Kubeconfig file used when `config_path` is unset
pub const ENV_CONFIG_PATH: &str = "KUBE_CONFIG_PATH";
/// Context used when `config_context` is unset
pub const ENV_CONTEXT: &str = "KUBE_CTX";
/// Cluster used when `config_context_cluster` is unset
pub const ENV_CONTEXT_CLUSTER: &str = "KUBE_CTX_CLUSTER";
/// User used when `config_context_auth_info` is unset
pub const ENV_CONTEXT_AUTH_INFO: &str = "KUBE_CTX_AUTH_INFO";
/// TLS verification switch used when `insecure` is unset
pub const ENV_INSECURE: &str = "KUBE_INSECURE";

/// Schema of the provider block
pub fn provider_schema() -> Block {
    Block::new("Manage Prometheus-Operator custom resources")
        .attribute(
            "config_path",
            Attribute::optional(
                AttrType::String,
                format!("Path to the kubeconfig file. Can be set with {ENV_CONFIG_PATH}."),
            ),
        )
        .attribute(
            "config_context",
            Attribute::optional(
                AttrType::String,
                format!("Context to use from the kubeconfig. Can be set with {ENV_CONTEXT}."),
            ),
        )
        .attribute(
            "config_context_cluster",
            Attribute::optional(
                AttrType::String,
                format!(
                    "Cluster to use instead of the context's cluster. Can be set with {ENV_CONTEXT_CLUSTER}."
                ),
            ),
        )
        .attribute(
            "config_context_auth_info",
            Attribute::optional(
                AttrType::String,
                format!(
                    "User to use instead of the context's user. Can be set with {ENV_CONTEXT_AUTH_INFO}."
                ),
            ),
        )
        .attribute(
            "insecure",
            Attribute::optional(
                AttrType::Bool,
                format!(
                    "Skip verification of the API server certificate. Can be set with {ENV_INSECURE}."
                ),
            ),
        )
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(Error::config_with_context(
            "configure",
            format!("{name} must be a boolean, got {raw:?}"),
        )),
    }
}

/// Resolve the client configuration from the provider block
///
/// Values set in configuration win over the environment; `env` looks up one
/// variable and treats empty values as unset.
pub fn client_config(
    config: &AttrValue,
    env: impl Fn(&str) -> Option<String>,
) -> Result<KubeClientConfig> {
    let fields = Fields::new(config, "")?;
    let env = |name: &str| env(name).filter(|v| !v.is_empty());
    let setting = |attr: &str, var: &str| -> Result<Option<String>> {
        Ok(fields.opt_string(attr)?.or_else(|| env(var)))
    };

    let insecure = match fields.opt_bool("insecure")? {
        Some(insecure) => insecure,
        None => match env(ENV_INSECURE) {
            Some(raw) => parse_bool(ENV_INSECURE, &raw)?,
            None => false,
        },
    };

    Ok(KubeClientConfig {
        config_path: setting("config_path", ENV_CONFIG_PATH)?.map(PathBuf::from),
        context: setting("config_context", ENV_CONTEXT)?,
        cluster: setting("config_context_cluster", ENV_CONTEXT_CLUSTER)?,
        auth_info: setting("config_context_auth_info", ENV_CONTEXT_AUTH_INFO)?,
        insecure,
    })
}

// =============================================================================
// Provider
// =============================================================================

/// The `po` provider
#[derive(Clone, Default)]
pub struct PoProvider {
    client: Arc<OnceCell<Client>>,
}

impl PoProvider {
    fn resource<R: MonitoringResource>(&self) -> TerraformResource<R> {
        TerraformResource::new(self.client.clone())
    }
}

#[async_trait]
impl Provider for PoProvider {
    type Config<'a> = AttrValue;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(tf_schema(&provider_schema()))
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        validate(diags, &provider_schema(), &config)
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let client_config = match client_config(&config, |name| std::env::var(name).ok()) {
            Ok(c) => c,
            Err(err) => {
                report(diags, &err);
                return None;
            }
        };
        info!(
            terraform_version = %terraform_version,
            config_path = ?client_config.config_path,
            context = ?client_config.context,
            insecure = client_config.insecure,
            "configuring provider"
        );
        if client_config.insecure {
            warn!("API server certificate verification is disabled");
        }

        let client = match create_client(&client_config).await {
            Ok(c) => c,
            Err(err) => {
                report(diags, &err);
                return None;
            }
        };
        // Terraform may configure the same plugin process more than once;
        // the first client stays in use.
        if self.client.set(client).is_err() {
            warn!("provider already configured, keeping the existing client");
        }
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::resource::DynamicResource>>> {
        Some(map! {
            AlertmanagerResource::NAME => self.resource::<AlertmanagerResource>(),
            PrometheusResource::NAME => self.resource::<PrometheusResource>(),
            PrometheusRuleResource::NAME => self.resource::<PrometheusRuleResource>(),
            ServiceMonitorResource::NAME => self.resource::<ServiceMonitorResource>(),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn tf_provider::data_source::DynamicDataSource>>> {
        Some(map! {})
    }
}
