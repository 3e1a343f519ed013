//! Kubernetes client construction

use std::path::PathBuf;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::error::Error;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Which kubeconfig, context and TLS behaviour to build a client from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubeClientConfig {
    /// Kubeconfig file; when unset the configuration is inferred
    /// (in-cluster service account, then `KUBECONFIG`/`~/.kube/config`)
    pub config_path: Option<PathBuf>,
    /// Context to use instead of the current context
    pub context: Option<String>,
    /// Cluster entry to use instead of the context's cluster
    pub cluster: Option<String>,
    /// User entry to use instead of the context's user
    pub auth_info: Option<String>,
    /// Skip verification of the API server certificate
    pub insecure: bool,
}

impl KubeClientConfig {
    fn options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: self.context.clone(),
            cluster: self.cluster.clone(),
            user: self.auth_info.clone(),
        }
    }

    fn has_overrides(&self) -> bool {
        self.context.is_some() || self.cluster.is_some() || self.auth_info.is_some()
    }
}

/// Create a kube client with default timeouts
pub async fn create_client(config: &KubeClientConfig) -> Result<Client, Error> {
    create_client_with_timeout(config, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client with custom timeouts
pub async fn create_client_with_timeout(
    config: &KubeClientConfig,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, Error> {
    let mut kube_config = match &config.config_path {
        Some(path) => {
            debug!(path = %path.display(), context = ?config.context, "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::config_with_context(
                    "create_client",
                    format!("failed to read kubeconfig {}: {}", path.display(), e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &config.options())
                .await
                .map_err(|e| {
                    Error::config_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None if config.has_overrides() => {
            debug!(context = ?config.context, "loading default kubeconfig");
            Config::from_kubeconfig(&config.options()).await.map_err(|e| {
                Error::config_with_context(
                    "create_client",
                    format!("failed to load kubeconfig: {}", e),
                )
            })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::config_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };

    kube_config.connect_timeout = Some(connect_timeout);
    kube_config.read_timeout = Some(read_timeout);
    if config.insecure {
        kube_config.accept_invalid_certs = true;
    }

    Client::try_from(kube_config).map_err(|e| {
        Error::config_with_context("create_client", format!("failed to create client: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_carry_overrides() {
        let config = KubeClientConfig {
            context: Some("kind-monitoring".to_string()),
            auth_info: Some("admin".to_string()),
            ..Default::default()
        };
        let opts = config.options();
        assert_eq!(opts.context.as_deref(), Some("kind-monitoring"));
        assert_eq!(opts.user.as_deref(), Some("admin"));
        assert_eq!(opts.cluster, None);
        assert!(config.has_overrides());
        assert!(!KubeClientConfig::default().has_overrides());
    }

    #[tokio::test]
    async fn missing_kubeconfig_is_a_config_error() {
        let config = KubeClientConfig {
            config_path: Some(PathBuf::from("/nonexistent/kubeconfig")),
            ..Default::default()
        };
        let err = match create_client(&config).await {
            Ok(_) => panic!("kubeconfig file is missing"),
            Err(err) => err,
        };
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("failed to read kubeconfig"));
    }
}
