//! Typed Prometheus-Operator custom resources
//!
//! Only the fields the provider manages are modeled. Optional scalars use
//! their zero value and are omitted on the wire when unset; fields the
//! operator distinguishes from their zero value are `Option`.

#![deny(missing_docs)]

mod common;

pub mod alertmanager;
pub mod prometheus;
pub mod prometheus_rule;
pub mod service_monitor;

pub use alertmanager::{Alertmanager, AlertmanagerSpec};
pub use common::{BasicAuth, RelabelConfig, SecretOrConfigMap, TlsConfig};
pub use prometheus::{AlertingSpec, AlertmanagerEndpoints, Prometheus, PrometheusSpec};
pub use prometheus_rule::{PrometheusRule, PrometheusRuleSpec, Rule, RuleGroup};
pub use service_monitor::{Endpoint, NamespaceSelector, ServiceMonitor, ServiceMonitorSpec};

pub(crate) fn is_zero(n: &u64) -> bool {
    *n == 0
}
