//! Terraform provider for Prometheus-Operator custom resources
//!
//! Manages `Alertmanager`, `Prometheus`, `PrometheusRule` and `ServiceMonitor`
//! objects in a Kubernetes cluster as Terraform resources.
//!
//! # Modules
//!
//! - [`structures`] - Schemas and expand/flatten converters for nested blocks
//! - [`resources`] - One module per kind plus the shared CRUD handler
//! - [`store`] - Namespaced object access over the Kubernetes API
//! - [`state`] - Prior, planned and observed state of one resource instance
//! - [`terraform`] - Plugin protocol adapter and schema translation
//! - [`provider`] - Provider block and client configuration

#![deny(missing_docs)]

pub mod provider;
pub mod resources;
pub mod state;
pub mod store;
pub mod structures;
pub mod terraform;

pub use provider::{PoProvider, PROVIDER_NAME};
