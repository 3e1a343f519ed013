//! Shared plumbing for the Prometheus-Operator Terraform provider: errors,
//! the generic attribute tree, executable schemas and JSON patches

#![deny(missing_docs)]

pub mod error;
pub mod fields;
pub mod id;
pub mod kube_utils;
pub mod patch;
pub mod schema;
pub mod telemetry;
pub mod validation;
pub mod value;

pub use error::Error;
pub use fields::Fields;
pub use value::{AttrValue, ObjectBuilder};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

