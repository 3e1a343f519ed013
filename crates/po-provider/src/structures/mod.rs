//! Schema declarations and expand/flatten converters for nested structures
//!
//! Every structure comes as a triple: a `*_schema` function declaring the
//! block, an `expand_*` function reading configuration into the typed
//! Kubernetes struct, and a `flatten_*` function producing the attribute tree
//! back. Expanders fail only when a value has the wrong dynamic type;
//! flatteners omit zero-valued optional fields.

pub mod alerting;
pub mod container;
pub mod endpoint;
pub mod key_selector;
pub mod label_selector;
pub mod metadata;
pub mod resources;
pub mod rules;
pub mod security_context;
pub mod tls;
pub mod toleration;
pub mod volume;

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use po_common::{Error, Fields, Result};

/// Integer attribute narrowed to `i32`, keeping an explicit zero
pub(crate) fn opt_int32(fields: &Fields<'_>, key: &str) -> Result<Option<i32>> {
    match fields.opt_int(key)? {
        None => Ok(None),
        Some(n) => i32::try_from(n)
            .map(Some)
            .map_err(|_| Error::decode(fields.path_of(key), format!("{} overflows i32", n))),
    }
}

/// Integer attribute narrowed to `i32`; zero when absent
pub(crate) fn int32(fields: &Fields<'_>, key: &str) -> Result<i32> {
    Ok(opt_int32(fields, key)?.unwrap_or_default())
}

/// Non-negative integer attribute; zero when absent
pub(crate) fn uint64(fields: &Fields<'_>, key: &str) -> Result<u64> {
    let n = fields.int(key)?;
    u64::try_from(n)
        .map_err(|_| Error::decode(fields.path_of(key), format!("{} must not be negative", n)))
}

/// Interpret a string as a number when it parses as one
pub(crate) fn expand_int_or_string(s: String) -> IntOrString {
    match s.parse::<i32>() {
        Ok(n) => IntOrString::Int(n),
        Err(_) => IntOrString::String(s),
    }
}

/// String form of a number-or-string value
pub(crate) fn flatten_int_or_string(v: &IntOrString) -> String {
    match v {
        IntOrString::Int(n) => n.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use po_common::AttrValue;
    use serde_json::json;

    #[test]
    fn int_or_string_prefers_numbers() {
        assert_eq!(expand_int_or_string("9093".to_string()), IntOrString::Int(9093));
        assert_eq!(
            expand_int_or_string("web".to_string()),
            IntOrString::String("web".to_string())
        );
        assert_eq!(flatten_int_or_string(&IntOrString::Int(1)), "1");
        assert_eq!(
            flatten_int_or_string(&IntOrString::String("up == 0".to_string())),
            "up == 0"
        );
    }

    #[test]
    fn integer_narrowing() {
        let value = AttrValue::from(json!({"zero": 0, "big": 3_000_000_000_i64, "neg": -1}));
        let fields = Fields::new(&value, "spec.0").expect("object");

        assert_eq!(opt_int32(&fields, "zero").expect("fits"), Some(0));
        assert_eq!(opt_int32(&fields, "missing").expect("absent"), None);
        assert_eq!(int32(&fields, "missing").expect("absent"), 0);

        let err = int32(&fields, "big").expect_err("overflow");
        assert_eq!(err.field(), Some("spec.0.big"));

        let err = uint64(&fields, "neg").expect_err("negative");
        assert!(err.to_string().contains("must not be negative"));
        assert_eq!(uint64(&fields, "zero").expect("zero"), 0);
    }
}
