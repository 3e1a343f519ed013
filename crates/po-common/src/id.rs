//! Resource identifiers of the form `namespace/name`

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::error::Error;
use crate::Result;

/// Build the id of an object from its metadata
pub fn build_id(meta: &ObjectMeta) -> String {
    format!(
        "{}/{}",
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default()
    )
}

/// Split an id into namespace and name
///
/// Both parts must be non-empty and the id must contain exactly one `/`.
pub fn id_parts(id: &str) -> Result<(&str, &str)> {
    match id.split_once('/') {
        Some((namespace, name))
            if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((namespace, name))
        }
        _ => Err(Error::InvalidId { id: id.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_metadata() {
        let meta = ObjectMeta {
            name: Some("main".to_string()),
            namespace: Some("monitoring".to_string()),
            ..Default::default()
        };
        assert_eq!(build_id(&meta), "monitoring/main");
    }

    #[test]
    fn splits_valid_ids() {
        assert_eq!(id_parts("monitoring/main").expect("valid"), ("monitoring", "main"));
    }

    #[test]
    fn rejects_malformed_ids() {
        for id in ["main", "", "/main", "monitoring/", "a/b/c"] {
            let err = id_parts(id).expect_err(id);
            assert!(matches!(err, Error::InvalidId { .. }), "{id}");
        }
    }
}
