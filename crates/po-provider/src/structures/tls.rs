//! TLS settings, Secret-or-ConfigMap references and basic auth

use po_common::schema::{AttrType, Attribute, Block, NestedBlock};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};
use po_crd::{BasicAuth, SecretOrConfigMap, TlsConfig};

use super::key_selector::{
    config_map_key_selector_schema, expand_config_map_key_ref, expand_secret_key_ref,
    flatten_config_map_key_ref, flatten_secret_key_ref, secret_key_selector_schema,
};

/// Schema of data taken from either a Secret or a ConfigMap
pub fn secret_or_config_map_schema() -> Block {
    Block::new("Data to use for the targets, from a Secret or a ConfigMap")
        .block(
            "secret",
            NestedBlock::single(secret_key_selector_schema()),
        )
        .block(
            "config_map",
            NestedBlock::single(config_map_key_selector_schema()),
        )
}

/// Schema of TLS settings
pub fn tls_config_schema() -> Block {
    Block::new("TLS configuration to use when scraping the endpoint")
        .attribute(
            "ca_file",
            Attribute::optional(AttrType::String, "Path to the CA cert in the Prometheus container to use for the targets."),
        )
        .attribute(
            "cert_file",
            Attribute::optional(AttrType::String, "Path to the client cert file in the Prometheus container for the targets."),
        )
        .attribute(
            "key_file",
            Attribute::optional(AttrType::String, "Path to the client key file in the Prometheus container for the targets."),
        )
        .attribute(
            "server_name",
            Attribute::optional(AttrType::String, "Used to verify the hostname for the targets."),
        )
        .attribute(
            "insecure_skip_verify",
            Attribute::optional(AttrType::Bool, "Disable target certificate validation."),
        )
        .block("ca", NestedBlock::single(secret_or_config_map_schema()))
        .block("cert", NestedBlock::single(secret_or_config_map_schema()))
        .block(
            "key_secret",
            NestedBlock::single(secret_key_selector_schema()),
        )
}

/// Schema of basic authentication credentials
pub fn basic_auth_schema() -> Block {
    Block::new("BasicAuth allow an endpoint to authenticate over basic authentication")
        .block(
            "username",
            NestedBlock::single(secret_key_selector_schema()),
        )
        .block(
            "password",
            NestedBlock::single(secret_key_selector_schema()),
        )
}

/// Read a Secret-or-ConfigMap reference
pub fn expand_secret_or_config_map(fields: &Fields<'_>) -> Result<SecretOrConfigMap> {
    Ok(SecretOrConfigMap {
        secret: fields
            .block("secret")?
            .map(|b| expand_secret_key_ref(&b))
            .transpose()?,
        config_map: fields
            .block("config_map")?
            .map(|b| expand_config_map_key_ref(&b))
            .transpose()?,
    })
}

/// Flatten a Secret-or-ConfigMap reference; `None` when neither is set
pub fn flatten_secret_or_config_map(source: &SecretOrConfigMap) -> Option<AttrValue> {
    if source.is_empty() {
        return None;
    }
    Some(
        ObjectBuilder::new()
            .set_block("secret", source.secret.as_ref().map(flatten_secret_key_ref))
            .set_block(
                "config_map",
                source.config_map.as_ref().map(flatten_config_map_key_ref),
            )
            .build(),
    )
}

/// Read TLS settings
pub fn expand_tls_config(fields: &Fields<'_>) -> Result<TlsConfig> {
    let source = |key: &str| -> Result<SecretOrConfigMap> {
        Ok(fields
            .block(key)?
            .map(|b| expand_secret_or_config_map(&b))
            .transpose()?
            .unwrap_or_default())
    };

    Ok(TlsConfig {
        ca: source("ca")?,
        cert: source("cert")?,
        key_secret: fields
            .block("key_secret")?
            .map(|b| expand_secret_key_ref(&b))
            .transpose()?,
        server_name: fields.string("server_name")?,
        insecure_skip_verify: fields.bool("insecure_skip_verify")?,
        ca_file: fields.string("ca_file")?,
        cert_file: fields.string("cert_file")?,
        key_file: fields.string("key_file")?,
    })
}

/// Flatten TLS settings
pub fn flatten_tls_config(tls: &TlsConfig) -> AttrValue {
    ObjectBuilder::new()
        .set_nonzero("ca_file", tls.ca_file.as_str())
        .set_nonzero("cert_file", tls.cert_file.as_str())
        .set_nonzero("key_file", tls.key_file.as_str())
        .set_nonzero("server_name", tls.server_name.as_str())
        .set_nonzero("insecure_skip_verify", tls.insecure_skip_verify)
        .set_block("ca", flatten_secret_or_config_map(&tls.ca))
        .set_block("cert", flatten_secret_or_config_map(&tls.cert))
        .set_block("key_secret", tls.key_secret.as_ref().map(flatten_secret_key_ref))
        .build()
}

/// Read basic auth credentials
pub fn expand_basic_auth(fields: &Fields<'_>) -> Result<BasicAuth> {
    Ok(BasicAuth {
        username: fields
            .block("username")?
            .map(|b| expand_secret_key_ref(&b))
            .transpose()?,
        password: fields
            .block("password")?
            .map(|b| expand_secret_key_ref(&b))
            .transpose()?,
    })
}

/// Flatten basic auth credentials
pub fn flatten_basic_auth(auth: &BasicAuth) -> AttrValue {
    ObjectBuilder::new()
        .set_block("username", auth.username.as_ref().map(flatten_secret_key_ref))
        .set_block("password", auth.password.as_ref().map(flatten_secret_key_ref))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tls_round_trip() {
        let config = AttrValue::from(json!({
            "ca": [{"config_map": [{"name": "serving-ca", "key": "ca.crt"}]}],
            "cert": [{"secret": [{"name": "client-tls", "key": "tls.crt"}]}],
            "key_secret": [{"name": "client-tls", "key": "tls.key"}],
            "server_name": "api.monitoring.svc",
            "insecure_skip_verify": true,
        }));
        let fields = Fields::new(&config, "endpoints.0.tls_config.0").expect("object");

        let tls = expand_tls_config(&fields).expect("expand");
        assert!(tls.ca.secret.is_none());
        assert_eq!(tls.ca.config_map.as_ref().map(|c| c.key.as_str()), Some("ca.crt"));
        assert!(tls.ca_file.is_empty());

        assert_eq!(flatten_tls_config(&tls), config);
    }

    #[test]
    fn file_based_tls_round_trip() {
        let config = AttrValue::from(json!({
            "ca_file": "/etc/prometheus/secrets/ca.crt",
            "cert_file": "/etc/prometheus/secrets/tls.crt",
            "key_file": "/etc/prometheus/secrets/tls.key",
        }));
        let fields = Fields::new(&config, "tls_config.0").expect("object");

        let tls = expand_tls_config(&fields).expect("expand");
        assert!(tls.ca.is_empty());
        assert_eq!(flatten_tls_config(&tls), config);
    }

    #[test]
    fn basic_auth_round_trip() {
        let config = AttrValue::from(json!({
            "username": [{"name": "scrape-auth", "key": "user"}],
            "password": [{"name": "scrape-auth", "key": "pass"}],
        }));
        let fields = Fields::new(&config, "basic_auth.0").expect("object");

        let auth = expand_basic_auth(&fields).expect("expand");
        assert_eq!(auth.password.as_ref().map(|p| p.key.as_str()), Some("pass"));
        assert_eq!(flatten_basic_auth(&auth), config);
    }
}
