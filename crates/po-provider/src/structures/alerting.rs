//! Alertmanager endpoints a Prometheus server sends alerts to

use po_common::schema::{AttrType, Attribute, Block, NestedBlock};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};
use po_crd::{AlertingSpec, AlertmanagerEndpoints};

use super::tls::{expand_tls_config, flatten_tls_config, tls_config_schema};
use super::{expand_int_or_string, flatten_int_or_string};

/// Schema of one Alertmanager endpoint
pub fn alertmanager_endpoints_schema() -> Block {
    Block::new("AlertmanagerEndpoints defines a selection of a single Endpoints object containing alertmanager IPs to fire alerts against")
        .attribute(
            "namespace",
            Attribute::required(AttrType::String, "Namespace of Endpoints object."),
        )
        .attribute(
            "name",
            Attribute::required(AttrType::String, "Name of Endpoints object in Namespace."),
        )
        .attribute(
            "port",
            Attribute::required(AttrType::String, "Port the Alertmanager API is exposed on."),
        )
        .attribute(
            "scheme",
            Attribute::optional(AttrType::String, "Scheme to use when firing alerts."),
        )
        .attribute(
            "path_prefix",
            Attribute::optional(AttrType::String, "Prefix for the HTTP path alerts are pushed to."),
        )
        .attribute(
            "bearer_token_file",
            Attribute::optional(AttrType::String, "BearerTokenFile to read from filesystem to use when authenticating to Alertmanager."),
        )
        .attribute(
            "api_version",
            Attribute::optional(AttrType::String, "Version of the Alertmanager API that Prometheus uses to send alerts."),
        )
        .block("tls_config", NestedBlock::single(tls_config_schema()))
}

/// Schema of the alerting section
pub fn alerting_schema() -> Block {
    Block::new("Define details regarding alerting").block(
        "alertmanagers",
        NestedBlock::list(alertmanager_endpoints_schema()).required(),
    )
}

fn expand_endpoints(fields: &Fields<'_>) -> Result<AlertmanagerEndpoints> {
    Ok(AlertmanagerEndpoints {
        namespace: fields.string("namespace")?,
        name: fields.string("name")?,
        port: expand_int_or_string(fields.string("port")?),
        scheme: fields.string("scheme")?,
        path_prefix: fields.string("path_prefix")?,
        tls_config: fields
            .block("tls_config")?
            .map(|b| expand_tls_config(&b))
            .transpose()?,
        bearer_token_file: fields.string("bearer_token_file")?,
        api_version: fields.string("api_version")?,
    })
}

/// Read the alerting section
pub fn expand_alerting(fields: &Fields<'_>) -> Result<AlertingSpec> {
    let alertmanagers = fields
        .blocks("alertmanagers")?
        .iter()
        .map(expand_endpoints)
        .collect::<Result<_>>()?;
    Ok(AlertingSpec { alertmanagers })
}

/// Flatten the alerting section
pub fn flatten_alerting(alerting: &AlertingSpec) -> AttrValue {
    let alertmanagers = alerting
        .alertmanagers
        .iter()
        .map(|am| {
            ObjectBuilder::new()
                .set("namespace", am.namespace.as_str())
                .set("name", am.name.as_str())
                .set("port", flatten_int_or_string(&am.port))
                .set_nonzero("scheme", am.scheme.as_str())
                .set_nonzero("path_prefix", am.path_prefix.as_str())
                .set_nonzero("bearer_token_file", am.bearer_token_file.as_str())
                .set_nonzero("api_version", am.api_version.as_str())
                .set_block("tls_config", am.tls_config.as_ref().map(flatten_tls_config))
                .build()
        })
        .collect();
    ObjectBuilder::new()
        .set_blocks("alertmanagers", alertmanagers)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use serde_json::json;

    #[test]
    fn alerting_round_trip() {
        let config = AttrValue::from(json!({
            "alertmanagers": [{
                "namespace": "monitoring",
                "name": "alertmanager-main",
                "port": "web",
                "path_prefix": "/",
                "api_version": "v2",
            }, {
                "namespace": "monitoring",
                "name": "alertmanager-raw",
                "port": "9093",
                "scheme": "https",
                "tls_config": [{"server_name": "alertmanager.monitoring.svc"}],
            }]
        }));
        let fields = Fields::new(&config, "spec.0.alerting.0").expect("object");

        let alerting = expand_alerting(&fields).expect("expand");
        assert_eq!(
            alerting.alertmanagers[0].port,
            IntOrString::String("web".to_string())
        );
        assert_eq!(alerting.alertmanagers[1].port, IntOrString::Int(9093));
        assert_eq!(alerting.alertmanagers[0].api_version, "v2");

        assert_eq!(flatten_alerting(&alerting), config);
    }

    #[test]
    fn alertmanagers_are_required() {
        let errors = alerting_schema().validate(&AttrValue::from(json!({})));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("alertmanagers"));

        let errors = alerting_schema().validate(&AttrValue::from(json!({
            "alertmanagers": [{"namespace": "monitoring", "name": "am"}]
        })));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("alertmanagers.0.port"));
    }
}
