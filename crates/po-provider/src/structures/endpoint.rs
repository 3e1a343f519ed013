//! ServiceMonitor scrape endpoints, relabeling rules and namespace selectors

use po_common::schema::{AttrType, Attribute, Block, NestedBlock};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};
use po_crd::{Endpoint, NamespaceSelector, RelabelConfig};

use super::key_selector::{expand_secret_key_ref, flatten_secret_key_ref, secret_key_selector_schema};
use super::tls::{
    basic_auth_schema, expand_basic_auth, expand_tls_config, flatten_basic_auth,
    flatten_tls_config, tls_config_schema,
};
use super::uint64;

/// Schema of a relabeling rule
pub fn relabel_config_schema() -> Block {
    Block::new("Relabeling rule applied to a label set")
        .attribute(
            "source_labels",
            Attribute::optional(
                AttrType::StringSet,
                "The source labels select values from existing labels.",
            ),
        )
        .attribute(
            "separator",
            Attribute::optional(AttrType::String, "Separator placed between concatenated source label values."),
        )
        .attribute(
            "target_label",
            Attribute::optional(
                AttrType::String,
                "Label to which the resulting value is written in a replace action.",
            ),
        )
        .attribute(
            "regex",
            Attribute::optional(AttrType::String, "Regular expression against which the extracted value is matched."),
        )
        .attribute(
            "modulus",
            Attribute::optional(AttrType::Int, "Modulus to take of the hash of the source label values."),
        )
        .attribute(
            "replacement",
            Attribute::optional(
                AttrType::String,
                "Replacement value against which a regex replace is performed if the regular expression matches.",
            ),
        )
        .attribute(
            "action",
            Attribute::optional(AttrType::String, "Action to perform based on regex matching."),
        )
}

/// Schema of a namespace selector
pub fn namespace_selector_schema() -> Block {
    Block::new("Selector to select which namespaces the Endpoints objects are discovered from")
        .attribute(
            "any",
            Attribute::optional(
                AttrType::Bool,
                "Boolean describing whether all namespaces are selected in contrast to a list restricting them.",
            ),
        )
        .attribute(
            "match_names",
            Attribute::optional(AttrType::StringSet, "List of namespace names."),
        )
}

/// Schema of one scrape endpoint
pub fn endpoint_schema() -> Block {
    Block::new("Endpoint defines a scrapeable endpoint serving Prometheus metrics")
        .attribute(
            "port",
            Attribute::optional(
                AttrType::String,
                "Name of the service port this endpoint refers to. Mutually exclusive with targetPort.",
            ),
        )
        .attribute(
            "path",
            Attribute::optional(AttrType::String, "HTTP path to scrape for metrics."),
        )
        .attribute(
            "scheme",
            Attribute::optional(AttrType::String, "HTTP scheme to use for scraping."),
        )
        .attribute(
            "interval",
            Attribute::optional(AttrType::String, "Interval at which metrics should be scraped"),
        )
        .attribute(
            "scrape_timeout",
            Attribute::optional(AttrType::String, "Timeout after which the scrape is ended"),
        )
        .attribute(
            "bearer_token_file",
            Attribute::optional(AttrType::String, "File to read bearer token for scraping targets."),
        )
        .attribute(
            "honor_labels",
            Attribute::optional(AttrType::Bool, "HonorLabels chooses the metric's labels on collisions with target labels."),
        )
        .attribute(
            "honor_timestamps",
            Attribute::optional(
                AttrType::Bool,
                "HonorTimestamps controls whether Prometheus respects the timestamps present in scraped data.",
            )
            .default_value(true),
        )
        .attribute(
            "proxy_url",
            Attribute::optional(
                AttrType::String,
                "ProxyURL eg http://proxyserver:2195 Directs scrapes to proxy through this endpoint.",
            ),
        )
        .block("tls_config", NestedBlock::single(tls_config_schema()))
        .block(
            "bearer_token_secret",
            NestedBlock::single(secret_key_selector_schema()),
        )
        .block("basic_auth", NestedBlock::single(basic_auth_schema()))
        .block(
            "metric_relabelings",
            NestedBlock::list(relabel_config_schema()),
        )
        .block("relabelings", NestedBlock::list(relabel_config_schema()))
}

/// Read a list of relabeling rules
pub fn expand_relabel_configs(blocks: &[Fields<'_>]) -> Result<Vec<RelabelConfig>> {
    blocks
        .iter()
        .map(|rc| {
            Ok(RelabelConfig {
                source_labels: rc.strings("source_labels")?,
                separator: rc.string("separator")?,
                target_label: rc.string("target_label")?,
                regex: rc.string("regex")?,
                modulus: uint64(rc, "modulus")?,
                replacement: rc.string("replacement")?,
                action: rc.string("action")?,
            })
        })
        .collect()
}

/// Flatten a list of relabeling rules
pub fn flatten_relabel_configs(configs: &[RelabelConfig]) -> Vec<AttrValue> {
    configs
        .iter()
        .map(|rc| {
            ObjectBuilder::new()
                .set_nonzero("source_labels", rc.source_labels.clone())
                .set_nonzero("separator", rc.separator.as_str())
                .set_nonzero("target_label", rc.target_label.as_str())
                .set_nonzero("regex", rc.regex.as_str())
                .set_nonzero("modulus", rc.modulus)
                .set_nonzero("replacement", rc.replacement.as_str())
                .set_nonzero("action", rc.action.as_str())
                .build()
        })
        .collect()
}

/// Read a namespace selector
pub fn expand_namespace_selector(fields: &Fields<'_>) -> Result<NamespaceSelector> {
    Ok(NamespaceSelector {
        any: fields.bool("any")?,
        match_names: fields.strings("match_names")?,
    })
}

/// Flatten a namespace selector; `None` when it selects nothing extra
pub fn flatten_namespace_selector(selector: &NamespaceSelector) -> Option<AttrValue> {
    if selector.is_empty() {
        return None;
    }
    Some(
        ObjectBuilder::new()
            .set_nonzero("any", selector.any)
            .set_nonzero("match_names", selector.match_names.clone())
            .build(),
    )
}

fn expand_endpoint(fields: &Fields<'_>) -> Result<Endpoint> {
    Ok(Endpoint {
        port: fields.string("port")?,
        path: fields.string("path")?,
        scheme: fields.string("scheme")?,
        interval: fields.string("interval")?,
        scrape_timeout: fields.string("scrape_timeout")?,
        tls_config: fields
            .block("tls_config")?
            .map(|b| expand_tls_config(&b))
            .transpose()?,
        bearer_token_file: fields.string("bearer_token_file")?,
        bearer_token_secret: fields
            .block("bearer_token_secret")?
            .map(|b| expand_secret_key_ref(&b))
            .transpose()?,
        honor_labels: fields.bool("honor_labels")?,
        honor_timestamps: fields.opt_bool("honor_timestamps")?,
        basic_auth: fields
            .block("basic_auth")?
            .map(|b| expand_basic_auth(&b))
            .transpose()?,
        metric_relabelings: expand_relabel_configs(&fields.blocks("metric_relabelings")?)?,
        relabelings: expand_relabel_configs(&fields.blocks("relabelings")?)?,
        proxy_url: fields.opt_string("proxy_url")?,
    })
}

/// Read a list of endpoints
pub fn expand_endpoints(blocks: &[Fields<'_>]) -> Result<Vec<Endpoint>> {
    blocks.iter().map(expand_endpoint).collect()
}

/// Flatten a list of endpoints
pub fn flatten_endpoints(endpoints: &[Endpoint]) -> Vec<AttrValue> {
    endpoints
        .iter()
        .map(|ep| {
            ObjectBuilder::new()
                .set_nonzero("port", ep.port.as_str())
                .set_nonzero("path", ep.path.as_str())
                .set_nonzero("scheme", ep.scheme.as_str())
                .set_nonzero("interval", ep.interval.as_str())
                .set_nonzero("scrape_timeout", ep.scrape_timeout.as_str())
                .set_nonzero("bearer_token_file", ep.bearer_token_file.as_str())
                .set_nonzero("honor_labels", ep.honor_labels)
                .set_opt("honor_timestamps", ep.honor_timestamps)
                .set_opt("proxy_url", ep.proxy_url.clone())
                .set_block("tls_config", ep.tls_config.as_ref().map(flatten_tls_config))
                .set_block(
                    "bearer_token_secret",
                    ep.bearer_token_secret.as_ref().map(flatten_secret_key_ref),
                )
                .set_block("basic_auth", ep.basic_auth.as_ref().map(flatten_basic_auth))
                .set_blocks(
                    "metric_relabelings",
                    flatten_relabel_configs(&ep.metric_relabelings),
                )
                .set_blocks("relabelings", flatten_relabel_configs(&ep.relabelings))
                .build()
        })
        .collect()
}
