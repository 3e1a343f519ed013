//! Containers, with their environment, ports and probes

use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, ExecAction, HTTPGetAction, HTTPHeader,
    ObjectFieldSelector, Probe, ResourceFieldSelector, TCPSocketAction,
};
use po_common::schema::{AttrType, Attribute, Block, NestedBlock, Validator};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};

use super::key_selector::{
    config_map_key_selector_schema, expand_config_map_key_ref, expand_secret_key_ref,
    flatten_config_map_key_ref, flatten_secret_key_ref, secret_key_selector_schema,
};
use super::resources::{expand_resource_requirements, flatten_resource_requirements, resources_schema};
use super::security_context::{
    container_security_context_schema, expand_container_security_context,
    flatten_container_security_context,
};
use super::volume::{expand_volume_mounts, flatten_volume_mounts, volume_mount_schema};
use super::{expand_int_or_string, flatten_int_or_string, int32, opt_int32};

const PROBES: [&str; 3] = ["liveness_probe", "readiness_probe", "startup_probe"];

// =============================================================================
// Schemas
// =============================================================================

fn env_schema() -> Block {
    let field_ref = Block::new("Selects a field of the pod")
        .attribute(
            "api_version",
            Attribute::optional(
                AttrType::String,
                "Version of the schema the FieldPath is written in terms of, defaults to \"v1\".",
            )
            .default_value("v1"),
        )
        .attribute(
            "field_path",
            Attribute::optional(AttrType::String, "Path of the field to select in the specified API version"),
        );

    let resource_field_ref = Block::new("Selects a resource of the container")
        .attribute(
            "container_name",
            Attribute::optional(AttrType::String, "Container name: required for volumes, optional for env vars"),
        )
        .attribute(
            "resource",
            Attribute::required(AttrType::String, "Resource to select"),
        );

    Block::new("Environment variable to set in the container")
        .attribute(
            "name",
            Attribute::required(AttrType::String, "Name of the environment variable. Must be a C_IDENTIFIER"),
        )
        .attribute(
            "value",
            Attribute::optional(
                AttrType::String,
                "Variable references $(VAR_NAME) are expanded using the previous defined environment variables in the container and any service environment variables.",
            ),
        )
        .block(
            "value_from",
            NestedBlock::single(
                Block::new("Source for the environment variable's value")
                    .block("config_map_key_ref", NestedBlock::single(config_map_key_selector_schema()))
                    .block("field_ref", NestedBlock::single(field_ref))
                    .block("resource_field_ref", NestedBlock::single(resource_field_ref))
                    .block("secret_key_ref", NestedBlock::single(secret_key_selector_schema())),
            ),
        )
}

fn port_schema() -> Block {
    Block::new("Network port exposed from the container")
        .attribute(
            "container_port",
            Attribute::required(
                AttrType::Int,
                "Number of port to expose on the pod's IP address. This must be a valid port number, 0 < x < 65536.",
            ),
        )
        .attribute(
            "host_ip",
            Attribute::optional(AttrType::String, "What host IP to bind the external port to."),
        )
        .attribute(
            "host_port",
            Attribute::optional(AttrType::Int, "Number of port to expose on the host."),
        )
        .attribute(
            "name",
            Attribute::optional(
                AttrType::String,
                "If specified, this must be an IANA_SVC_NAME and unique within the pod.",
            ),
        )
        .attribute(
            "protocol",
            Attribute::optional(AttrType::String, "Protocol for port. Must be UDP, TCP or SCTP.")
                .default_value("TCP")
                .validator(Validator::OneOf(&["TCP", "UDP", "SCTP"])),
        )
}

fn probe_schema() -> Block {
    let int = |description: &'static str| Attribute::optional(AttrType::Int, description);

    Block::new("Periodic probe of container health")
        .attribute("failure_threshold", int("Minimum consecutive failures for the probe to be considered failed after having succeeded."))
        .attribute("initial_delay_seconds", int("Number of seconds after the container has started before probes are initiated."))
        .attribute("period_seconds", int("How often (in seconds) to perform the probe."))
        .attribute("success_threshold", int("Minimum consecutive successes for the probe to be considered successful after having failed."))
        .attribute("timeout_seconds", int("Number of seconds after which the probe times out."))
        .block(
            "exec",
            NestedBlock::single(Block::new("Action to execute inside the container").attribute(
                "command",
                Attribute::optional(AttrType::StringList, "Command line to execute inside the container."),
            )),
        )
        .block(
            "http_get",
            NestedBlock::single(
                Block::new("HTTP GET request to perform")
                    .attribute("host", Attribute::optional(AttrType::String, "Host name to connect to, defaults to the pod IP."))
                    .attribute("path", Attribute::optional(AttrType::String, "Path to access on the HTTP server."))
                    .attribute(
                        "port",
                        Attribute::optional(AttrType::String, "Name or number of the port to access on the container."),
                    )
                    .attribute(
                        "scheme",
                        Attribute::optional(AttrType::String, "Scheme to use for connecting to the host.")
                            .validator(Validator::OneOf(&["HTTP", "HTTPS"])),
                    )
                    .block(
                        "http_header",
                        NestedBlock::list(
                            Block::new("Custom header to set in the request")
                                .attribute("name", Attribute::optional(AttrType::String, "The header field name"))
                                .attribute("value", Attribute::optional(AttrType::String, "The header field value")),
                        ),
                    ),
            ),
        )
        .block(
            "tcp_socket",
            NestedBlock::single(
                Block::new("TCP port to connect to")
                    .attribute("host", Attribute::optional(AttrType::String, "Host name to connect to, defaults to the pod IP."))
                    .attribute(
                        "port",
                        Attribute::required(AttrType::String, "Name or number of the port to access on the container."),
                    ),
            ),
        )
}

/// Schema of a container
///
/// Init containers carry no probes.
pub fn container_schema(init: bool) -> Block {
    let mut block = Block::new("A single application container to run within the pod")
        .attribute(
            "name",
            Attribute::required(AttrType::String, "Name of the container specified as a DNS_LABEL."),
        )
        .attribute(
            "image",
            Attribute::optional(AttrType::String, "Docker image name."),
        )
        .attribute(
            "image_pull_policy",
            Attribute::optional(AttrType::String, "Image pull policy. One of Always, Never, IfNotPresent.")
                .validator(Validator::OneOf(&["Always", "Never", "IfNotPresent"])),
        )
        .attribute(
            "args",
            Attribute::optional(AttrType::StringList, "Arguments to the entrypoint."),
        )
        .attribute(
            "command",
            Attribute::optional(AttrType::StringList, "Entrypoint array. Not executed within a shell."),
        )
        .attribute(
            "working_dir",
            Attribute::optional(AttrType::String, "Container's working directory."),
        )
        .attribute(
            "stdin",
            Attribute::optional(AttrType::Bool, "Whether this container should allocate a buffer for stdin in the container runtime."),
        )
        .attribute(
            "stdin_once",
            Attribute::optional(AttrType::Bool, "Whether the container runtime should close the stdin channel after it has been opened by a single attach."),
        )
        .attribute(
            "tty",
            Attribute::optional(AttrType::Bool, "Whether this container should allocate a TTY for itself."),
        )
        .attribute(
            "termination_message_path",
            Attribute::optional(
                AttrType::String,
                "Path at which the file to which the container's termination message will be written is mounted into the container's filesystem.",
            ),
        )
        .block("env", NestedBlock::list(env_schema()))
        .block("port", NestedBlock::list(port_schema()))
        .block("resources", NestedBlock::single(resources_schema()))
        .block("security_context", NestedBlock::single(container_security_context_schema()))
        .block("volume_mount", NestedBlock::list(volume_mount_schema()));

    if !init {
        for probe in PROBES {
            block = block.block(probe, NestedBlock::single(probe_schema()));
        }
    }
    block
}

// =============================================================================
// Expand
// =============================================================================

fn expand_env(blocks: &[Fields<'_>]) -> Result<Vec<EnvVar>> {
    blocks
        .iter()
        .map(|env| {
            let value_from = env
                .block("value_from")?
                .map(|from| -> Result<EnvVarSource> {
                    Ok(EnvVarSource {
                        config_map_key_ref: from
                            .block("config_map_key_ref")?
                            .map(|b| expand_config_map_key_ref(&b))
                            .transpose()?,
                        field_ref: from
                            .block("field_ref")?
                            .map(|b| -> Result<ObjectFieldSelector> {
                                Ok(ObjectFieldSelector {
                                    api_version: b.opt_string("api_version")?,
                                    field_path: b.string("field_path")?,
                                })
                            })
                            .transpose()?,
                        resource_field_ref: from
                            .block("resource_field_ref")?
                            .map(|b| -> Result<ResourceFieldSelector> {
                                Ok(ResourceFieldSelector {
                                    container_name: b.opt_string("container_name")?,
                                    resource: b.string("resource")?,
                                    divisor: None,
                                })
                            })
                            .transpose()?,
                        secret_key_ref: from
                            .block("secret_key_ref")?
                            .map(|b| expand_secret_key_ref(&b))
                            .transpose()?,
                    })
                })
                .transpose()?;

            Ok(EnvVar {
                name: env.string("name")?,
                value: env.opt_string("value")?,
                value_from,
            })
        })
        .collect()
}

fn expand_ports(blocks: &[Fields<'_>]) -> Result<Vec<ContainerPort>> {
    blocks
        .iter()
        .map(|port| {
            Ok(ContainerPort {
                container_port: int32(port, "container_port")?,
                host_ip: port.opt_string("host_ip")?,
                host_port: opt_int32(port, "host_port")?,
                name: port.opt_string("name")?,
                protocol: port.opt_string("protocol")?,
            })
        })
        .collect()
}

fn expand_probe(fields: &Fields<'_>) -> Result<Probe> {
    let exec = fields
        .block("exec")?
        .map(|b| -> Result<ExecAction> {
            Ok(ExecAction {
                command: b.opt_strings("command")?,
            })
        })
        .transpose()?;

    let http_get = fields
        .block("http_get")?
        .map(|b| -> Result<HTTPGetAction> {
            let headers = b
                .blocks("http_header")?
                .iter()
                .map(|h| {
                    Ok(HTTPHeader {
                        name: h.string("name")?,
                        value: h.string("value")?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(HTTPGetAction {
                host: b.opt_string("host")?,
                http_headers: (!headers.is_empty()).then_some(headers),
                path: b.opt_string("path")?,
                port: expand_int_or_string(b.string("port")?),
                scheme: b.opt_string("scheme")?,
            })
        })
        .transpose()?;

    let tcp_socket = fields
        .block("tcp_socket")?
        .map(|b| -> Result<TCPSocketAction> {
            Ok(TCPSocketAction {
                host: b.opt_string("host")?,
                port: expand_int_or_string(b.string("port")?),
            })
        })
        .transpose()?;

    Ok(Probe {
        exec,
        http_get,
        tcp_socket,
        failure_threshold: opt_int32(fields, "failure_threshold")?,
        initial_delay_seconds: opt_int32(fields, "initial_delay_seconds")?,
        period_seconds: opt_int32(fields, "period_seconds")?,
        success_threshold: opt_int32(fields, "success_threshold")?,
        timeout_seconds: opt_int32(fields, "timeout_seconds")?,
        ..Default::default()
    })
}

fn expand_container(fields: &Fields<'_>) -> Result<Container> {
    let env = expand_env(&fields.blocks("env")?)?;
    let ports = expand_ports(&fields.blocks("port")?)?;
    let volume_mounts = expand_volume_mounts(&fields.blocks("volume_mount")?)?;
    let probe = |key: &str| -> Result<Option<Probe>> {
        fields.block(key)?.map(|b| expand_probe(&b)).transpose()
    };

    Ok(Container {
        name: fields.string("name")?,
        image: fields.opt_string("image")?,
        image_pull_policy: fields.opt_string("image_pull_policy")?,
        args: fields.opt_strings("args")?,
        command: fields.opt_strings("command")?,
        working_dir: fields.opt_string("working_dir")?,
        stdin: fields.opt_bool("stdin")?,
        stdin_once: fields.opt_bool("stdin_once")?,
        tty: fields.opt_bool("tty")?,
        termination_message_path: fields.opt_string("termination_message_path")?,
        env: (!env.is_empty()).then_some(env),
        ports: (!ports.is_empty()).then_some(ports),
        volume_mounts: (!volume_mounts.is_empty()).then_some(volume_mounts),
        resources: fields
            .block("resources")?
            .map(|b| expand_resource_requirements(&b))
            .transpose()?,
        security_context: fields
            .block("security_context")?
            .map(|b| expand_container_security_context(&b))
            .transpose()?,
        liveness_probe: probe("liveness_probe")?,
        readiness_probe: probe("readiness_probe")?,
        startup_probe: probe("startup_probe")?,
        ..Default::default()
    })
}

/// Read a list of containers
pub fn expand_containers(blocks: &[Fields<'_>]) -> Result<Vec<Container>> {
    blocks.iter().map(expand_container).collect()
}

// =============================================================================
// Flatten
// =============================================================================

fn flatten_env(env: &[EnvVar]) -> Vec<AttrValue> {
    env.iter()
        .map(|e| {
            let value_from = e.value_from.as_ref().map(|from| {
                ObjectBuilder::new()
                    .set_block(
                        "config_map_key_ref",
                        from.config_map_key_ref.as_ref().map(flatten_config_map_key_ref),
                    )
                    .set_block(
                        "field_ref",
                        from.field_ref.as_ref().map(|f| {
                            ObjectBuilder::new()
                                .set_opt("api_version", f.api_version.clone())
                                .set_nonzero("field_path", f.field_path.as_str())
                                .build()
                        }),
                    )
                    .set_block(
                        "resource_field_ref",
                        from.resource_field_ref.as_ref().map(|r| {
                            ObjectBuilder::new()
                                .set_opt("container_name", r.container_name.clone())
                                .set("resource", r.resource.as_str())
                                .build()
                        }),
                    )
                    .set_block(
                        "secret_key_ref",
                        from.secret_key_ref.as_ref().map(flatten_secret_key_ref),
                    )
                    .build()
            });

            ObjectBuilder::new()
                .set("name", e.name.as_str())
                .set_opt("value", e.value.clone())
                .set_block("value_from", value_from)
                .build()
        })
        .collect()
}

fn flatten_ports(ports: &[ContainerPort]) -> Vec<AttrValue> {
    ports
        .iter()
        .map(|p| {
            ObjectBuilder::new()
                .set("container_port", p.container_port)
                .set_opt("host_ip", p.host_ip.clone())
                .set_opt("host_port", p.host_port)
                .set_opt("name", p.name.clone())
                .set_opt("protocol", p.protocol.clone())
                .build()
        })
        .collect()
}

fn flatten_probe(probe: &Probe) -> AttrValue {
    let exec = probe.exec.as_ref().map(|e| {
        ObjectBuilder::new()
            .set_nonzero("command", e.command.clone().unwrap_or_default())
            .build()
    });
    let http_get = probe.http_get.as_ref().map(|h| {
        let headers = h
            .http_headers
            .iter()
            .flatten()
            .map(|header| {
                ObjectBuilder::new()
                    .set_nonzero("name", header.name.as_str())
                    .set_nonzero("value", header.value.as_str())
                    .build()
            })
            .collect();
        ObjectBuilder::new()
            .set_opt("host", h.host.clone())
            .set_opt("path", h.path.clone())
            .set_nonzero("port", flatten_int_or_string(&h.port))
            .set_opt("scheme", h.scheme.clone())
            .set_blocks("http_header", headers)
            .build()
    });
    let tcp_socket = probe.tcp_socket.as_ref().map(|t| {
        ObjectBuilder::new()
            .set_opt("host", t.host.clone())
            .set("port", flatten_int_or_string(&t.port))
            .build()
    });

    ObjectBuilder::new()
        .set_opt("failure_threshold", probe.failure_threshold)
        .set_opt("initial_delay_seconds", probe.initial_delay_seconds)
        .set_opt("period_seconds", probe.period_seconds)
        .set_opt("success_threshold", probe.success_threshold)
        .set_opt("timeout_seconds", probe.timeout_seconds)
        .set_block("exec", exec)
        .set_block("http_get", http_get)
        .set_block("tcp_socket", tcp_socket)
        .build()
}

fn flatten_container(c: &Container) -> AttrValue {
    ObjectBuilder::new()
        .set("name", c.name.as_str())
        .set_opt("image", c.image.clone())
        .set_opt("image_pull_policy", c.image_pull_policy.clone())
        .set_nonzero("args", c.args.clone().unwrap_or_default())
        .set_nonzero("command", c.command.clone().unwrap_or_default())
        .set_opt("working_dir", c.working_dir.clone())
        .set_opt("stdin", c.stdin)
        .set_opt("stdin_once", c.stdin_once)
        .set_opt("tty", c.tty)
        .set_opt("termination_message_path", c.termination_message_path.clone())
        .set_blocks("env", flatten_env(c.env.as_deref().unwrap_or_default()))
        .set_blocks("port", flatten_ports(c.ports.as_deref().unwrap_or_default()))
        .set_blocks(
            "volume_mount",
            flatten_volume_mounts(c.volume_mounts.as_deref().unwrap_or_default()),
        )
        .set_block(
            "resources",
            c.resources.as_ref().map(flatten_resource_requirements),
        )
        .set_block(
            "security_context",
            c.security_context.as_ref().map(flatten_container_security_context),
        )
        .set_block("liveness_probe", c.liveness_probe.as_ref().map(flatten_probe))
        .set_block("readiness_probe", c.readiness_probe.as_ref().map(flatten_probe))
        .set_block("startup_probe", c.startup_probe.as_ref().map(flatten_probe))
        .build()
}

/// Flatten a list of containers
pub fn flatten_containers(containers: &[Container]) -> Vec<AttrValue> {
    containers.iter().map(flatten_container).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use serde_json::json;

    fn sidecar() -> AttrValue {
        AttrValue::from(json!({
            "name": "config-reloader",
            "image": "quay.io/prometheus-operator/prometheus-config-reloader:v0.40.0",
            "args": ["--reload-url=http://localhost:9093/-/reload"],
            "env": [
                {"name": "LOG_LEVEL", "value": "debug"},
                {
                    "name": "POD_NAME",
                    "value_from": [{"field_ref": [{"api_version": "v1", "field_path": "metadata.name"}]}],
                },
                {
                    "name": "TOKEN",
                    "value_from": [{"secret_key_ref": [{"name": "reloader", "key": "token"}]}],
                },
            ],
            "port": [{"container_port": 8080, "name": "reloader-web", "protocol": "TCP"}],
            "resources": [{"limits": [{"cpu": "100m", "memory": "25Mi"}]}],
            "volume_mount": [{"mount_path": "/etc/config", "name": "config", "read_only": true}],
            "liveness_probe": [{
                "http_get": [{"path": "/healthz", "port": "reloader-web", "http_header": [{"name": "X-Probe", "value": "1"}]}],
                "initial_delay_seconds": 5,
                "period_seconds": 10,
            }],
            "readiness_probe": [{"tcp_socket": [{"port": "8080"}]}],
        }))
    }

    #[test]
    fn container_round_trip() {
        let config = AttrValue::from(json!({"container": [sidecar().to_json()]}));
        let spec = Fields::new(&config, "spec.0").expect("object");

        let containers = expand_containers(&spec.blocks("container").expect("blocks")).expect("expand");
        let c = &containers[0];
        assert_eq!(c.name, "config-reloader");
        assert_eq!(c.ports.as_ref().map(|p| p[0].container_port), Some(8080));

        let liveness = c.liveness_probe.as_ref().expect("liveness");
        assert_eq!(
            liveness.http_get.as_ref().map(|h| h.port.clone()),
            Some(IntOrString::String("reloader-web".to_string()))
        );
        let readiness = c.readiness_probe.as_ref().expect("readiness");
        assert_eq!(
            readiness.tcp_socket.as_ref().map(|t| t.port.clone()),
            Some(IntOrString::Int(8080))
        );

        assert_eq!(flatten_containers(&containers), vec![sidecar()]);
    }

    #[test]
    fn init_containers_have_no_probes() {
        let init = container_schema(true);
        let regular = container_schema(false);
        for probe in PROBES {
            assert!(!init.blocks.contains_key(probe));
            assert!(regular.blocks.contains_key(probe));
        }
    }

    #[test]
    fn schema_defaults_and_validators() {
        let schema = container_schema(false);
        let mut config = AttrValue::from(json!({
            "name": "app",
            "image_pull_policy": "Sometimes",
            "port": [{"container_port": 80}],
        }));

        let errors = schema.validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("image_pull_policy"));

        schema.apply_defaults(&mut config);
        let port = &config.get("port").and_then(AttrValue::as_list).expect("ports")[0];
        assert_eq!(port.get("protocol"), Some(&AttrValue::from("TCP")));
    }

    #[test]
    fn bad_port_type_names_the_path() {
        let config = AttrValue::from(json!({
            "container": [{"name": "app", "port": [{"container_port": "http"}]}]
        }));
        let spec = Fields::new(&config, "spec.0").expect("object");
        let err = expand_containers(&spec.blocks("container").expect("blocks"))
            .expect_err("port must be a number");
        assert_eq!(err.field(), Some("spec.0.container.0.port.0.container_port"));
    }
}
