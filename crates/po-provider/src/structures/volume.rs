//! Pod volumes and container volume mounts

use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, EmptyDirVolumeSource, HostPathVolumeSource, KeyToPath,
    PersistentVolumeClaimVolumeSource, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use po_common::schema::{AttrType, Attribute, Block, NestedBlock, Validator};
use po_common::validation::{format_mode_bits, parse_mode_bits};
use po_common::{AttrValue, Error, Fields, ObjectBuilder, Result};

// =============================================================================
// Schemas
// =============================================================================

fn key_to_path_schema() -> Block {
    Block::new("Projection of a key into a file")
        .attribute("key", Attribute::optional(AttrType::String, "The key to project."))
        .attribute(
            "mode",
            Attribute::optional(
                AttrType::String,
                "Mode bits to use on this file, must be a value between 0000 and 0777.",
            )
            .validator(Validator::ModeBits),
        )
        .attribute(
            "path",
            Attribute::optional(
                AttrType::String,
                "The relative path of the file to map the key to.",
            ),
        )
}

fn default_mode_attribute() -> Attribute {
    Attribute::optional(
        AttrType::String,
        "Mode bits to use on created files by default. Must be a value between 0000 and 0777.",
    )
    .validator(Validator::ModeBits)
}

/// Schema of one pod volume
pub fn volume_schema() -> Block {
    Block::new("A named volume that may be accessed by any container in the pod")
        .attribute(
            "name",
            Attribute::required(
                AttrType::String,
                "Volume's name. Must be a DNS_LABEL and unique within the pod.",
            ),
        )
        .block(
            "empty_dir",
            NestedBlock::single(
                Block::new("Temporary directory that shares a pod's lifetime")
                    .attribute(
                        "medium",
                        Attribute::optional(
                            AttrType::String,
                            "What type of storage medium should back this directory.",
                        )
                        .validator(Validator::OneOf(&["", "Memory"])),
                    )
                    .attribute(
                        "size_limit",
                        Attribute::optional(
                            AttrType::String,
                            "Total amount of local storage required for this EmptyDir volume.",
                        )
                        .validator(Validator::Quantity),
                    ),
            ),
        )
        .block(
            "config_map",
            NestedBlock::single(
                Block::new("ConfigMap that should populate this volume")
                    .attribute("name", Attribute::optional(AttrType::String, "Name of the referent."))
                    .attribute("default_mode", default_mode_attribute())
                    .attribute(
                        "optional",
                        Attribute::optional(
                            AttrType::Bool,
                            "Specify whether the ConfigMap or its keys must be defined.",
                        ),
                    )
                    .block("items", NestedBlock::list(key_to_path_schema())),
            ),
        )
        .block(
            "secret",
            NestedBlock::single(
                Block::new("Secret that should populate this volume")
                    .attribute(
                        "secret_name",
                        Attribute::optional(
                            AttrType::String,
                            "Name of the secret in the pod's namespace to use.",
                        ),
                    )
                    .attribute("default_mode", default_mode_attribute())
                    .attribute(
                        "optional",
                        Attribute::optional(
                            AttrType::Bool,
                            "Specify whether the Secret or its keys must be defined.",
                        ),
                    )
                    .block("items", NestedBlock::list(key_to_path_schema())),
            ),
        )
        .block(
            "host_path",
            NestedBlock::single(
                Block::new("Pre-existing file or directory on the host machine")
                    .attribute(
                        "path",
                        Attribute::optional(AttrType::String, "Path of the directory on the host."),
                    )
                    .attribute(
                        "type",
                        Attribute::optional(AttrType::String, "Type for HostPath volume."),
                    ),
            ),
        )
        .block(
            "persistent_volume_claim",
            NestedBlock::single(
                Block::new("Reference to a PersistentVolumeClaim in the same namespace")
                    .attribute(
                        "claim_name",
                        Attribute::optional(
                            AttrType::String,
                            "Name of a PersistentVolumeClaim in the same namespace as the pod using this volume.",
                        ),
                    )
                    .attribute(
                        "read_only",
                        Attribute::optional(AttrType::Bool, "Force the ReadOnly setting in VolumeMounts."),
                    ),
            ),
        )
}

/// Schema of one container volume mount
pub fn volume_mount_schema() -> Block {
    Block::new("Mounting of a volume within a container")
        .attribute(
            "mount_path",
            Attribute::required(
                AttrType::String,
                "Path within the container at which the volume should be mounted. Must not contain ':'.",
            ),
        )
        .attribute(
            "name",
            Attribute::required(AttrType::String, "This must match the Name of a Volume."),
        )
        .attribute(
            "read_only",
            Attribute::optional(
                AttrType::Bool,
                "Mounted read-only if true, read-write otherwise (false or unspecified).",
            ),
        )
        .attribute(
            "sub_path",
            Attribute::optional(
                AttrType::String,
                "Path within the volume from which the container's volume should be mounted.",
            ),
        )
        .attribute(
            "mount_propagation",
            Attribute::optional(
                AttrType::String,
                "Mount propagation mode. Valid values are None, HostToContainer and Bidirectional.",
            )
            .validator(Validator::OneOf(&["None", "HostToContainer", "Bidirectional"])),
        )
}

// =============================================================================
// Volumes
// =============================================================================

fn expand_mode(fields: &Fields<'_>, key: &str) -> Result<Option<i32>> {
    fields
        .opt_string(key)?
        .map(|s| {
            parse_mode_bits(&s).ok_or_else(|| {
                Error::decode(
                    fields.path_of(key),
                    format!("{:?} is not an octal mode between 0 and 0777", s),
                )
            })
        })
        .transpose()
}

fn expand_items(fields: &Fields<'_>) -> Result<Option<Vec<KeyToPath>>> {
    let items = fields
        .blocks("items")?
        .iter()
        .map(|item| {
            Ok(KeyToPath {
                key: item.string("key")?,
                mode: expand_mode(item, "mode")?,
                path: item.string("path")?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((!items.is_empty()).then_some(items))
}

fn flatten_items(items: Option<&Vec<KeyToPath>>) -> Vec<AttrValue> {
    items
        .into_iter()
        .flatten()
        .map(|item| {
            ObjectBuilder::new()
                .set_nonzero("key", item.key.as_str())
                .set_opt("mode", item.mode.map(format_mode_bits))
                .set_nonzero("path", item.path.as_str())
                .build()
        })
        .collect()
}

fn expand_volume(fields: &Fields<'_>) -> Result<Volume> {
    let empty_dir = fields
        .block("empty_dir")?
        .map(|b| -> Result<EmptyDirVolumeSource> {
            Ok(EmptyDirVolumeSource {
                medium: b.opt_string("medium")?,
                size_limit: b.opt_string("size_limit")?.map(Quantity),
            })
        })
        .transpose()?;

    let config_map = fields
        .block("config_map")?
        .map(|b| -> Result<ConfigMapVolumeSource> {
            Ok(ConfigMapVolumeSource {
                name: b.string("name")?,
                default_mode: expand_mode(&b, "default_mode")?,
                optional: b.opt_bool("optional")?,
                items: expand_items(&b)?,
            })
        })
        .transpose()?;

    let secret = fields
        .block("secret")?
        .map(|b| -> Result<SecretVolumeSource> {
            Ok(SecretVolumeSource {
                secret_name: b.opt_string("secret_name")?,
                default_mode: expand_mode(&b, "default_mode")?,
                optional: b.opt_bool("optional")?,
                items: expand_items(&b)?,
            })
        })
        .transpose()?;

    let host_path = fields
        .block("host_path")?
        .map(|b| -> Result<HostPathVolumeSource> {
            Ok(HostPathVolumeSource {
                path: b.string("path")?,
                type_: b.opt_string("type")?,
            })
        })
        .transpose()?;

    let persistent_volume_claim = fields
        .block("persistent_volume_claim")?
        .map(|b| -> Result<PersistentVolumeClaimVolumeSource> {
            Ok(PersistentVolumeClaimVolumeSource {
                claim_name: b.string("claim_name")?,
                read_only: b.opt_bool("read_only")?,
            })
        })
        .transpose()?;

    Ok(Volume {
        name: fields.string("name")?,
        empty_dir,
        config_map,
        secret,
        host_path,
        persistent_volume_claim,
        ..Default::default()
    })
}

/// Read a list of volumes
pub fn expand_volumes(blocks: &[Fields<'_>]) -> Result<Vec<Volume>> {
    blocks.iter().map(expand_volume).collect()
}

fn flatten_volume(volume: &Volume) -> AttrValue {
    let empty_dir = volume.empty_dir.as_ref().map(|s| {
        ObjectBuilder::new()
            .set_opt("medium", s.medium.clone())
            .set_opt("size_limit", s.size_limit.as_ref().map(|q| q.0.clone()))
            .build()
    });
    let config_map = volume.config_map.as_ref().map(|s| {
        ObjectBuilder::new()
            .set_nonzero("name", s.name.as_str())
            .set_opt("default_mode", s.default_mode.map(format_mode_bits))
            .set_opt("optional", s.optional)
            .set_blocks("items", flatten_items(s.items.as_ref()))
            .build()
    });
    let secret = volume.secret.as_ref().map(|s| {
        ObjectBuilder::new()
            .set_opt("secret_name", s.secret_name.clone())
            .set_opt("default_mode", s.default_mode.map(format_mode_bits))
            .set_opt("optional", s.optional)
            .set_blocks("items", flatten_items(s.items.as_ref()))
            .build()
    });
    let host_path = volume.host_path.as_ref().map(|s| {
        ObjectBuilder::new()
            .set_nonzero("path", s.path.as_str())
            .set_opt("type", s.type_.clone())
            .build()
    });
    let persistent_volume_claim = volume.persistent_volume_claim.as_ref().map(|s| {
        ObjectBuilder::new()
            .set_nonzero("claim_name", s.claim_name.as_str())
            .set_opt("read_only", s.read_only)
            .build()
    });

    ObjectBuilder::new()
        .set("name", volume.name.as_str())
        .set_block("empty_dir", empty_dir)
        .set_block("config_map", config_map)
        .set_block("secret", secret)
        .set_block("host_path", host_path)
        .set_block("persistent_volume_claim", persistent_volume_claim)
        .build()
}

/// Flatten a list of volumes
pub fn flatten_volumes(volumes: &[Volume]) -> Vec<AttrValue> {
    volumes.iter().map(flatten_volume).collect()
}

// =============================================================================
// Volume mounts
// =============================================================================

/// Read a list of volume mounts
pub fn expand_volume_mounts(blocks: &[Fields<'_>]) -> Result<Vec<VolumeMount>> {
    blocks
        .iter()
        .map(|m| {
            Ok(VolumeMount {
                mount_path: m.string("mount_path")?,
                name: m.string("name")?,
                read_only: m.opt_bool("read_only")?,
                sub_path: m.opt_string("sub_path")?,
                mount_propagation: m.opt_string("mount_propagation")?,
                ..Default::default()
            })
        })
        .collect()
}

/// Flatten a list of volume mounts
pub fn flatten_volume_mounts(mounts: &[VolumeMount]) -> Vec<AttrValue> {
    mounts
        .iter()
        .map(|m| {
            ObjectBuilder::new()
                .set("mount_path", m.mount_path.as_str())
                .set("name", m.name.as_str())
                .set_opt("read_only", m.read_only)
                .set_opt("sub_path", m.sub_path.clone())
                .set_opt("mount_propagation", m.mount_propagation.clone())
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(config: &AttrValue) -> Fields<'_> {
        Fields::new(config, "spec.0").expect("object")
    }

    #[test]
    fn volumes_round_trip() {
        let config = AttrValue::from(json!({
            "volume": [
                {"name": "scratch", "empty_dir": [{"medium": "Memory", "size_limit": "1Gi"}]},
                {
                    "name": "rules",
                    "config_map": [{
                        "name": "extra-rules",
                        "default_mode": "0644",
                        "items": [{"key": "alerts.yaml", "path": "alerts.yaml", "mode": "0600"}],
                    }],
                },
                {"name": "tls", "secret": [{"secret_name": "am-tls", "optional": true}]},
                {"name": "host", "host_path": [{"path": "/var/log", "type": "Directory"}]},
                {"name": "data", "persistent_volume_claim": [{"claim_name": "am-data", "read_only": false}]},
            ]
        }));

        let volumes = expand_volumes(&spec(&config).blocks("volume").expect("blocks")).expect("expand");
        assert_eq!(volumes.len(), 5);

        let cm = volumes[1].config_map.as_ref().expect("config map");
        assert_eq!(cm.default_mode, Some(0o644));
        assert_eq!(cm.items.as_ref().map(|i| i[0].mode), Some(Some(0o600)));
        assert_eq!(
            volumes[0].empty_dir.as_ref().and_then(|e| e.size_limit.clone()),
            Some(Quantity("1Gi".to_string()))
        );

        assert_eq!(
            AttrValue::List(flatten_volumes(&volumes)),
            *config.get("volume").expect("volume")
        );
    }

    #[test]
    fn invalid_mode_names_the_path() {
        let config = AttrValue::from(json!({
            "volume": [{"name": "x", "secret": [{"default_mode": "0999"}]}]
        }));
        let err = expand_volumes(&spec(&config).blocks("volume").expect("blocks"))
            .expect_err("not octal");
        assert_eq!(err.field(), Some("spec.0.volume.0.secret.0.default_mode"));
    }

    #[test]
    fn volume_mounts_round_trip() {
        let config = AttrValue::from(json!({
            "volume_mount": [
                {"mount_path": "/etc/alertmanager/tls", "name": "tls", "read_only": true},
                {"mount_path": "/data", "name": "data", "sub_path": "am", "mount_propagation": "None"},
            ]
        }));

        let mounts = expand_volume_mounts(&spec(&config).blocks("volume_mount").expect("blocks"))
            .expect("expand");
        assert_eq!(mounts[0].read_only, Some(true));
        assert_eq!(mounts[1].sub_path.as_deref(), Some("am"));

        assert_eq!(
            AttrValue::List(flatten_volume_mounts(&mounts)),
            *config.get("volume_mount").expect("volume_mount")
        );
    }

    #[test]
    fn volume_mount_requires_path_and_name() {
        let errors = volume_mount_schema().validate(&AttrValue::from(json!({"read_only": true})));
        assert_eq!(errors.len(), 2);
    }
}
