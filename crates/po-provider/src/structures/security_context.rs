//! Pod and container security contexts

use k8s_openapi::api::core::v1::{Capabilities, PodSecurityContext, SELinuxOptions, SecurityContext};
use po_common::schema::{AttrType, Attribute, Block, NestedBlock};
use po_common::{AttrValue, Fields, ObjectBuilder, Result};

fn se_linux_options_schema() -> Block {
    Block::new("SELinux context applied to the container")
        .attribute(
            "level",
            Attribute::optional(AttrType::String, "Level is SELinux level label that applies to the container."),
        )
        .attribute(
            "role",
            Attribute::optional(AttrType::String, "Role is a SELinux role label that applies to the container."),
        )
        .attribute(
            "type",
            Attribute::optional(AttrType::String, "Type is a SELinux type label that applies to the container."),
        )
        .attribute(
            "user",
            Attribute::optional(AttrType::String, "User is a SELinux user label that applies to the container."),
        )
}

/// Schema of a pod security context
pub fn pod_security_context_schema() -> Block {
    Block::new("Pod-level security attributes and common container settings")
        .attribute(
            "fs_group",
            Attribute::optional(
                AttrType::Int,
                "A special supplemental group that applies to all containers in a pod.",
            ),
        )
        .attribute(
            "run_as_group",
            Attribute::optional(
                AttrType::Int,
                "The GID to run the entrypoint of the container process.",
            ),
        )
        .attribute(
            "run_as_non_root",
            Attribute::optional(
                AttrType::Bool,
                "Indicates that the container must run as a non-root user.",
            ),
        )
        .attribute(
            "run_as_user",
            Attribute::optional(
                AttrType::Int,
                "The UID to run the entrypoint of the container process.",
            ),
        )
        .attribute(
            "supplemental_groups",
            Attribute::optional(
                AttrType::IntSet,
                "A list of groups applied to the first process run in each container, in addition to the container's primary GID.",
            ),
        )
        .block("se_linux_options", NestedBlock::single(se_linux_options_schema()))
}

/// Schema of a container security context
pub fn container_security_context_schema() -> Block {
    Block::new("Security options the container should be run with")
        .attribute(
            "allow_privilege_escalation",
            Attribute::optional(
                AttrType::Bool,
                "Controls whether a process can gain more privileges than its parent process.",
            ),
        )
        .attribute(
            "privileged",
            Attribute::optional(
                AttrType::Bool,
                "Run container in privileged mode. Processes in privileged containers are essentially equivalent to root on the host.",
            ),
        )
        .attribute(
            "read_only_root_filesystem",
            Attribute::optional(
                AttrType::Bool,
                "Whether this container has a read-only root filesystem.",
            ),
        )
        .attribute(
            "run_as_group",
            Attribute::optional(
                AttrType::Int,
                "The GID to run the entrypoint of the container process.",
            ),
        )
        .attribute(
            "run_as_non_root",
            Attribute::optional(
                AttrType::Bool,
                "Indicates that the container must run as a non-root user.",
            ),
        )
        .attribute(
            "run_as_user",
            Attribute::optional(
                AttrType::Int,
                "The UID to run the entrypoint of the container process.",
            ),
        )
        .block(
            "capabilities",
            NestedBlock::single(
                Block::new("The capabilities to add/drop when running containers")
                    .attribute("add", Attribute::optional(AttrType::StringList, "Added capabilities"))
                    .attribute("drop", Attribute::optional(AttrType::StringList, "Removed capabilities")),
            ),
        )
        .block("se_linux_options", NestedBlock::single(se_linux_options_schema()))
}

fn expand_se_linux_options(fields: &Fields<'_>) -> Result<SELinuxOptions> {
    Ok(SELinuxOptions {
        level: fields.opt_string("level")?,
        role: fields.opt_string("role")?,
        type_: fields.opt_string("type")?,
        user: fields.opt_string("user")?,
    })
}

fn flatten_se_linux_options(options: &SELinuxOptions) -> AttrValue {
    ObjectBuilder::new()
        .set_opt("level", options.level.clone())
        .set_opt("role", options.role.clone())
        .set_opt("type", options.type_.clone())
        .set_opt("user", options.user.clone())
        .build()
}

/// Read a pod security context
pub fn expand_pod_security_context(fields: &Fields<'_>) -> Result<PodSecurityContext> {
    let groups = fields.ints("supplemental_groups")?;
    Ok(PodSecurityContext {
        fs_group: fields.opt_int("fs_group")?,
        run_as_group: fields.opt_int("run_as_group")?,
        run_as_non_root: fields.opt_bool("run_as_non_root")?,
        run_as_user: fields.opt_int("run_as_user")?,
        se_linux_options: fields
            .block("se_linux_options")?
            .map(|b| expand_se_linux_options(&b))
            .transpose()?,
        supplemental_groups: (!groups.is_empty()).then_some(groups),
        ..Default::default()
    })
}

/// Flatten a pod security context
pub fn flatten_pod_security_context(sc: &PodSecurityContext) -> AttrValue {
    ObjectBuilder::new()
        .set_opt("fs_group", sc.fs_group)
        .set_opt("run_as_group", sc.run_as_group)
        .set_opt("run_as_non_root", sc.run_as_non_root)
        .set_opt("run_as_user", sc.run_as_user)
        .set_block(
            "se_linux_options",
            sc.se_linux_options.as_ref().map(flatten_se_linux_options),
        )
        .set_nonzero(
            "supplemental_groups",
            sc.supplemental_groups.clone().unwrap_or_default(),
        )
        .build()
}

/// Read a container security context
pub fn expand_container_security_context(fields: &Fields<'_>) -> Result<SecurityContext> {
    let capabilities = fields
        .block("capabilities")?
        .map(|caps| -> Result<Capabilities> {
            Ok(Capabilities {
                add: caps.opt_strings("add")?,
                drop: caps.opt_strings("drop")?,
            })
        })
        .transpose()?;

    Ok(SecurityContext {
        allow_privilege_escalation: fields.opt_bool("allow_privilege_escalation")?,
        capabilities,
        privileged: fields.opt_bool("privileged")?,
        read_only_root_filesystem: fields.opt_bool("read_only_root_filesystem")?,
        run_as_group: fields.opt_int("run_as_group")?,
        run_as_non_root: fields.opt_bool("run_as_non_root")?,
        run_as_user: fields.opt_int("run_as_user")?,
        se_linux_options: fields
            .block("se_linux_options")?
            .map(|b| expand_se_linux_options(&b))
            .transpose()?,
        ..Default::default()
    })
}

/// Flatten a container security context
pub fn flatten_container_security_context(sc: &SecurityContext) -> AttrValue {
    let capabilities = sc.capabilities.as_ref().map(|caps| {
        ObjectBuilder::new()
            .set_nonzero("add", caps.add.clone().unwrap_or_default())
            .set_nonzero("drop", caps.drop.clone().unwrap_or_default())
            .build()
    });

    ObjectBuilder::new()
        .set_opt("allow_privilege_escalation", sc.allow_privilege_escalation)
        .set_block("capabilities", capabilities)
        .set_opt("privileged", sc.privileged)
        .set_opt("read_only_root_filesystem", sc.read_only_root_filesystem)
        .set_opt("run_as_group", sc.run_as_group)
        .set_opt("run_as_non_root", sc.run_as_non_root)
        .set_opt("run_as_user", sc.run_as_user)
        .set_block(
            "se_linux_options",
            sc.se_linux_options.as_ref().map(flatten_se_linux_options),
        )
        .build()
}
