//! Executable schema declarations
//!
//! A [`Block`] declares the attributes and nested blocks of one object in the
//! attribute tree. Besides being translated into Terraform's schema types, the
//! declarations drive planning: validation, defaults, computed values,
//! force-new detection, and shaping flattened state so it matches what
//! Terraform expects.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Error;
use crate::validation;
use crate::value::AttrValue;

// =============================================================================
// Attribute paths
// =============================================================================

/// One step of an [`AttrPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Named attribute or nested block
    Attribute(String),
    /// Element of a list or nested block list
    Index(usize),
}

/// Path from the root of a resource to one attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrPath(Vec<PathStep>);

impl AttrPath {
    /// The empty (root) path
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend with a named attribute
    pub fn attribute(&self, name: &str) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Attribute(name.to_string()));
        Self(steps)
    }

    /// Extend with a list index
    pub fn index(&self, i: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Index(i));
        Self(steps)
    }

    /// Steps from the root
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match step {
                PathStep::Attribute(name) => f.write_str(name)?,
                PathStep::Index(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// Value type of a leaf attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// String
    String,
    /// Integer number
    Int,
    /// Boolean
    Bool,
    /// Ordered list of strings
    StringList,
    /// Unordered set of strings
    StringSet,
    /// Unordered set of integers
    IntSet,
    /// Map of string to string
    StringMap,
}

impl AttrType {
    fn check(self, value: &AttrValue) -> Result<(), String> {
        let ok = match (self, value) {
            (AttrType::String, AttrValue::String(_)) => true,
            (AttrType::Int, AttrValue::Int(_)) => true,
            (AttrType::Bool, AttrValue::Bool(_)) => true,
            (AttrType::StringList | AttrType::StringSet, AttrValue::List(items)) => items
                .iter()
                .all(|v| matches!(v, AttrValue::String(_) | AttrValue::Unknown)),
            (AttrType::IntSet, AttrValue::List(items)) => items
                .iter()
                .all(|v| matches!(v, AttrValue::Int(_) | AttrValue::Unknown)),
            (AttrType::StringMap, AttrValue::Map(items)) => items
                .values()
                .all(|v| matches!(v, AttrValue::String(_) | AttrValue::Unknown)),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(format!("expected {}, got {}", self, value.type_name()))
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttrType::String => "string",
            AttrType::Int => "integer",
            AttrType::Bool => "bool",
            AttrType::StringList => "list of strings",
            AttrType::StringSet => "set of strings",
            AttrType::IntSet => "set of integers",
            AttrType::StringMap => "map of strings",
        };
        f.write_str(name)
    }
}

/// Who supplies an attribute's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Must be set in configuration
    Required,
    /// May be set in configuration
    Optional,
    /// Set by the provider only
    Computed,
    /// Set in configuration or, when absent, by the provider
    OptionalComputed,
}

/// Value check run on a known, non-null attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// String must be one of the listed values
    OneOf(&'static [&'static str]),
    /// String must be empty or an integer
    NullableInt,
    /// Map keys must be qualified names and values valid label values
    Labels,
    /// Map keys must be qualified names
    Annotations,
    /// String must be a DNS-1123 subdomain
    Name,
    /// String must be a Kubernetes resource quantity
    Quantity,
    /// String must be octal file mode bits (`0644`)
    ModeBits,
}

impl Validator {
    fn check(self, value: &AttrValue) -> Vec<String> {
        match (self, value) {
            (Validator::OneOf(allowed), AttrValue::String(s)) => {
                if allowed.contains(&s.as_str()) {
                    vec![]
                } else {
                    vec![format!("expected one of {:?}, got {:?}", allowed, s)]
                }
            }
            (Validator::NullableInt, AttrValue::String(s)) => {
                if s.is_empty() || s.parse::<i64>().is_ok() {
                    vec![]
                } else {
                    vec![format!("expected an integer or empty string, got {:?}", s)]
                }
            }
            (Validator::Labels, AttrValue::Map(m)) => m
                .iter()
                .flat_map(|(k, v)| {
                    let mut errs = validation::qualified_name(k);
                    if let AttrValue::String(v) = v {
                        errs.extend(validation::label_value(v));
                    }
                    errs.into_iter().map(move |e| format!("{:?}: {}", k, e))
                })
                .collect(),
            (Validator::Annotations, AttrValue::Map(m)) => m
                .keys()
                .flat_map(|k| {
                    validation::qualified_name(&k.to_lowercase())
                        .into_iter()
                        .map(move |e| format!("{:?}: {}", k, e))
                })
                .collect(),
            (Validator::Name, AttrValue::String(s)) => validation::dns1123_subdomain(s),
            (Validator::Quantity, AttrValue::String(q)) => {
                if validation::is_quantity(q) {
                    vec![]
                } else {
                    vec![format!("{:?} is not a valid quantity", q)]
                }
            }
            (Validator::ModeBits, AttrValue::String(m)) => match validation::parse_mode_bits(m) {
                Some(_) => vec![],
                None => vec![format!("{:?} is not an octal mode between 0 and 0777", m)],
            },
            _ => vec![],
        }
    }
}

/// Declaration of one leaf attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Value type
    pub ty: AttrType,
    /// Human readable description
    pub description: String,
    /// Who supplies the value
    pub mode: Mode,
    /// Changing the value requires replacing the resource
    pub force_new: bool,
    /// Value used when configuration leaves it unset
    pub default: Option<AttrValue>,
    /// Extra value check
    pub validator: Option<Validator>,
    /// Sibling attributes that may not be set together with this one
    pub conflicts_with: Vec<&'static str>,
}

impl Attribute {
    fn new(ty: AttrType, description: impl Into<String>, mode: Mode) -> Self {
        Self {
            ty,
            description: description.into(),
            mode,
            force_new: false,
            default: None,
            validator: None,
            conflicts_with: Vec::new(),
        }
    }

    /// Attribute that must be configured
    pub fn required(ty: AttrType, description: impl Into<String>) -> Self {
        Self::new(ty, description, Mode::Required)
    }

    /// Attribute that may be configured
    pub fn optional(ty: AttrType, description: impl Into<String>) -> Self {
        Self::new(ty, description, Mode::Optional)
    }

    /// Attribute only the provider sets
    pub fn computed(ty: AttrType, description: impl Into<String>) -> Self {
        Self::new(ty, description, Mode::Computed)
    }

    /// Attribute the provider fills in when configuration leaves it unset
    pub fn optional_computed(ty: AttrType, description: impl Into<String>) -> Self {
        Self::new(ty, description, Mode::OptionalComputed)
    }

    /// Mark as requiring replacement on change
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set the default value
    pub fn default_value(mut self, value: impl Into<AttrValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Attach a validator
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Declare conflicting sibling attributes
    pub fn conflicts_with(mut self, names: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(names);
        self
    }

    /// Whether the provider may supply the value
    pub fn is_computed(&self) -> bool {
        matches!(self.mode, Mode::Computed | Mode::OptionalComputed) || self.default.is_some()
    }
}

/// Declaration of a nested block, kept as an ordered list of elements
#[derive(Debug, Clone)]
pub struct NestedBlock {
    /// Shape of each element
    pub block: Block,
    /// Minimum number of elements
    pub min_items: usize,
    /// Maximum number of elements
    pub max_items: Option<usize>,
    /// Changing the block requires replacing the resource
    pub force_new: bool,
}

impl NestedBlock {
    /// Repeated block kept in order
    pub fn list(block: Block) -> Self {
        Self {
            block,
            min_items: 0,
            max_items: None,
            force_new: false,
        }
    }

    /// Block that appears at most once
    pub fn single(block: Block) -> Self {
        Self::list(block).max_items(1)
    }

    /// Require at least one element
    pub fn required(mut self) -> Self {
        self.min_items = self.min_items.max(1);
        self
    }

    /// Limit the number of elements
    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    /// Mark as requiring replacement on change
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// Declaration of one object of the attribute tree
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Human readable description
    pub description: String,
    /// Leaf attributes by name
    pub attributes: BTreeMap<&'static str, Attribute>,
    /// Nested blocks by name
    pub blocks: BTreeMap<&'static str, NestedBlock>,
}

impl Block {
    /// Start an empty block
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Add a leaf attribute
    pub fn attribute(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    /// Add a nested block
    pub fn block(mut self, name: &'static str, block: NestedBlock) -> Self {
        self.blocks.insert(name, block);
        self
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check a configuration value against the declaration
    ///
    /// Unknown values are skipped; they are validated again once known.
    pub fn validate(&self, value: &AttrValue) -> Vec<Error> {
        let mut errors = Vec::new();
        self.validate_at(value, &AttrPath::root(), &mut errors);
        errors
    }

    fn validate_at(&self, value: &AttrValue, path: &AttrPath, errors: &mut Vec<Error>) {
        let fields = match value {
            AttrValue::Map(m) => Some(m),
            AttrValue::Null => None,
            AttrValue::Unknown => return,
            other => {
                errors.push(Error::validation_for_field(
                    path.to_string(),
                    format!("expected an object, got {}", other.type_name()),
                ));
                return;
            }
        };
        let get = |key: &str| fields.and_then(|m| m.get(key)).unwrap_or(&AttrValue::Null);

        for (name, attr) in &self.attributes {
            let v = get(*name);
            let at = path.attribute(name);
            match v {
                AttrValue::Unknown => continue,
                AttrValue::Null => {
                    if attr.mode == Mode::Required {
                        errors.push(Error::validation_for_field(
                            at.to_string(),
                            "attribute is required",
                        ));
                    }
                    continue;
                }
                _ => {}
            }
            if attr.mode == Mode::Computed {
                errors.push(Error::validation_for_field(
                    at.to_string(),
                    "attribute is computed and cannot be configured",
                ));
                continue;
            }
            if let Err(msg) = attr.ty.check(v) {
                errors.push(Error::validation_for_field(at.to_string(), msg));
                continue;
            }
            if let Some(validator) = attr.validator {
                for msg in validator.check(v) {
                    errors.push(Error::validation_for_field(at.to_string(), msg));
                }
            }
            for other in &attr.conflicts_with {
                if !get(*other).is_null() {
                    errors.push(Error::validation_for_field(
                        at.to_string(),
                        format!("conflicts with {}", other),
                    ));
                }
            }
        }

        for (name, nested) in &self.blocks {
            let at = path.attribute(name);
            let items = match get(*name) {
                AttrValue::Null => &[][..],
                AttrValue::Unknown => continue,
                AttrValue::List(items) => items.as_slice(),
                other => {
                    errors.push(Error::validation_for_field(
                        at.to_string(),
                        format!("expected a block list, got {}", other.type_name()),
                    ));
                    continue;
                }
            };
            if items.len() < nested.min_items {
                errors.push(Error::validation_for_field(
                    at.to_string(),
                    format!("at least {} block(s) required", nested.min_items),
                ));
            }
            if let Some(max) = nested.max_items {
                if items.len() > max {
                    errors.push(Error::validation_for_field(
                        at.to_string(),
                        format!("no more than {} block(s) allowed", max),
                    ));
                }
            }
            for (i, item) in items.iter().enumerate() {
                nested.block.validate_at(item, &at.index(i), errors);
            }
        }
    }

    // =========================================================================
    // Planning
    // =========================================================================

    /// Fill in declared defaults for attributes left null
    pub fn apply_defaults(&self, value: &mut AttrValue) {
        let AttrValue::Map(fields) = value else {
            return;
        };
        for (name, attr) in &self.attributes {
            if let Some(default) = &attr.default {
                let slot = fields.entry(name.to_string()).or_default();
                if slot.is_null() {
                    *slot = default.clone();
                }
            }
        }
        for (name, nested) in &self.blocks {
            if let Some(AttrValue::List(items)) = fields.get_mut(*name) {
                for item in items {
                    nested.block.apply_defaults(item);
                }
            }
        }
    }

    /// Mark computed attributes as unknown
    ///
    /// Null computed attributes always become unknown. With `overwrite`, every
    /// provider-only attribute becomes unknown, for plans whose apply will
    /// change server-managed fields.
    pub fn mark_computed_unknown(&self, value: &mut AttrValue, overwrite: bool) {
        let AttrValue::Map(fields) = value else {
            return;
        };
        for (name, attr) in &self.attributes {
            if !attr.is_computed() {
                continue;
            }
            let slot = fields.entry(name.to_string()).or_default();
            if slot.is_null() || (overwrite && attr.mode == Mode::Computed) {
                *slot = AttrValue::Unknown;
            }
        }
        for (name, nested) in &self.blocks {
            if let Some(AttrValue::List(items)) = fields.get_mut(*name) {
                for item in items {
                    nested.block.mark_computed_unknown(item, overwrite);
                }
            }
        }
    }

    /// Paths of force-new attributes and blocks whose value changed
    pub fn force_new_changes(&self, prior: &AttrValue, proposed: &AttrValue) -> Vec<AttrPath> {
        let mut paths = Vec::new();
        self.force_new_at(prior, proposed, &AttrPath::root(), &mut paths);
        paths
    }

    fn force_new_at(
        &self,
        prior: &AttrValue,
        proposed: &AttrValue,
        path: &AttrPath,
        paths: &mut Vec<AttrPath>,
    ) {
        let null = AttrValue::Null;
        for (name, attr) in &self.attributes {
            if !attr.force_new {
                continue;
            }
            let before = prior.get(name).unwrap_or(&null);
            let after = proposed.get(name).unwrap_or(&null);
            if before != after {
                paths.push(path.attribute(name));
            }
        }
        for (name, nested) in &self.blocks {
            let before = prior.get(name).and_then(AttrValue::as_list).unwrap_or(&[]);
            let after = proposed.get(name).and_then(AttrValue::as_list).unwrap_or(&[]);
            if nested.force_new {
                if before != after {
                    paths.push(path.attribute(name));
                }
                continue;
            }
            let at = path.attribute(name);
            for (i, (b, a)) in before.iter().zip(after).enumerate() {
                nested.block.force_new_at(b, a, &at.index(i), paths);
            }
        }
    }

    // =========================================================================
    // State shaping
    // =========================================================================

    /// Give a value exactly the declared shape
    ///
    /// Every declared attribute is present (null when missing), every nested
    /// block is a list (empty when missing), and undeclared keys are dropped.
    pub fn conform(&self, value: AttrValue) -> AttrValue {
        let mut fields = match value {
            AttrValue::Map(m) => m,
            _ => BTreeMap::new(),
        };
        let mut out = BTreeMap::new();
        for name in self.attributes.keys() {
            out.insert(name.to_string(), fields.remove(*name).unwrap_or_default());
        }
        for (name, nested) in &self.blocks {
            let items = match fields.remove(*name) {
                Some(AttrValue::List(items)) => items
                    .into_iter()
                    .map(|item| nested.block.conform(item))
                    .collect(),
                _ => Vec::new(),
            };
            out.insert(name.to_string(), AttrValue::List(items));
        }
        AttrValue::Map(out)
    }

    /// Align observed state with how the reference spelled zero values
    ///
    /// The API server drops empty strings, false booleans and empty
    /// collections. When the reference (configuration, plan, or prior state)
    /// spelled such a value explicitly and the observed state has nothing, the
    /// reference spelling is kept; an explicit zero the reference did not
    /// have is dropped. Provider-only attributes are left untouched.
    pub fn reconcile(&self, reference: &AttrValue, observed: AttrValue) -> AttrValue {
        let AttrValue::Map(mut fields) = observed else {
            return observed;
        };
        let null = AttrValue::Null;
        for (name, attr) in &self.attributes {
            if attr.mode == Mode::Computed {
                continue;
            }
            let want = reference.get(name).unwrap_or(&null);
            let slot = fields.entry(name.to_string()).or_default();
            if slot.is_null() && want.is_zero() && !want.is_null() {
                *slot = want.clone();
            } else if want.is_null() && !slot.is_null() && slot.is_zero() {
                *slot = AttrValue::Null;
            }
        }
        for (name, nested) in &self.blocks {
            let want = reference.get(name).and_then(AttrValue::as_list).unwrap_or(&[]);
            if let Some(AttrValue::List(items)) = fields.remove(*name) {
                let items = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| match want.get(i) {
                        Some(w) => nested.block.reconcile(w, item),
                        None => item,
                    })
                    .collect();
                fields.insert(name.to_string(), AttrValue::List(items));
            }
        }
        AttrValue::Map(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn toleration() -> Block {
        Block::new("toleration")
            .attribute(
                "effect",
                Attribute::optional(AttrType::String, "effect").validator(Validator::OneOf(&[
                    "NoSchedule",
                    "PreferNoSchedule",
                    "NoExecute",
                ])),
            )
            .attribute(
                "operator",
                Attribute::optional(AttrType::String, "operator").default_value("Equal"),
            )
            .attribute(
                "toleration_seconds",
                Attribute::optional(AttrType::String, "seconds").validator(Validator::NullableInt),
            )
    }

    fn resource() -> Block {
        Block::new("resource")
            .attribute("id", Attribute::computed(AttrType::String, "id"))
            .block(
                "metadata",
                NestedBlock::single(
                    Block::new("metadata")
                        .attribute(
                            "name",
                            Attribute::optional_computed(AttrType::String, "name")
                                .force_new()
                                .conflicts_with(&["generate_name"]),
                        )
                        .attribute(
                            "generate_name",
                            Attribute::optional(AttrType::String, "prefix").force_new(),
                        )
                        .attribute(
                            "labels",
                            Attribute::optional(AttrType::StringMap, "labels")
                                .validator(Validator::Labels),
                        )
                        .attribute(
                            "resource_version",
                            Attribute::computed(AttrType::String, "version"),
                        ),
                )
                .required(),
            )
            .block(
                "spec",
                NestedBlock::single(
                    Block::new("spec")
                        .attribute(
                            "replicas",
                            Attribute::optional(AttrType::Int, "replicas").default_value(3i64),
                        )
                        .attribute("paused", Attribute::optional(AttrType::Bool, "paused"))
                        .attribute(
                            "image",
                            Attribute::optional(AttrType::String, "image").force_new(),
                        )
                        .block("toleration", NestedBlock::list(toleration())),
                )
                .required(),
            )
    }

    fn messages(errors: &[Error]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn validate_accepts_good_config() {
        let config = AttrValue::from(json!({
            "metadata": [{"name": "main", "labels": {"app.kubernetes.io/name": "alertmanager"}}],
            "spec": [{"replicas": 2, "toleration": [{"effect": "NoExecute", "toleration_seconds": "300"}]}],
        }));
        assert!(resource().validate(&config).is_empty());
    }

    #[test]
    fn validate_reports_paths() {
        let config = AttrValue::from(json!({
            "id": "x",
            "metadata": [{"name": "a", "generate_name": "b", "labels": {"bad key!": "v"}}],
            "spec": [{"replicas": "three", "toleration": [{"effect": "Sometimes", "toleration_seconds": "soon"}]}],
        }));
        let errors = resource().validate(&config);
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field()).collect();

        assert!(fields.contains(&"id"));
        assert!(fields.contains(&"metadata.0.name"));
        assert!(fields.contains(&"metadata.0.labels"));
        assert!(fields.contains(&"spec.0.replicas"));
        assert!(fields.contains(&"spec.0.toleration.0.effect"));
        assert!(fields.contains(&"spec.0.toleration.0.toleration_seconds"));
        assert_eq!(errors.len(), 6, "{:?}", messages(&errors));
    }

    #[test]
    fn validate_enforces_block_cardinality() {
        let config = AttrValue::from(json!({
            "metadata": [{"name": "a"}, {"name": "b"}],
        }));
        let errors = resource().validate(&config);
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field()).collect();
        assert_eq!(fields, vec!["metadata", "spec"], "{:?}", messages(&errors));
    }

    #[test]
    fn validate_skips_unknown_values() {
        let mut config = AttrValue::from(json!({
            "metadata": [{"name": "main"}],
            "spec": [{}],
        }));
        config.insert("spec", AttrValue::Unknown);
        assert!(resource().validate(&config).is_empty());
    }

    #[test]
    fn defaults_fill_nested_blocks() {
        let mut plan = AttrValue::from(json!({
            "spec": [{"replicas": null, "toleration": [{"effect": "NoSchedule"}]}],
        }));
        resource().apply_defaults(&mut plan);
        assert_eq!(plan.to_json()["spec"][0]["replicas"], 3);
        assert_eq!(plan.to_json()["spec"][0]["toleration"][0]["operator"], "Equal");
    }

    #[test]
    fn computed_values_become_unknown() {
        let mut plan = AttrValue::from(json!({
            "id": null,
            "metadata": [{"name": null, "resource_version": "17"}],
        }));
        let schema = resource();

        schema.mark_computed_unknown(&mut plan, false);
        assert!(plan.get("id").is_some_and(AttrValue::is_unknown));
        let meta = &plan.get("metadata").and_then(AttrValue::as_list).expect("list")[0];
        assert!(meta.get("name").is_some_and(AttrValue::is_unknown));
        assert_eq!(meta.get("resource_version"), Some(&AttrValue::from("17")));

        schema.mark_computed_unknown(&mut plan, true);
        let meta = &plan.get("metadata").and_then(AttrValue::as_list).expect("list")[0];
        assert!(meta.get("resource_version").is_some_and(AttrValue::is_unknown));
    }

    #[test]
    fn force_new_paths_point_at_changed_attributes() {
        let prior = AttrValue::from(json!({
            "metadata": [{"name": "main"}],
            "spec": [{"replicas": 3, "image": "quay.io/prometheus/alertmanager:v0.20.0"}],
        }));
        let proposed = AttrValue::from(json!({
            "metadata": [{"name": "main"}],
            "spec": [{"replicas": 5, "image": "quay.io/prometheus/alertmanager:v0.21.0"}],
        }));
        let paths = resource().force_new_changes(&prior, &proposed);
        let paths: Vec<_> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(paths, vec!["spec.0.image"]);
    }

    #[test]
    fn conform_fills_shape_and_drops_unknown_keys() {
        let state = AttrValue::from(json!({
            "metadata": [{"name": "main", "extra": 1}],
        }));
        let state = resource().conform(state);
        let json = state.to_json();

        assert!(json["id"].is_null());
        assert!(json["metadata"][0]["generate_name"].is_null());
        assert!(json["metadata"][0].get("extra").is_none());
        assert_eq!(json["spec"], json!([]));
    }

    #[test]
    fn reconcile_keeps_reference_spelling_of_zero_values() {
        let reference = AttrValue::from(json!({
            "metadata": [{"name": "main", "labels": {}}],
            "spec": [{"paused": false, "replicas": 3}],
        }));
        let observed = AttrValue::from(json!({
            "metadata": [{"name": "main", "labels": null, "resource_version": ""}],
            "spec": [{"paused": null, "replicas": 3, "image": ""}],
        }));
        let json = resource().reconcile(&reference, observed).to_json();

        assert_eq!(json["metadata"][0]["labels"], json!({}));
        assert_eq!(json["metadata"][0]["resource_version"], "");
        assert_eq!(json["spec"][0]["paused"], false);
        assert!(json["spec"][0]["image"].is_null());
    }

    #[test]
    fn paths_render_dotted() {
        let p = AttrPath::root().attribute("spec").index(0).attribute("replicas");
        assert_eq!(p.to_string(), "spec.0.replicas");
        assert_eq!(p.steps().len(), 3);
    }
}
