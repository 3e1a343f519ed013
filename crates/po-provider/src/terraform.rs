//! Bridge between the plugin protocol and the resource handlers
//!
//! Translates executable schemas into the host's schema types, turns errors
//! into diagnostics and implements [`tf_provider::Resource`] for every kind.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use kube::Client;
use tf_provider::attribute_path::AttributePath;
use tf_provider::{
    Attribute as TfAttribute, AttributeConstraint, AttributeType, Block as TfBlock, Description,
    Diagnostics, NestedBlock as TfNestedBlock, Resource, Schema, ValueEmpty,
};
use tokio::sync::OnceCell;
use tracing::debug;

use po_common::schema::{AttrType, Attribute, Block, Mode, NestedBlock};
use po_common::{AttrValue, Error};

use crate::resources::{MonitoringResource, ResourceHandler};
use crate::state::ResourceData;
use crate::store::KubeStore;

// =============================================================================
// Schema translation
// =============================================================================

fn attribute_type(ty: AttrType) -> AttributeType {
    match ty {
        AttrType::String => AttributeType::String,
        AttrType::Int => AttributeType::Number,
        AttrType::Bool => AttributeType::Bool,
        AttrType::StringList => AttributeType::List(AttributeType::String.into()),
        AttrType::StringSet => AttributeType::Set(AttributeType::String.into()),
        AttrType::IntSet => AttributeType::Set(AttributeType::Number.into()),
        AttrType::StringMap => AttributeType::Map(AttributeType::String.into()),
    }
}

fn attribute(attr: &Attribute) -> TfAttribute {
    // Defaults are filled in by the provider during plan, so Terraform must
    // accept a value it did not see in configuration.
    let constraint = match attr.mode {
        Mode::Required => AttributeConstraint::Required,
        Mode::Computed => AttributeConstraint::Computed,
        Mode::OptionalComputed => AttributeConstraint::OptionalComputed,
        Mode::Optional if attr.default.is_some() => AttributeConstraint::OptionalComputed,
        Mode::Optional => AttributeConstraint::Optional,
    };
    TfAttribute {
        attr_type: attribute_type(attr.ty),
        description: Description::plain(attr.description.clone()),
        constraint,
        ..Default::default()
    }
}

// Blocks limited to one element keep list nesting with at most one item.
// A required single block is still declared (0, 1); validation rejects it
// when missing.
fn nested_block(nested: &NestedBlock) -> TfNestedBlock {
    let block = block(&nested.block);
    match nested.max_items {
        Some(1) => TfNestedBlock::Optional(block),
        _ => TfNestedBlock::List(block),
    }
}

fn block(block: &Block) -> TfBlock {
    TfBlock {
        version: 1,
        description: Description::plain(block.description.clone()),
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| (name.to_string(), attribute(attr)))
            .collect(),
        blocks: block
            .blocks
            .iter()
            .map(|(name, nested)| (name.to_string(), nested_block(nested)))
            .collect(),
        ..Default::default()
    }
}

/// Translate a block declaration into a host schema
pub fn tf_schema(root: &Block) -> Schema {
    Schema {
        version: 1,
        block: block(root),
    }
}

/// Host attribute path for a dotted path such as `spec.0.container.1.name`
pub fn attribute_path(dotted: &str) -> AttributePath {
    let mut steps = dotted.split('.');
    let first = steps.next().unwrap_or_default().to_string();
    steps.fold(AttributePath::new(first), |path, step| {
        match step.parse::<i64>() {
            Ok(index) => path.index(index),
            Err(_) => path.attribute(step.to_string()),
        }
    })
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Record an error as a diagnostic, attached to its attribute when known
pub fn report(diags: &mut Diagnostics, err: &Error) {
    debug!(error = %err, "reporting error");
    match err.field() {
        Some(field) if !field.is_empty() => {
            diags.error_short(err.to_string(), attribute_path(field))
        }
        _ => diags.root_error_short(err.to_string()),
    }
}

/// Validate a value against a schema, reporting every problem
///
/// Returns `None` when any problem was found.
pub fn validate(diags: &mut Diagnostics, schema: &Block, value: &AttrValue) -> Option<()> {
    let errors = schema.validate(value);
    for err in &errors {
        report(diags, err);
    }
    errors.is_empty().then_some(())
}

/// State to record after a create attempt
///
/// An object that got an id exists in the cluster, so its state is returned
/// alongside the error and Terraform keeps tracking it.
pub fn created_state(
    diags: &mut Diagnostics,
    data: ResourceData,
    result: po_common::Result<()>,
) -> Option<AttrValue> {
    if let Err(err) = &result {
        report(diags, err);
        if data.id().is_empty() {
            return None;
        }
    }
    Some(data.into_state())
}

// =============================================================================
// Resource
// =============================================================================

/// A resource kind served to Terraform
pub struct TerraformResource<R> {
    client: Arc<OnceCell<Client>>,
    _kind: PhantomData<fn() -> R>,
}

impl<R: MonitoringResource> TerraformResource<R> {
    /// Serve a kind using the client the provider configures
    pub fn new(client: Arc<OnceCell<Client>>) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    fn handler(&self, diags: &mut Diagnostics) -> Option<ResourceHandler<R>> {
        match self.client.get() {
            Some(client) => Some(ResourceHandler::new(Arc::new(
                KubeStore::<R::Object>::new(client.clone()),
            ))),
            None => {
                diags.root_error_short("the po provider has not been configured");
                None
            }
        }
    }

    fn finish(
        diags: &mut Diagnostics,
        data: ResourceData,
        result: po_common::Result<()>,
    ) -> Option<(AttrValue, ValueEmpty)> {
        match result {
            Ok(()) => Some((data.into_state(), ValueEmpty)),
            Err(err) => {
                report(diags, &err);
                None
            }
        }
    }
}

#[async_trait]
impl<R: MonitoringResource> Resource for TerraformResource<R> {
    type State<'a> = AttrValue;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(tf_schema(&crate::resources::resource_schema::<R>()))
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate(diags, &crate::resources::resource_schema::<R>(), &config)
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let handler = self.handler(diags)?;
        let mut data = ResourceData::for_read(state);
        let result = handler.read(&mut data).await;
        Self::finish(diags, data, result).map(|(state, _)| (state, private_state))
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let schema = crate::resources::resource_schema::<R>();
        let mut planned = proposed_state;
        schema.apply_defaults(&mut planned);
        schema.mark_computed_unknown(&mut planned, false);
        Some((planned, ValueEmpty))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<tf_provider::attribute_path::AttributePath>,
    )> {
        let schema = crate::resources::resource_schema::<R>();
        let mut planned = proposed_state;
        schema.apply_defaults(&mut planned);

        if planned != prior_state {
            // Server-managed metadata changes on every write; the id does not.
            schema.mark_computed_unknown(&mut planned, true);
            planned.insert("id", prior_state.get("id").cloned().unwrap_or_default());
        }

        let replace = schema
            .force_new_changes(&prior_state, &planned)
            .iter()
            .map(|path| attribute_path(&path.to_string()))
            .collect();
        Some((planned, prior_private_state, replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        Some(())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let handler = self.handler(diags)?;
        let mut data = ResourceData::for_create(planned_state);
        let result = handler.create(&mut data).await;
        created_state(diags, data, result).map(|state| (state, private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let handler = self.handler(diags)?;
        let mut data = ResourceData::for_update(prior_state, planned_state);
        let result = handler.update(&mut data).await;
        Self::finish(diags, data, result).map(|(state, _)| (state, private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let handler = self.handler(diags)?;
        let mut data = ResourceData::for_read(state);
        match handler.delete(&mut data).await {
            Ok(()) => Some(()),
            Err(err) => {
                report(diags, &err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let handler = self.handler(diags)?;
        match handler.import(&id).await {
            Ok(data) => Some((data.into_state(), ValueEmpty)),
            Err(err) => {
                report(diags, &err);
                None
            }
        }
    }
}
