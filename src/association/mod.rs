//! Associate / disassociate two existing rows through a many-to-many relation.
//!
//! Every call walks the same states: both ids present, both rows found
//! (source checked before target), then the link looked up. `associate`
//! only proceeds from an absent link and `disassociate` only from a present
//! one. All failures are configured errors named by path in the descriptor.

use tracing::{debug, info};

use crate::context::AppContext;
use crate::database::record::Record;
use crate::database::store::StoreError;
use crate::error::ApiError;
use crate::models::{self, AssociationMethod, ModelDef, RelationAccessor};

pub mod links;

/// One side of an association: a class name and the requested id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub class: String,
    pub id: Option<String>,
}

impl ModelRef {
    pub fn new(class: impl Into<String>, id: Option<&str>) -> Self {
        Self {
            class: class.into(),
            id: id.map(str::to_string),
        }
    }

    /// The id, treating the empty string as absent.
    fn present_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Configuration paths of the errors an association can raise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationErrors {
    pub missing_source_id: String,
    pub missing_target_id: String,
    pub invalid_source_id: String,
    pub invalid_target_id: String,
    pub duplicate_association: Option<String>,
    pub invalid_association: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssociationDescriptor {
    pub source: ModelRef,
    pub target: ModelRef,
    pub method: AssociationMethod,
    pub errors: AssociationErrors,
    /// Returned on success.
    pub message: Option<String>,
}

/// Both rows plus the current link state.
pub struct AssociationState<'a> {
    pub source: Record,
    /// The target row when already linked.
    pub link: Option<Record>,
    accessor: RelationAccessor<'a>,
    target_id: &'a str,
}

fn lookup(class: &str) -> Result<&'static ModelDef, ApiError> {
    models::get_class(class).map_err(|e| ApiError::internal(e.to_string()))
}

fn optional_error(ctx: &AppContext, path: Option<&String>, what: &str) -> ApiError {
    match path {
        Some(path) => ctx.config().error(path),
        None => ApiError::internal(format!("no {what} error configured for association")),
    }
}

/// Resolve both endpoints and the link between them.
pub async fn check_association<'a>(
    ctx: &'a AppContext,
    descriptor: &'a AssociationDescriptor,
) -> Result<AssociationState<'a>, ApiError> {
    let config = ctx.config();
    let errors = &descriptor.errors;

    let source_def = lookup(&descriptor.source.class)?;
    let target_def = lookup(&descriptor.target.class)?;

    let source_id = descriptor
        .source
        .present_id()
        .ok_or_else(|| config.error(&errors.missing_source_id))?;
    let target_id = descriptor
        .target
        .present_id()
        .ok_or_else(|| config.error(&errors.missing_target_id))?;

    let store = ctx.store();
    let (source, target) = tokio::try_join!(
        store.fetch(source_def, source_id),
        store.fetch(target_def, target_id)
    )?;

    let source = source.ok_or_else(|| config.error(&errors.invalid_source_id))?;
    if target.is_none() {
        return Err(config.error(&errors.invalid_target_id));
    }

    let accessor = RelationAccessor::new(store, source_def, source_id, descriptor.method)?;
    let link = accessor.find(target_id).await?;
    debug!(
        "{} {} -> {} {} linked: {}",
        source_def.class,
        source_id,
        target_def.class,
        target_id,
        link.is_some()
    );

    Ok(AssociationState { source, link, accessor, target_id })
}

/// Link the two rows; fails when they are already linked.
pub async fn associate(ctx: &AppContext, descriptor: &AssociationDescriptor) -> Result<String, ApiError> {
    let state = check_association(ctx, descriptor).await?;
    let duplicate = || optional_error(ctx, descriptor.errors.duplicate_association.as_ref(), "duplicate");

    if state.link.is_some() {
        return Err(duplicate());
    }

    // A concurrent attach of the same pair surfaces as a unique violation.
    state.accessor.attach(state.target_id).await.map_err(|e| match e {
        StoreError::Duplicate(_) => duplicate(),
        other => other.into(),
    })?;

    info!("Associated {} via {}", state.accessor.describe(state.target_id), descriptor.method);
    Ok(descriptor.message.clone().unwrap_or_default())
}

/// Remove the link; fails when the rows are not linked.
pub async fn disassociate(ctx: &AppContext, descriptor: &AssociationDescriptor) -> Result<String, ApiError> {
    let state = check_association(ctx, descriptor).await?;
    let invalid = || optional_error(ctx, descriptor.errors.invalid_association.as_ref(), "invalid");

    if state.link.is_none() {
        return Err(invalid());
    }

    if state.accessor.detach(state.target_id).await? == 0 {
        return Err(invalid());
    }

    info!("Disassociated {} via {}", state.accessor.describe(state.target_id), descriptor.method);
    Ok(descriptor.message.clone().unwrap_or_default())
}
