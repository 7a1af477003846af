use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::info;

use super::{require_fields, SavePipeline};
use crate::association::links::{self, Direction};
use crate::association::{associate, disassociate};
use crate::context::AppContext;
use crate::database::record::Record;
use crate::error::ApiError;
use crate::models::student::{self, STUDENT};

static PIPELINE: Lazy<SavePipeline> =
    Lazy::new(|| SavePipeline::new(&STUDENT, student::validator(), student::map_save_error));

pub async fn create(ctx: &AppContext, body: Value) -> Result<Value, ApiError> {
    let record = Record::from_input(body).map_err(|_| ctx.config().error("errors.generic.noFields"))?;
    let saved = PIPELINE.save(ctx, record).await?;

    info!("Created student {}", saved.get_string("UserID").unwrap_or_default());
    Ok(saved.to_json())
}

/// Patch a student. Changing `UserID` is rejected by validation.
pub async fn update(ctx: &AppContext, id: &str, body: Value) -> Result<Value, ApiError> {
    let config = ctx.config();
    let changes = require_fields(config, body)?;

    let mut student = ctx
        .store()
        .fetch(&STUDENT, id)
        .await?
        .ok_or_else(|| config.error("errors.student.studentNotFound"))?;

    student.patch(changes);
    let saved = PIPELINE.save(ctx, student).await?;
    Ok(saved.to_json())
}

pub async fn add_organization(ctx: &AppContext, student_id: &str, organization_id: &str) -> Result<String, ApiError> {
    let descriptor = links::student_organization(
        ctx.config(),
        Some(student_id),
        Some(organization_id),
        Direction::Associate,
    );
    associate(ctx, &descriptor).await
}

pub async fn remove_organization(
    ctx: &AppContext,
    student_id: &str,
    organization_id: &str,
) -> Result<String, ApiError> {
    let descriptor = links::student_organization(
        ctx.config(),
        Some(student_id),
        Some(organization_id),
        Direction::Disassociate,
    );
    disassociate(ctx, &descriptor).await
}
