use axum::{
    extract::{Extension, Path},
    response::Json,
};
use serde_json::Value;

use super::body_value;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::services::{test_admins, PageResponse, QueryParams};

/// POST /testadmins
pub async fn create(
    Extension(ctx): Extension<AppContext>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    test_admins::create(&ctx, body_value(body)).await.map(Json)
}

/// GET /testadmins - Paged listing by name
pub async fn list(
    Extension(ctx): Extension<AppContext>,
    Extension(params): Extension<QueryParams>,
) -> Result<Json<PageResponse>, ApiError> {
    test_admins::list(&ctx, &params).await.map(Json)
}

/// GET /testadmins/:id
pub async fn get(Extension(ctx): Extension<AppContext>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    test_admins::get(&ctx, &id).await.map(Json)
}

/// PATCH /testadmins/:id
pub async fn update(
    Extension(ctx): Extension<AppContext>,
    Path(id): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    test_admins::update(&ctx, &id, body_value(body)).await.map(Json)
}

/// PUT /testadmins/:id/organizations/:organization_id
pub async fn add_organization(
    Extension(ctx): Extension<AppContext>,
    Path((id, organization_id)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    test_admins::add_organization(&ctx, &id, &organization_id).await.map(Json)
}

/// DELETE /testadmins/:id/organizations/:organization_id
pub async fn remove_organization(
    Extension(ctx): Extension<AppContext>,
    Path((id, organization_id)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    test_admins::remove_organization(&ctx, &id, &organization_id).await.map(Json)
}

/// PUT /testadmins/:id/assessments/:assessment_id
pub async fn add_assessment(
    Extension(ctx): Extension<AppContext>,
    Path((id, assessment_id)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    test_admins::add_assessment(&ctx, &id, &assessment_id).await.map(Json)
}

/// DELETE /testadmins/:id/assessments/:assessment_id
pub async fn remove_assessment(
    Extension(ctx): Extension<AppContext>,
    Path((id, assessment_id)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    test_admins::remove_assessment(&ctx, &id, &assessment_id).await.map(Json)
}
