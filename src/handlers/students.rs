use axum::{
    extract::{Extension, Path},
    response::Json,
};
use serde_json::Value;

use super::body_value;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::services::students;

/// POST /students
pub async fn create(
    Extension(ctx): Extension<AppContext>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    students::create(&ctx, body_value(body)).await.map(Json)
}

/// PATCH /students/:student_id
pub async fn update(
    Extension(ctx): Extension<AppContext>,
    Path(student_id): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    students::update(&ctx, &student_id, body_value(body)).await.map(Json)
}

/// PUT /students/:student_id/organizations/:organization_id - Responds with the configured message
pub async fn add_organization(
    Extension(ctx): Extension<AppContext>,
    Path((student_id, organization_id)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    students::add_organization(&ctx, &student_id, &organization_id).await.map(Json)
}

/// DELETE /students/:student_id/organizations/:organization_id
pub async fn remove_organization(
    Extension(ctx): Extension<AppContext>,
    Path((student_id, organization_id)): Path<(String, String)>,
) -> Result<Json<String>, ApiError> {
    students::remove_organization(&ctx, &student_id, &organization_id).await.map(Json)
}
