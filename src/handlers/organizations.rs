use axum::{
    extract::{Extension, Path},
    response::Json,
};
use serde_json::Value;

use super::body_value;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::services::{organizations, PageResponse, QueryParams};

/// POST /organizations - Create an organization
pub async fn create(
    Extension(ctx): Extension<AppContext>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    organizations::create(&ctx, body_value(body)).await.map(Json)
}

/// GET /organizations - Paged, filtered listing
pub async fn list(
    Extension(ctx): Extension<AppContext>,
    Extension(params): Extension<QueryParams>,
) -> Result<Json<PageResponse>, ApiError> {
    organizations::list(&ctx, &params).await.map(Json)
}

/// GET /organizations/:id
pub async fn get(Extension(ctx): Extension<AppContext>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    organizations::get(&ctx, &id).await.map(Json)
}

/// PATCH /organizations/:id - Partial update
pub async fn update(
    Extension(ctx): Extension<AppContext>,
    Path(id): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    organizations::update(&ctx, &id, body_value(body)).await.map(Json)
}
