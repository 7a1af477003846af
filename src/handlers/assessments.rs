use axum::{extract::Extension, response::Json};

use crate::context::AppContext;
use crate::error::ApiError;
use crate::services::{assessments, PageResponse, QueryParams};

/// GET /assessments - Paged listing with form counts
pub async fn list(
    Extension(ctx): Extension<AppContext>,
    Extension(params): Extension<QueryParams>,
) -> Result<Json<PageResponse>, ApiError> {
    assessments::list(&ctx, &params).await.map(Json)
}
