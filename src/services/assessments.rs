use super::pagination::{check_query_params, fetch_page, get_pagination, parse_sort, PageResponse};
use super::QueryParams;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::models::assessment::ASSESSMENT;

pub const LIST_PARAMS: &[&str] = &["offset", "limit", "sort"];

/// Paged listing; each row carries its `AssessmentFormCount`.
pub async fn list(ctx: &AppContext, params: &QueryParams) -> Result<PageResponse, ApiError> {
    let config = ctx.config();
    let param = |name: &str| params.get(name).map(String::as_str);

    check_query_params(config, params, LIST_PARAMS)?;
    let order_by = parse_sort(config, param("sort"), &ASSESSMENT)?;
    let pagination = get_pagination(config, param("limit"), param("offset"))?;

    fetch_page(ctx, &ASSESSMENT, Vec::new(), order_by, pagination).await
}
