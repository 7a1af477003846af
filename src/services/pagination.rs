//! Paged listing shared by every collection endpoint.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::QueryParams;
use crate::config::Config;
use crate::context::AppContext;
use crate::database::store::{Filter, ListQuery, OrderBy};
use crate::error::ApiError;
use crate::models::ModelDef;
use crate::util::parse_leading_int;

pub const DEFAULT_LIMIT: i64 = 50;
pub const DEFAULT_OFFSET: i64 = 0;

const ERRORS: &str = "errors.generic.pagination";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub limit: u64,
    pub offset: u64,
    pub row_count: u64,
    pub page_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub length: usize,
    pub models: Vec<Value>,
    pub pagination: PageInfo,
}

fn pagination_error(config: &Config, key: &str) -> ApiError {
    config.error(&format!("{ERRORS}.{key}"))
}

/// Parse `limit`/`offset` query values. Absent or empty values take the
/// defaults; both are checked for being numeric before either is checked
/// for sign.
pub fn get_pagination(
    config: &Config,
    limit: Option<&str>,
    offset: Option<&str>,
) -> Result<Pagination, ApiError> {
    let parse = |raw: Option<&str>, default: i64| match raw.filter(|s| !s.is_empty()) {
        Some(raw) => parse_leading_int(raw),
        None => Some(default),
    };

    let limit = parse(limit, DEFAULT_LIMIT).ok_or_else(|| pagination_error(config, "nonNumericLimit"))?;
    let offset = parse(offset, DEFAULT_OFFSET).ok_or_else(|| pagination_error(config, "nonNumericOffset"))?;

    let limit = u64::try_from(limit).map_err(|_| pagination_error(config, "negativeLimit"))?;
    let offset = u64::try_from(offset).map_err(|_| pagination_error(config, "negativeOffset"))?;

    Ok(Pagination { limit, offset })
}

/// Reject any query parameter outside `allowed`.
pub fn check_query_params(config: &Config, params: &QueryParams, allowed: &[&str]) -> Result<(), ApiError> {
    match params.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(config.error_with(&format!("{ERRORS}.badFilter"), "%FIELDNAME%", key)),
        None => Ok(()),
    }
}

/// Order for a `sort` parameter: a sortable column, `-` prefixed for
/// descending. The model's default sort column is the secondary order
/// unless it is the one being sorted on.
pub fn parse_sort(config: &Config, sort: Option<&str>, model: &ModelDef) -> Result<Vec<OrderBy>, ApiError> {
    let primary = model.default_sort;
    let Some(sort) = sort.filter(|s| !s.is_empty()) else {
        return Ok(vec![OrderBy::asc(primary)]);
    };

    let (column, descending) = match sort.strip_prefix('-') {
        Some(column) => (column, true),
        None => (sort, false),
    };

    if !model.sortable.contains(&column) {
        return Err(config.error_with(&format!("{ERRORS}.badSort"), "%FIELDNAME%", sort));
    }

    let order = if descending {
        OrderBy::desc(column)
    } else {
        OrderBy::asc(column)
    };

    if column == primary {
        Ok(vec![order])
    } else {
        Ok(vec![order, OrderBy::asc(primary)])
    }
}

fn page_count(row_count: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        row_count.div_ceil(limit)
    }
}

/// One page of `model`. An empty page is `pageNotFound`.
pub async fn fetch_page(
    ctx: &AppContext,
    model: &ModelDef,
    filters: Vec<Filter>,
    order_by: Vec<OrderBy>,
    pagination: Pagination,
) -> Result<PageResponse, ApiError> {
    let query = ListQuery {
        filters,
        order_by,
        limit: pagination.limit,
        offset: pagination.offset,
    };

    let page = ctx.store().list(model, &query).await?;
    debug!(
        "{} page: {} of {} rows at offset {}",
        model.class,
        page.rows.len(),
        page.row_count,
        pagination.offset
    );

    if page.rows.is_empty() {
        return Err(pagination_error(ctx.config(), "pageNotFound"));
    }

    let models: Vec<Value> = page.rows.into_iter().map(|row| row.to_json()).collect();
    Ok(PageResponse {
        length: models.len(),
        models,
        pagination: PageInfo {
            limit: pagination.limit,
            offset: pagination.offset,
            row_count: page.row_count,
            page_count: page_count(page.row_count, pagination.limit),
        },
    })
}
