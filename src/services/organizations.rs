use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::info;

use super::pagination::{check_query_params, fetch_page, get_pagination, parse_sort, PageResponse};
use super::{require_fields, QueryParams, SavePipeline};
use crate::context::AppContext;
use crate::database::record::Record;
use crate::database::store::Filter;
use crate::error::ApiError;
use crate::models::organization::{self, ORGANIZATION};

/// Query parameters `GET /organizations` understands.
pub const LIST_PARAMS: &[&str] = &[
    "offset",
    "limit",
    "ParentOrganizationID",
    "OrganizationName",
    "Active",
    "sort",
];

static PIPELINE: Lazy<SavePipeline> =
    Lazy::new(|| SavePipeline::new(&ORGANIZATION, organization::validator(), organization::map_save_error));

pub async fn create(ctx: &AppContext, body: Value) -> Result<Value, ApiError> {
    let record = Record::from_input(body).map_err(|_| ctx.config().error("errors.generic.noFields"))?;
    let saved = PIPELINE.save(ctx, record).await?;

    info!("Created organization {}", saved.get_string("OrganizationID").unwrap_or_default());
    Ok(saved.to_json())
}

pub async fn get(ctx: &AppContext, id: &str) -> Result<Value, ApiError> {
    let config = ctx.config();
    if id.is_empty() {
        return Err(config.error("errors.organization.emptyOrgID"));
    }

    ctx.store()
        .fetch(&ORGANIZATION, id)
        .await?
        .map(|org| org.to_json())
        .ok_or_else(|| config.error("errors.organization.invalidOrgID"))
}

pub async fn update(ctx: &AppContext, id: &str, body: Value) -> Result<Value, ApiError> {
    let config = ctx.config();
    let changes = require_fields(config, body)?;

    if changes.contains_key("OrganizationID") {
        return Err(config.error("errors.organization.changeOrgID"));
    }

    let mut org = ctx
        .store()
        .fetch(&ORGANIZATION, id)
        .await?
        .ok_or_else(|| config.error("errors.organization.invalidOrgID"))?;

    if !org.has("ParentOrganizationID") && changes.contains_key("ParentOrganizationID") {
        return Err(config.error("errors.organization.rootChangeParent"));
    }

    org.patch(changes);
    let saved = PIPELINE.save(ctx, org).await?;
    Ok(saved.to_json())
}

/// `Active` filter value: 0/1/true/false in any case.
fn parse_active(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

pub async fn list(ctx: &AppContext, params: &QueryParams) -> Result<PageResponse, ApiError> {
    let config = ctx.config();
    let param = |name: &str| params.get(name).map(String::as_str);

    check_query_params(config, params, LIST_PARAMS)?;
    let order_by = parse_sort(config, param("sort"), &ORGANIZATION)?;
    let pagination = get_pagination(config, param("limit"), param("offset"))?;

    let mut filters = Vec::new();
    if let Some(parent) = param("ParentOrganizationID").filter(|s| !s.is_empty()) {
        filters.push(Filter::EqualsIgnoreCase("ParentOrganizationID".into(), parent.to_string()));
    }
    if let Some(name) = param("OrganizationName").filter(|s| !s.is_empty()) {
        filters.push(Filter::ContainsIgnoreCase("OrganizationName".into(), name.to_string()));
    }

    let active = match param("Active") {
        Some(raw) => parse_active(raw).ok_or_else(|| config.error("errors.organization.nonBooleanActive"))?,
        None => true,
    };
    filters.push(Filter::Equals("Active".into(), Value::Bool(active)));

    fetch_page(ctx, &ORGANIZATION, filters, order_by, pagination).await
}
