use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::{debug, info};

use super::pagination::{check_query_params, fetch_page, get_pagination, PageResponse};
use super::{require_fields, truthy, QueryParams, SavePipeline};
use crate::association::links::{self, Direction};
use crate::association::{associate, disassociate};
use crate::context::AppContext;
use crate::database::record::Record;
use crate::database::store::OrderBy;
use crate::error::ApiError;
use crate::models::test_administration::{self, TEST_ADMINISTRATION};

pub const LIST_PARAMS: &[&str] = &["offset", "limit"];

const DATE_COLUMNS: [&str; 2] = ["AdministrationStartDate", "AdministrationEndDate"];
const FLAG_COLUMNS: [&str; 2] = ["Secured", "Active"];

static PIPELINE: Lazy<SavePipeline> = Lazy::new(|| {
    SavePipeline::new(
        &TEST_ADMINISTRATION,
        test_administration::validator(),
        test_administration::map_save_error,
    )
});

pub async fn create(ctx: &AppContext, body: Value) -> Result<Value, ApiError> {
    let mut record = Record::from_input(body).map_err(|_| ctx.config().error("errors.generic.noFields"))?;
    // the id is always assigned by the store
    if record.remove(TEST_ADMINISTRATION.id_attribute).is_some() {
        debug!("Ignoring client-supplied {}", TEST_ADMINISTRATION.id_attribute);
    }
    let saved = PIPELINE.save(ctx, record).await?;

    info!(
        "Created test administration {}",
        saved.get_string("TestAdministrationID").unwrap_or_default()
    );
    Ok(saved.to_json())
}

pub async fn get(ctx: &AppContext, id: &str) -> Result<Value, ApiError> {
    let config = ctx.config();
    if id.is_empty() {
        return Err(config.error("errors.testAdmin.emptyTestAdminID"));
    }

    ctx.store()
        .fetch(&TEST_ADMINISTRATION, id)
        .await?
        .map(|admin| admin.to_json())
        .ok_or_else(|| config.error("errors.testAdmin.invalidTestAdminID"))
}

/// Bring a stored row back to the shape validation expects: dates as
/// `YYYY-MM-DD`, flags as booleans.
fn normalize_stored(record: &mut Record) {
    for column in DATE_COLUMNS {
        let day: String = match record.get(column) {
            Some(Value::String(date)) => date.chars().take(10).collect(),
            _ => continue,
        };
        record.set(column, day);
    }

    for column in FLAG_COLUMNS {
        let flag = record.get(column).is_some_and(truthy);
        record.set(column, flag);
    }
}

pub async fn update(ctx: &AppContext, id: &str, body: Value) -> Result<Value, ApiError> {
    let config = ctx.config();
    let changes = require_fields(config, body)?;

    let mut admin = ctx
        .store()
        .fetch(&TEST_ADMINISTRATION, id)
        .await?
        .ok_or_else(|| config.error("errors.testAdmin.invalidTestAdminID"))?;

    normalize_stored(&mut admin);

    if changes.contains_key("TestAdministrationID") {
        return Err(config.error("errors.testAdmin.changeTestAdminID"));
    }

    admin.patch(changes);
    let saved = PIPELINE.save(ctx, admin).await?;
    Ok(saved.to_json())
}

/// Paged listing ordered by administration name.
pub async fn list(ctx: &AppContext, params: &QueryParams) -> Result<PageResponse, ApiError> {
    let config = ctx.config();
    let param = |name: &str| params.get(name).map(String::as_str);

    check_query_params(config, params, LIST_PARAMS)?;
    let pagination = get_pagination(config, param("limit"), param("offset"))?;
    let order_by = vec![OrderBy::asc(TEST_ADMINISTRATION.default_sort)];

    fetch_page(ctx, &TEST_ADMINISTRATION, Vec::new(), order_by, pagination).await
}

pub async fn add_organization(ctx: &AppContext, id: &str, organization_id: &str) -> Result<String, ApiError> {
    let descriptor = links::test_admin_organization(ctx.config(), Some(id), Some(organization_id), Direction::Associate);
    associate(ctx, &descriptor).await
}

pub async fn remove_organization(ctx: &AppContext, id: &str, organization_id: &str) -> Result<String, ApiError> {
    let descriptor =
        links::test_admin_organization(ctx.config(), Some(id), Some(organization_id), Direction::Disassociate);
    disassociate(ctx, &descriptor).await
}

pub async fn add_assessment(ctx: &AppContext, id: &str, assessment_id: &str) -> Result<String, ApiError> {
    let descriptor = links::test_admin_assessment(ctx.config(), Some(id), Some(assessment_id), Direction::Associate);
    associate(ctx, &descriptor).await
}

pub async fn remove_assessment(ctx: &AppContext, id: &str, assessment_id: &str) -> Result<String, ApiError> {
    let descriptor =
        links::test_admin_assessment(ctx.config(), Some(id), Some(assessment_id), Direction::Disassociate);
    disassociate(ctx, &descriptor).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_rows_are_normalized_for_validation() {
        let Value::Object(row) = json!({
            "TestAdministrationID": 3,
            "AdministrationStartDate": "2016-09-01T00:00:00.000Z",
            "AdministrationEndDate": "2016-09-30",
            "Secured": 1,
            "Active": null
        }) else {
            unreachable!()
        };
        let mut record = Record::from_stored(row);
        normalize_stored(&mut record);

        assert_eq!(record.get("AdministrationStartDate"), Some(&json!("2016-09-01")));
        assert_eq!(record.get("Secured"), Some(&json!(true)));
        assert_eq!(record.get("Active"), Some(&json!(false)));
        assert!(!record.changed("AdministrationEndDate"));
    }
}
