#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use cauldron_api::config::{Config, EnvName, Environment};
use cauldron_api::database::{MemoryStore, Store};
use cauldron_api::services::{organizations, students, test_admins};
use cauldron_api::{AppContext, AppState};

/// The repository's own configuration tree.
pub fn config_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

pub struct TestApp {
    pub ctx: AppContext,
    pub store: Arc<MemoryStore>,
}

/// Fresh devlocal test context over an empty in-memory store.
pub fn test_app() -> TestApp {
    context(true)
}

pub fn context(is_test: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let config = Config::new(Environment::new(EnvName::Devlocal, is_test), config_root());
    let ctx = AppContext::new(Arc::new(config), store.clone());
    TestApp { ctx, store }
}

/// Live and test contexts with separate stores, as the server runs them.
pub fn app_state() -> (AppState, Arc<MemoryStore>, Arc<MemoryStore>) {
    let live = context(false);
    let test = context(true);
    (AppState::new(live.ctx, test.ctx), live.store, test.store)
}

pub fn organization(id: &str, parent: Option<&str>) -> Value {
    let mut org = json!({
        "OrganizationID": id,
        "OrganizationName": format!("Organization {id}"),
        "OrganizationType": "District",
        "ExternalID": format!("EXT-{id}"),
    });
    if let Some(parent) = parent {
        org["ParentOrganizationID"] = json!(parent);
    }
    org
}

pub fn student(id: &str) -> Value {
    let mut fields = Map::new();
    fields.insert("UserID".into(), json!(id));
    fields.insert("StuGrade".into(), json!("08"));
    fields.insert("FirstName".into(), json!("Test"));
    fields.insert("LastName".into(), json!("Student"));
    fields.insert("Birthdate".into(), json!("2002-03-01"));
    fields.insert("ExternalID".into(), json!("Ext123"));
    fields.insert("TestDeliveryAccessCode".into(), json!("ABC123"));
    for i in 1..=30 {
        fields.insert(format!("Accom{i:02}"), json!(true));
    }
    Value::Object(fields)
}

pub fn test_admin(name: &str) -> Value {
    json!({
        "AdministrationName": name,
        "AdministrationStartDate": "2016-09-01",
        "AdministrationEndDate": "2016-09-30",
        "Secured": true,
        "Active": true
    })
}

/// Root organization `root` with children `children`.
pub async fn seed_organizations(ctx: &AppContext, root: &str, children: &[&str]) -> anyhow::Result<()> {
    organizations::create(ctx, organization(root, None)).await?;
    for child in children {
        organizations::create(ctx, organization(child, Some(root))).await?;
    }
    Ok(())
}

pub async fn seed_student(ctx: &AppContext, id: &str) -> anyhow::Result<()> {
    students::create(ctx, student(id)).await?;
    Ok(())
}

/// Returns the assigned id.
pub async fn seed_test_admin(ctx: &AppContext, name: &str) -> anyhow::Result<String> {
    let created = test_admins::create(ctx, test_admin(name)).await?;
    Ok(created["TestAdministrationID"].to_string())
}

pub async fn seed_assessment(store: &MemoryStore, id: u64, name: &str, grade: &str, forms: u64) {
    store
        .seed(
            "assessment",
            json!({
                "AssessmentID": id,
                "AssessmentName": name,
                "GradeLevel": grade,
                "Subject": "Math",
                "CreatedAt": "2016-07-20T00:00:00Z",
                "UpdatedAt": "2016-07-20T00:00:00Z"
            }),
        )
        .await;
    for form in 0..forms {
        store
            .seed("assessment_form", json!({"assessmentFormId": id * 100 + form, "assessmentId": id}))
            .await;
    }
}

/// Devlocal test context over any store.
pub fn context_with_store(store: Arc<dyn Store>) -> AppContext {
    let config = Config::new(Environment::new(EnvName::Devlocal, true), config_root());
    AppContext::new(Arc::new(config), store)
}
