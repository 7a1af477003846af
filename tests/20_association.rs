mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use cauldron_api::association::links::{self, Direction};
use cauldron_api::association::{associate, check_association, disassociate};
use cauldron_api::database::{Link, ListQuery, MemoryStore, Page, Record, Store, StoreError};
use cauldron_api::models::ModelDef;
use cauldron_api::services::{students, test_admins};

/// Link lookups that disagree with the join table, as when another request
/// attaches or detaches the same pair between the check and the write.
#[derive(Clone, Copy)]
enum StaleLinks {
    /// Every pair reads as unlinked.
    Absent,
    /// Every pair reads as linked.
    Present,
}

struct StaleStore {
    inner: Arc<MemoryStore>,
    links: StaleLinks,
}

#[async_trait]
impl Store for StaleStore {
    async fn fetch(&self, model: &ModelDef, id: &str) -> Result<Option<Record>, StoreError> {
        self.inner.fetch(model, id).await
    }

    async fn any_exists(&self, model: &ModelDef) -> Result<bool, StoreError> {
        self.inner.any_exists(model).await
    }

    async fn insert(&self, model: &ModelDef, fields: Map<String, Value>) -> Result<Record, StoreError> {
        self.inner.insert(model, fields).await
    }

    async fn update(&self, model: &ModelDef, id: &str, changes: Map<String, Value>) -> Result<(), StoreError> {
        self.inner.update(model, id, changes).await
    }

    async fn list(&self, model: &ModelDef, query: &ListQuery) -> Result<Page, StoreError> {
        self.inner.list(model, query).await
    }

    async fn find_link(&self, link: &Link<'_>) -> Result<Option<Record>, StoreError> {
        match self.links {
            StaleLinks::Absent => Ok(None),
            StaleLinks::Present => self.inner.fetch(link.target, link.target_id).await,
        }
    }

    async fn attach(&self, link: &Link<'_>) -> Result<(), StoreError> {
        self.inner.attach(link).await
    }

    async fn detach(&self, link: &Link<'_>) -> Result<u64, StoreError> {
        self.inner.detach(link).await
    }
}

fn stale(app: &common::TestApp, links: StaleLinks) -> cauldron_api::AppContext {
    common::context_with_store(Arc::new(StaleStore { inner: app.store.clone(), links }))
}

#[tokio::test]
async fn associate_then_duplicate_then_detach_twice() -> Result<()> {
    let app = common::test_app();
    let ctx = &app.ctx;
    common::seed_organizations(ctx, "12345", &[]).await?;
    common::seed_student(ctx, "s1").await?;

    let added = students::add_organization(ctx, "s1", "12345").await?;
    assert_eq!(added, "Student added to organization");
    assert_eq!(app.store.count("student_organization").await, 1);

    let err = students::add_organization(ctx, "s1", "12345").await.unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.message(), "Association between student and organization already exists");
    assert_eq!(app.store.count("student_organization").await, 1);

    let removed = students::remove_organization(ctx, "s1", "12345").await?;
    assert_eq!(removed, "Student was removed from organization");
    assert_eq!(app.store.count("student_organization").await, 0);

    let err = students::remove_organization(ctx, "s1", "12345").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message(), "Association between student and organization does not exist");

    Ok(())
}

#[tokio::test]
async fn missing_ids_are_reported_before_any_lookup() -> Result<()> {
    let app = common::test_app();
    let ctx = &app.ctx;

    // neither row exists, so a lookup would report invalid ids instead
    let both = links::student_organization(ctx.config(), None, None, Direction::Associate);
    let err = associate(ctx, &both).await.unwrap_err();
    assert_eq!(err.message(), "Missing required value: UserID");

    let target = links::student_organization(ctx.config(), Some("s1"), Some(""), Direction::Associate);
    let err = associate(ctx, &target).await.unwrap_err();
    assert_eq!(err.message(), "Missing required value: OrganizationID");

    let source = links::test_admin_assessment(ctx.config(), Some(""), Some("7"), Direction::Disassociate);
    let err = disassociate(ctx, &source).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.message(), "Missing required value: TestAdministrationID");

    Ok(())
}

#[tokio::test]
async fn invalid_source_is_reported_before_invalid_target() -> Result<()> {
    let app = common::test_app();
    let ctx = &app.ctx;
    common::seed_organizations(ctx, "12345", &[]).await?;
    common::seed_student(ctx, "s1").await?;

    let err = students::add_organization(ctx, "nobody", "nowhere").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message(), "Invalid UserID");

    let err = students::add_organization(ctx, "s1", "nowhere").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message(), "Invalid OrganizationID");

    let err = students::remove_organization(ctx, "nobody", "12345").await.unwrap_err();
    assert_eq!(err.message(), "Invalid UserID");

    Ok(())
}

#[tokio::test]
async fn check_association_reports_link_state() -> Result<()> {
    let app = common::test_app();
    let ctx = &app.ctx;
    common::seed_organizations(ctx, "12345", &[]).await?;
    let admin = common::seed_test_admin(ctx, "Spring").await?;

    let descriptor =
        links::test_admin_organization(ctx.config(), Some(&admin), Some("12345"), Direction::Associate);
    let state = check_association(ctx, &descriptor).await?;
    assert!(state.link.is_none());
    assert_eq!(state.source.get_string("AdministrationName").as_deref(), Some("Spring"));

    test_admins::add_organization(ctx, &admin, "12345").await?;

    let state = check_association(ctx, &descriptor).await?;
    let linked = state.link.expect("linked organization");
    assert_eq!(linked.get_string("OrganizationID").as_deref(), Some("12345"));

    Ok(())
}

#[tokio::test]
async fn test_admins_link_to_assessments() -> Result<()> {
    let app = common::test_app();
    let ctx = &app.ctx;
    common::seed_assessment(&app.store, 7, "Algebra", "08", 0).await;
    let admin = common::seed_test_admin(ctx, "Fall").await?;

    let err = test_admins::add_assessment(ctx, &admin, "8").await.unwrap_err();
    assert_eq!(err.message(), "Invalid AssessmentID");

    let added = test_admins::add_assessment(ctx, &admin, "7").await?;
    assert_eq!(added, "Test administration added to assessment");

    let err = test_admins::add_assessment(ctx, &admin, "7").await.unwrap_err();
    assert_eq!(err.message(), "Association between test administration and assessment already exists");

    test_admins::remove_assessment(ctx, &admin, "7").await?;
    let err = test_admins::remove_assessment(ctx, &admin, "7").await.unwrap_err();
    assert_eq!(err.message(), "Association between test administration and assessment does not exist");

    Ok(())
}

#[tokio::test]
async fn racing_attach_reports_the_configured_duplicate() -> Result<()> {
    let app = common::test_app();
    common::seed_organizations(&app.ctx, "12345", &[]).await?;
    common::seed_student(&app.ctx, "s1").await?;
    students::add_organization(&app.ctx, "s1", "12345").await?;

    let ctx = stale(&app, StaleLinks::Absent);
    let err = students::add_organization(&ctx, "s1", "12345").await.unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.message(), "Association between student and organization already exists");
    assert_eq!(app.store.count("student_organization").await, 1);

    Ok(())
}

#[tokio::test]
async fn racing_detach_reports_the_configured_invalid_association() -> Result<()> {
    let app = common::test_app();
    common::seed_organizations(&app.ctx, "12345", &[]).await?;
    common::seed_student(&app.ctx, "s1").await?;

    let ctx = stale(&app, StaleLinks::Present);
    let err = students::remove_organization(&ctx, "s1", "12345").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message(), "Association between student and organization does not exist");

    Ok(())
}
