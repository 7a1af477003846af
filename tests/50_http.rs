mod common;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body)?).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

#[tokio::test]
async fn test_flag_selects_the_test_store() -> Result<()> {
    let (state, live, test) = common::app_state();
    let app = cauldron_api::app(state);

    let (status, body) = send(
        &app,
        Method::POST,
        "/organizations?test=1",
        Some(common::organization("12345", None)),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["OrganizationID"], "12345");
    assert_eq!(test.count("organization").await, 1);
    assert_eq!(live.count("organization").await, 0);

    let (status, _) = send(&app, Method::GET, "/organizations/12345", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/organizations/12345?test=true", None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn errors_use_the_configured_envelope() -> Result<()> {
    let (state, _, _) = common::app_state();
    let app = cauldron_api::app(state);

    let (status, body) = send(&app, Method::GET, "/organizations/nope", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"responseCode": 404, "errorMessage": "Invalid OrganizationID"}));

    let (status, body) = send(&app, Method::POST, "/students", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorMessage"], "No valid fields provided");

    let (status, body) = send(&app, Method::GET, "/organizations?colour=red", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorMessage"], "Invalid filter: colour");

    Ok(())
}

#[tokio::test]
async fn listing_returns_models_and_pagination() -> Result<()> {
    let (state, _, _) = common::app_state();
    let app = cauldron_api::app(state);
    for id in ["1", "2"] {
        let parent = (id != "1").then_some("1");
        send(&app, Method::POST, "/organizations", Some(common::organization(id, parent))).await?;
    }

    let (status, body) = send(&app, Method::GET, "/organizations?limit=1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["length"], 1);
    assert_eq!(body["models"][0]["OrganizationID"], "1");
    assert_eq!(
        body["pagination"],
        json!({"limit": 1, "offset": 0, "rowCount": 2, "pageCount": 2})
    );

    Ok(())
}

#[tokio::test]
async fn associations_answer_with_a_message_string() -> Result<()> {
    let (state, _, _) = common::app_state();
    let app = cauldron_api::app(state);
    send(&app, Method::POST, "/organizations", Some(common::organization("12345", None))).await?;
    send(&app, Method::POST, "/students", Some(common::student("s1"))).await?;

    let uri = "/students/s1/organizations/12345";
    let (status, body) = send(&app, Method::PUT, uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Student added to organization"));

    let (status, body) = send(&app, Method::PUT, uri, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorMessage"], "Association between student and organization already exists");

    let (status, body) = send(&app, Method::DELETE, uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Student was removed from organization"));

    Ok(())
}

#[tokio::test]
async fn health_reports_the_environment() -> Result<()> {
    let (state, _, _) = common::app_state();
    let app = cauldron_api::app(state);

    let (status, body) = send(&app, Method::GET, "/health?test=1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "devlocal-test");

    Ok(())
}
