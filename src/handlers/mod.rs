// handlers/mod.rs - HTTP surface
//
// Handlers only unpack the request and call into `services`; the context
// and query parameters arrive as extensions set by `select_environment`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post, put},
    Extension, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::context::{AppContext, AppState};
use crate::middleware::select_environment;

pub mod assessments;
pub mod organizations;
pub mod students;
pub mod test_admins;

/// Request body, `null` when absent or not JSON.
pub(crate) fn body_value(body: Option<Json<Value>>) -> Value {
    body.map(|Json(value)| value).unwrap_or(Value::Null)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/organizations", get(organizations::list).post(organizations::create))
        .route("/organizations/:id", get(organizations::get).patch(organizations::update))
        .route("/students", post(students::create))
        .route("/students/:student_id", patch(students::update))
        .route(
            "/students/:student_id/organizations/:organization_id",
            put(students::add_organization).delete(students::remove_organization),
        )
        .route("/testadmins", get(test_admins::list).post(test_admins::create))
        .route("/testadmins/:id", get(test_admins::get).patch(test_admins::update))
        .route(
            "/testadmins/:id/organizations/:organization_id",
            put(test_admins::add_organization).delete(test_admins::remove_organization),
        )
        .route(
            "/testadmins/:id/assessments/:assessment_id",
            put(test_admins::add_assessment).delete(test_admins::remove_assessment),
        )
        .route("/assessments", get(assessments::list))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn_with_state(state, select_environment))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// GET /health - Store connectivity
async fn health(Extension(ctx): Extension<AppContext>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match ctx.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "environment": ctx.environment().to_string(),
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "environment": ctx.environment().to_string(),
                    "timestamp": now,
                    "database_error": e.to_string()
                })),
            )
        }
    }
}
