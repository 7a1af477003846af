pub mod association;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod util;
pub mod validation;

use axum::Router;

pub use context::{AppContext, AppState};
pub use error::ApiError;

/// The HTTP application over both contexts.
pub fn app(state: AppState) -> Router {
    handlers::router(state)
}
