use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use crate::context::AppState;
use crate::services::QueryParams;

/// Select the live or test context from the `test` query flag.
///
/// The chosen [`AppContext`](crate::context::AppContext) and the query
/// parameters (without `test`) are handed to handlers as request extensions.
pub async fn select_environment(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let mut params = match Query::<QueryParams>::try_from_uri(request.uri()) {
        Ok(Query(params)) => params,
        Err(e) => {
            warn!("Ignoring unreadable query string on {}: {}", request.uri().path(), e);
            QueryParams::new()
        }
    };

    let test = params.remove("test").is_some_and(|flag| flag_set(&flag));
    let ctx = state.select(test).clone();

    if ctx.config().get_bool("logEvent") {
        info!(env = %ctx.environment(), "{} {}", request.method(), request.uri());
    }

    request.extensions_mut().insert(ctx);
    request.extensions_mut().insert(params);
    next.run(request).await
}

fn flag_set(flag: &str) -> bool {
    matches!(flag.to_ascii_lowercase().as_str(), "1" | "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert!(flag_set("1"));
        assert!(flag_set("TRUE"));
        assert!(!flag_set("0"));
        assert!(!flag_set(""));
    }
}
