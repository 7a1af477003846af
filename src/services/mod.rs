//! Use cases behind the HTTP routes. Each takes the request's
//! [`AppContext`](crate::context::AppContext) and returns JSON or an
//! [`ApiError`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::ApiError;

pub mod assessments;
pub mod organizations;
pub mod pagination;
pub mod save;
pub mod students;
pub mod test_admins;

pub use pagination::{PageInfo, PageResponse, Pagination};
pub use save::SavePipeline;

/// Query string parameters, ordered so error reports are stable.
pub type QueryParams = BTreeMap<String, String>;

/// Request body as a field map; anything other than a non-empty object is
/// `errors.generic.noFields`.
pub(crate) fn require_fields(config: &Config, body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(fields) if !fields.is_empty() => Ok(fields),
        _ => Err(config.error("errors.generic.noFields")),
    }
}

/// Truthiness of a stored value: null, false, 0 and "" are false.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
