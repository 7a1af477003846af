use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

use super::{RecordRule, ValidationContext};
use crate::database::record::Record;
use crate::error::ApiError;

/// What a rule checks.
pub enum Check {
    Required,
    MaxLength(usize),
    Pattern(Regex),
    Boolean,
    /// Passes only when the value is absent.
    Empty,
    Custom(Arc<dyn RecordRule>),
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Check::Required => f.write_str("required"),
            Check::MaxLength(n) => write!(f, "maxLength:{}", n),
            Check::Pattern(re) => write!(f, "pattern:{}", re.as_str()),
            Check::Boolean => f.write_str("boolean"),
            Check::Empty => f.write_str("empty"),
            Check::Custom(rule) => f.write_str(rule.name()),
        }
    }
}

/// A check plus the error key reported when it fails. Keys are relative to
/// `errors.` in the configuration.
#[derive(Debug)]
pub struct Rule {
    check: Check,
    message: Option<&'static str>,
}

impl Rule {
    pub fn required(message: &'static str) -> Self {
        Self { check: Check::Required, message: Some(message) }
    }

    pub fn max_length(limit: usize, message: &'static str) -> Self {
        Self { check: Check::MaxLength(limit), message: Some(message) }
    }

    pub fn pattern(regex: Regex, message: &'static str) -> Self {
        Self { check: Check::Pattern(regex), message: Some(message) }
    }

    pub fn boolean(message: &'static str) -> Self {
        Self { check: Check::Boolean, message: Some(message) }
    }

    pub fn empty(message: &'static str) -> Self {
        Self { check: Check::Empty, message: Some(message) }
    }

    /// Custom rule that raises its own error or falls back to a generic one.
    pub fn custom(rule: impl RecordRule + 'static) -> Self {
        Self { check: Check::Custom(Arc::new(rule)), message: None }
    }

    pub fn custom_with_message(rule: impl RecordRule + 'static, message: &'static str) -> Self {
        Self { check: Check::Custom(Arc::new(rule)), message: Some(message) }
    }

    pub(crate) async fn run(
        &self,
        field: &str,
        value: &Value,
        record: &Record,
        ctx: &ValidationContext<'_>,
    ) -> Result<(), ApiError> {
        // Only `required` looks at absent values.
        if !matches!(self.check, Check::Required) && is_empty(value) {
            return Ok(());
        }

        let passed = match &self.check {
            Check::Required => !is_empty(value),
            Check::MaxLength(limit) => match value_text(value) {
                Some(text) => text_length(&text) <= *limit,
                None => false,
            },
            Check::Pattern(regex) => value_text(value).is_some_and(|text| regex.is_match(&text)),
            Check::Boolean => value.is_boolean(),
            Check::Empty => false,
            Check::Custom(rule) => rule.check(value, record, ctx).await?,
        };

        if passed {
            return Ok(());
        }

        tracing::debug!("Rule {:?} failed for {}", self.check, field);
        Err(match self.message {
            Some(key) => ctx.config.error(&format!("errors.{key}")),
            None => ApiError::internal(format!("Validation for {field} did not pass")),
        })
    }
}

/// Absent, null, or the empty string.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Length in UTF-16 code units, so characters outside the BMP count twice.
fn text_length(text: &str) -> usize {
    text.encode_utf16().count()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
