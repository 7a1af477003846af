//! Rule-based record validation.
//!
//! A [`Validator`] holds per-field rule lists plus conditional rule sets. On
//! every run the conditions are evaluated first; the rules of each set whose
//! condition holds are appended to the field they target (fields not in the
//! base list come after it). Rules then run one at a time in that order and
//! the first failure is returned.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::database::record::Record;
use crate::database::store::Store;
use crate::error::ApiError;
use crate::models::ModelDef;

pub mod rules;

pub use rules::{is_empty, Check, Rule};

/// What a rule may consult besides the record itself.
pub struct ValidationContext<'a> {
    pub config: &'a Config,
    pub store: &'a dyn Store,
    pub model: &'static ModelDef,
}

/// A named check that needs the record or the store.
///
/// Returning `Ok(false)` fails with the rule's message key; returning an
/// error reports that error as-is.
#[async_trait]
pub trait RecordRule: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(
        &self,
        value: &Value,
        record: &Record,
        ctx: &ValidationContext<'_>,
    ) -> Result<bool, ApiError>;
}

/// Gate for a conditional rule set.
#[async_trait]
pub trait Condition: Send + Sync {
    fn name(&self) -> &'static str;

    async fn applies(&self, record: &Record, ctx: &ValidationContext<'_>) -> Result<bool, ApiError>;
}

#[derive(Debug)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: Vec<Rule>,
}

pub fn field(field: &'static str, rules: Vec<Rule>) -> FieldRules {
    FieldRules { field, rules }
}

struct ConditionalRules {
    condition: Box<dyn Condition>,
    fields: Vec<FieldRules>,
}

#[derive(Default)]
pub struct Validator {
    fields: Vec<FieldRules>,
    conditional: Vec<ConditionalRules>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, rules: Vec<Rule>) -> Self {
        self.fields.push(field(name, rules));
        self
    }

    pub fn when(mut self, condition: impl Condition + 'static, fields: Vec<FieldRules>) -> Self {
        self.conditional.push(ConditionalRules {
            condition: Box::new(condition),
            fields,
        });
        self
    }

    pub async fn validate(&self, record: &Record, ctx: &ValidationContext<'_>) -> Result<(), ApiError> {
        let mut plan: Vec<(&'static str, Vec<&Rule>)> = self
            .fields
            .iter()
            .map(|f| (f.field, f.rules.iter().collect()))
            .collect();

        for set in &self.conditional {
            if !set.condition.applies(record, ctx).await? {
                debug!("Condition {} does not apply", set.condition.name());
                continue;
            }

            for extra in &set.fields {
                match plan.iter_mut().find(|(name, _)| *name == extra.field) {
                    Some((_, rules)) => rules.extend(extra.rules.iter()),
                    None => plan.push((extra.field, extra.rules.iter().collect())),
                }
            }
        }

        for (field, rules) in plan {
            let value = record.get(field).unwrap_or(&Value::Null);
            for rule in rules {
                rule.run(field, value, record, ctx).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvName, Environment};
    use crate::database::memory::MemoryStore;
    use crate::models::organization::ORGANIZATION;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct Always(bool);

    #[async_trait]
    impl Condition for Always {
        fn name(&self) -> &'static str {
            "always"
        }

        async fn applies(&self, _: &Record, _: &ValidationContext<'_>) -> Result<bool, ApiError> {
            Ok(self.0)
        }
    }

    struct Uppercase;

    #[async_trait]
    impl RecordRule for Uppercase {
        fn name(&self) -> &'static str {
            "uppercase"
        }

        async fn check(&self, value: &Value, _: &Record, _: &ValidationContext<'_>) -> Result<bool, ApiError> {
            Ok(value.as_str().is_some_and(|s| s == s.to_uppercase()))
        }
    }

    fn config() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let errors = json!({"errors": {"t": {
            "missingA": {"responseCode": 400, "errorMessage": "missing a"},
            "longA": {"responseCode": 400, "errorMessage": "long a"},
            "upperA": {"responseCode": 400, "errorMessage": "upper a"},
            "missingB": {"responseCode": 400, "errorMessage": "missing b"},
            "emptyC": {"responseCode": 400, "errorMessage": "c must be empty"}
        }}});
        fs::write(dir.path().join("default.json"), errors.to_string()).unwrap();
        let config = Config::new(Environment::new(EnvName::Devlocal, false), dir.path());
        (dir, config)
    }

    fn record(value: Value) -> Record {
        Record::from_input(value).unwrap()
    }

    async fn run(validator: &Validator, value: Value) -> Result<(), ApiError> {
        let (_dir, config) = config();
        let store = MemoryStore::new();
        let ctx = ValidationContext { config: &config, store: &store, model: &ORGANIZATION };
        validator.validate(&record(value), &ctx).await
    }

    fn sample() -> Validator {
        Validator::new()
            .field("A", vec![Rule::required("t.missingA"), Rule::max_length(3, "t.longA")])
            .field("B", vec![Rule::required("t.missingB")])
    }

    #[tokio::test]
    async fn first_failure_in_declaration_order_wins() {
        let err = run(&sample(), json!({})).await.unwrap_err();
        assert_eq!(err.message(), "missing a");

        let err = run(&sample(), json!({"A": "abcd"})).await.unwrap_err();
        assert_eq!(err.message(), "long a");

        let err = run(&sample(), json!({"A": "abc"})).await.unwrap_err();
        assert_eq!(err.message(), "missing b");

        assert!(run(&sample(), json!({"A": "abc", "B": 1})).await.is_ok());
    }

    #[tokio::test]
    async fn non_required_rules_skip_empty_values() {
        let validator = Validator::new().field("A", vec![Rule::max_length(1, "t.longA")]);
        assert!(run(&validator, json!({"A": ""})).await.is_ok());
        assert!(run(&validator, json!({"A": null})).await.is_ok());
    }

    #[tokio::test]
    async fn conditional_rules_append_after_base_rules() {
        let validator = sample()
            .when(Always(true), vec![field("A", vec![Rule::custom_with_message(Uppercase, "t.upperA")])])
            .when(Always(true), vec![field("C", vec![Rule::empty("t.emptyC")])])
            .when(Always(false), vec![field("B", vec![Rule::max_length(0, "t.missingB")])]);

        // base rules on A run before the conditional one
        let err = run(&validator, json!({"A": "abcd", "B": 1})).await.unwrap_err();
        assert_eq!(err.message(), "long a");

        let err = run(&validator, json!({"A": "ab", "B": 1})).await.unwrap_err();
        assert_eq!(err.message(), "upper a");

        let err = run(&validator, json!({"A": "AB", "B": 1, "C": "x"})).await.unwrap_err();
        assert_eq!(err.message(), "c must be empty");

        assert!(run(&validator, json!({"A": "AB", "B": 1})).await.is_ok());
    }

    #[tokio::test]
    async fn unconfigured_message_is_internal() {
        let validator = Validator::new().field("A", vec![Rule::required("t.nope")]);
        let err = run(&validator, json!({})).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
