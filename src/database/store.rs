//! Persistence seam: every read and write the services perform goes through
//! [`Store`], so the same use cases run against Postgres or in memory.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use super::record::Record;
use crate::models::{JoinTable, ModelDef};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key (primary key or association pair) already exists.
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// One (source, target) pair of a many-to-many relation.
#[derive(Debug, Clone, Copy)]
pub struct Link<'a> {
    pub join: &'a JoinTable,
    pub source: &'a ModelDef,
    pub source_id: &'a str,
    pub target: &'a ModelDef,
    pub target_id: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(String, Value),
    EqualsIgnoreCase(String, String),
    ContainsIgnoreCase(String, String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Equals(c, _) | Filter::EqualsIgnoreCase(c, _) | Filter::ContainsIgnoreCase(c, _) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: false }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<Record>,
    /// Rows matching the filters, ignoring limit/offset.
    pub row_count: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Row by primary key.
    async fn fetch(&self, model: &ModelDef, id: &str) -> Result<Option<Record>, StoreError>;

    /// True when the table holds at least one row.
    async fn any_exists(&self, model: &ModelDef) -> Result<bool, StoreError>;

    /// Insert and return the stored row (ids and defaults filled in).
    async fn insert(&self, model: &ModelDef, fields: Map<String, Value>) -> Result<Record, StoreError>;

    async fn update(&self, model: &ModelDef, id: &str, changes: Map<String, Value>) -> Result<(), StoreError>;

    async fn list(&self, model: &ModelDef, query: &ListQuery) -> Result<Page, StoreError>;

    /// The target row when the pair is linked.
    async fn find_link(&self, link: &Link<'_>) -> Result<Option<Record>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the pair is already linked.
    async fn attach(&self, link: &Link<'_>) -> Result<(), StoreError>;

    /// Returns the number of pairs removed.
    async fn detach(&self, link: &Link<'_>) -> Result<u64, StoreError>;

    /// Connectivity probe for health checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Reject writes naming columns the model does not have.
pub fn check_columns(model: &ModelDef, fields: &Map<String, Value>) -> Result<(), StoreError> {
    match fields.keys().find(|key| !model.has_column(key)) {
        Some(key) => Err(StoreError::UnknownColumn(key.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::organization::ORGANIZATION;
    use serde_json::json;

    #[test]
    fn unknown_columns_are_named() {
        let fields = json!({"OrganizationID": "1", "Colour": "red"});
        let err = check_columns(&ORGANIZATION, fields.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn(c) if c == "Colour"));
    }
}
