//! In-process [`Store`] used for devlocal runs without a database and for tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::record::{value_to_id, Record};
use super::store::{check_columns, Filter, Link, ListQuery, Page, Store, StoreError};
use crate::models::ModelDef;

type Row = Map<String, Value>;

#[derive(Default)]
struct State {
    tables: HashMap<&'static str, Vec<Row>>,
    sequences: HashMap<&'static str, u64>,
}

impl State {
    fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn find(&self, model: &ModelDef, id: &str) -> Option<&Row> {
        self.rows(model.table_name)
            .iter()
            .find(|row| row_id(row, model.id_attribute).as_deref() == Some(id))
    }

    /// Row plus its computed count columns.
    fn materialise(&self, model: &ModelDef, row: &Row) -> Record {
        let mut row = row.clone();
        if let Some(id) = row_id(&row, model.id_attribute) {
            for count in model.count_columns {
                let n = self
                    .rows(count.table)
                    .iter()
                    .filter(|other| row_id(other, count.foreign_key).as_deref() == Some(id.as_str()))
                    .count();
                row.insert(count.alias.to_string(), Value::from(n as u64));
            }
        }
        Record::from_stored(row)
    }

    fn is_linked(&self, link: &Link<'_>) -> bool {
        self.rows(link.join.table).iter().any(|row| {
            row_id(row, link.join.foreign_key).as_deref() == Some(link.source_id)
                && row_id(row, link.join.other_key).as_deref() == Some(link.target_id)
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a raw row into any table, bypassing column checks.
    pub async fn seed(&self, table: &'static str, row: Value) {
        if let Value::Object(row) = row {
            self.state.write().await.tables.entry(table).or_default().push(row);
        }
    }

    pub async fn count(&self, table: &str) -> usize {
        self.state.read().await.rows(table).len()
    }
}

fn row_id(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(value_to_id)
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn values_equal(stored: &Value, wanted: &Value) -> bool {
    if stored == wanted {
        return true;
    }
    match (as_flag(stored), as_flag(wanted)) {
        (Some(a), Some(b)) if stored.is_boolean() || wanted.is_boolean() => a == b,
        _ => false,
    }
}

fn row_matches(row: &Row, filter: &Filter) -> bool {
    let stored = row.get(filter.column()).unwrap_or(&Value::Null);
    match filter {
        Filter::Equals(_, wanted) => values_equal(stored, wanted),
        Filter::EqualsIgnoreCase(_, wanted) => as_text(stored) == Some(wanted.to_lowercase()),
        Filter::ContainsIgnoreCase(_, needle) => {
            as_text(stored).is_some_and(|text| text.contains(&needle.to_lowercase()))
        }
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => as_text(a).cmp(&as_text(b)),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch(&self, model: &ModelDef, id: &str) -> Result<Option<Record>, StoreError> {
        let state = self.state.read().await;
        Ok(state.find(model, id).map(|row| state.materialise(model, row)))
    }

    async fn any_exists(&self, model: &ModelDef) -> Result<bool, StoreError> {
        Ok(!self.state.read().await.rows(model.table_name).is_empty())
    }

    async fn insert(&self, model: &ModelDef, mut fields: Map<String, Value>) -> Result<Record, StoreError> {
        check_columns(model, &fields)?;
        let mut state = self.state.write().await;

        if model.numeric_id {
            let next = state.sequences.entry(model.table_name).or_insert(0);
            match fields.get(model.id_attribute).and_then(Value::as_u64) {
                // explicit ids move the sequence past them, like setval on a serial
                Some(explicit) => *next = (*next).max(explicit),
                None => {
                    *next += 1;
                    fields.insert(model.id_attribute.to_string(), Value::from(*next));
                }
            }
        }

        let id = row_id(&fields, model.id_attribute)
            .ok_or_else(|| StoreError::Query(format!("{} requires {}", model.table_name, model.id_attribute)))?;
        if state.find(model, &id).is_some() {
            return Err(StoreError::Duplicate(format!("{}.{} = {}", model.table_name, model.id_attribute, id)));
        }

        for (column, default) in model.defaults {
            fields.entry(column.to_string()).or_insert(Value::Bool(*default));
        }
        for column in ["CreatedAt", "UpdatedAt"] {
            if model.has_column(column) {
                fields.entry(column.to_string()).or_insert_with(now);
            }
        }

        debug!("memory insert {} {}", model.table_name, id);
        let record = state.materialise(model, &fields);
        state.tables.entry(model.table_name).or_default().push(fields);
        Ok(record)
    }

    async fn update(&self, model: &ModelDef, id: &str, changes: Map<String, Value>) -> Result<(), StoreError> {
        check_columns(model, &changes)?;
        let mut state = self.state.write().await;

        let row = state
            .tables
            .get_mut(model.table_name)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row_id(row, model.id_attribute).as_deref() == Some(id))
            })
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", model.table_name, id)))?;

        for (column, value) in changes {
            row.insert(column, value);
        }
        if model.has_column("UpdatedAt") {
            row.insert("UpdatedAt".to_string(), now());
        }
        Ok(())
    }

    async fn list(&self, model: &ModelDef, query: &ListQuery) -> Result<Page, StoreError> {
        let referenced = query
            .filters
            .iter()
            .map(Filter::column)
            .chain(query.order_by.iter().map(|o| o.column.as_str()));
        for column in referenced {
            if !model.is_readable(column) {
                return Err(StoreError::UnknownColumn(column.to_string()));
            }
        }

        let state = self.state.read().await;
        let mut rows: Vec<Record> = state
            .rows(model.table_name)
            .iter()
            .filter(|row| query.filters.iter().all(|f| row_matches(row, f)))
            .map(|row| state.materialise(model, row))
            .collect();

        rows.sort_by(|a, b| {
            query
                .order_by
                .iter()
                .map(|order| {
                    let left = a.get(&order.column).unwrap_or(&Value::Null);
                    let right = b.get(&order.column).unwrap_or(&Value::Null);
                    let ordering = compare(left, right);
                    if order.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let row_count = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();

        Ok(Page { rows, row_count })
    }

    async fn find_link(&self, link: &Link<'_>) -> Result<Option<Record>, StoreError> {
        let state = self.state.read().await;
        if !state.is_linked(link) {
            return Ok(None);
        }
        Ok(state
            .find(link.target, link.target_id)
            .map(|row| state.materialise(link.target, row)))
    }

    async fn attach(&self, link: &Link<'_>) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if state.find(link.source, link.source_id).is_none() {
            return Err(StoreError::NotFound(format!("{} {}", link.source.table_name, link.source_id)));
        }
        let target_key = match state.find(link.target, link.target_id) {
            Some(row) => row.get(link.target.id_attribute).cloned().unwrap_or(Value::Null),
            None => {
                return Err(StoreError::NotFound(format!("{} {}", link.target.table_name, link.target_id)))
            }
        };
        let source_key = state
            .find(link.source, link.source_id)
            .and_then(|row| row.get(link.source.id_attribute).cloned())
            .unwrap_or(Value::Null);

        if state.is_linked(link) {
            return Err(StoreError::Duplicate(format!(
                "{} ({}, {})",
                link.join.table, link.source_id, link.target_id
            )));
        }

        let mut row = Row::new();
        row.insert(link.join.foreign_key.to_string(), source_key);
        row.insert(link.join.other_key.to_string(), target_key);
        state.tables.entry(link.join.table).or_default().push(row);
        Ok(())
    }

    async fn detach(&self, link: &Link<'_>) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let Some(rows) = state.tables.get_mut(link.join.table) else {
            return Ok(0);
        };

        let before = rows.len();
        rows.retain(|row| {
            !(row_id(row, link.join.foreign_key).as_deref() == Some(link.source_id)
                && row_id(row, link.join.other_key).as_deref() == Some(link.target_id))
        });
        Ok((before - rows.len()) as u64)
    }
}
