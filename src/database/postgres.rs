//! Postgres [`Store`]. Rows come back through `row_to_json` so no per-table
//! column mapping is needed, and writes go through `jsonb_populate_record`
//! so JSON input is coerced to the column types by the database.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::debug;

use super::record::Record;
use super::store::{check_columns, Filter, Link, ListQuery, Page, Store, StoreError};
use crate::models::ModelDef;
use crate::util::escape_like;

const UNIQUE_VIOLATION: &str = "23505";
const UNDEFINED_COLUMN: &str = "42703";

static COLUMN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"column "([^"]+)""#).expect("Invalid column regex"));

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, StoreError> {
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_param(q, p);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(map_error)?;
        rows.iter().map(row_record).collect()
    }
}

/// Quote SQL identifier to prevent injection
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"table".*` plus any computed count columns.
fn select_list(model: &ModelDef) -> String {
    let table = quote(model.table_name);
    let mut columns = vec![format!("{table}.*")];
    for count in model.count_columns {
        columns.push(format!(
            "(SELECT COUNT(*) FROM {child} c WHERE c.{fk} = {table}.{id}) AS {alias}",
            child = quote(count.table),
            fk = quote(count.foreign_key),
            id = quote(model.id_attribute),
            alias = quote(count.alias),
        ));
    }
    columns.join(", ")
}

fn row_record(row: &sqlx::postgres::PgRow) -> Result<Record, StoreError> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(map) => Ok(Record::from_stored(map)),
        other => Err(StoreError::Query(format!("expected a JSON object row, got {other}"))),
    }
}

fn map_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return StoreError::Duplicate(db.message().to_string()),
            Some(UNDEFINED_COLUMN) => {
                let column = COLUMN_NAME
                    .captures(db.message())
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                return StoreError::UnknownColumn(column);
            }
            _ => {}
        }
    }
    StoreError::Sqlx(err)
}

fn bind_param<'q>(
    q: Query<'q, Postgres, PgArguments>,
    v: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

/// WHERE clause for the filters, pushing bind values onto `params`.
fn where_clause(model: &ModelDef, filters: &[Filter], params: &mut Vec<Value>) -> Result<String, StoreError> {
    let mut clauses = Vec::with_capacity(filters.len());
    for filter in filters {
        if !model.has_column(filter.column()) {
            return Err(StoreError::UnknownColumn(filter.column().to_string()));
        }
        let column = format!("{}.{}", quote(model.table_name), quote(filter.column()));

        let clause = match filter {
            Filter::Equals(_, value) => {
                params.push(value.clone());
                format!("{column} = ${}", params.len())
            }
            Filter::EqualsIgnoreCase(_, value) => {
                params.push(Value::String(value.clone()));
                format!("LOWER({column}::text) = LOWER(${})", params.len())
            }
            Filter::ContainsIgnoreCase(_, needle) => {
                params.push(Value::String(format!("%{}%", escape_like(needle))));
                format!("{column}::text ILIKE ${} ESCAPE '\\'", params.len())
            }
        };
        clauses.push(clause);
    }

    if clauses.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn fetch(&self, model: &ModelDef, id: &str) -> Result<Option<Record>, StoreError> {
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT {} FROM {} WHERE {}::text = $1) t",
            select_list(model),
            quote(model.table_name),
            quote(model.id_attribute),
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_error)?;
        row.as_ref().map(row_record).transpose()
    }

    async fn any_exists(&self, model: &ModelDef) -> Result<bool, StoreError> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {}) AS present", quote(model.table_name));
        let row = sqlx::query(&sql).fetch_one(&self.pool).await.map_err(map_error)?;
        Ok(row.try_get::<bool, _>("present")?)
    }

    async fn insert(&self, model: &ModelDef, fields: Map<String, Value>) -> Result<Record, StoreError> {
        check_columns(model, &fields)?;

        let table = quote(model.table_name);
        let columns = fields.keys().map(|k| quote(k)).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "WITH inserted AS (\
                INSERT INTO {table} ({columns}) \
                SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
                RETURNING *\
             ) SELECT row_to_json(inserted) AS row FROM inserted"
        );
        debug!("insert into {}: {} column(s)", model.table_name, fields.len());

        let row = sqlx::query(&sql)
            .bind(Value::Object(fields))
            .fetch_one(&self.pool)
            .await
            .map_err(map_error)?;
        row_record(&row)
    }

    async fn update(&self, model: &ModelDef, id: &str, changes: Map<String, Value>) -> Result<(), StoreError> {
        check_columns(model, &changes)?;

        let table = quote(model.table_name);
        let mut assignments: Vec<String> = changes
            .keys()
            .map(|k| format!("{col} = r.{col}", col = quote(k)))
            .collect();
        if model.has_column("UpdatedAt") && !changes.contains_key("UpdatedAt") {
            assignments.push(format!("{} = now()", quote("UpdatedAt")));
        }
        if assignments.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE {table} SET {} FROM jsonb_populate_record(NULL::{table}, $1) AS r \
             WHERE {table}.{}::text = $2",
            assignments.join(", "),
            quote(model.id_attribute),
        );

        let result = sqlx::query(&sql)
            .bind(Value::Object(changes))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{} {}", model.table_name, id)));
        }
        Ok(())
    }

    async fn list(&self, model: &ModelDef, query: &ListQuery) -> Result<Page, StoreError> {
        let table = quote(model.table_name);
        let mut params = Vec::new();
        let filter_sql = where_clause(model, &query.filters, &mut params)?;

        let count_sql = format!("SELECT COUNT(*) AS n FROM {table}{filter_sql}");
        let mut count_query = sqlx::query(&count_sql);
        for p in &params {
            count_query = bind_param(count_query, p);
        }
        let row_count: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(map_error)?
            .try_get("n")?;

        let mut order = Vec::with_capacity(query.order_by.len());
        for o in &query.order_by {
            if !model.is_readable(&o.column) {
                return Err(StoreError::UnknownColumn(o.column.clone()));
            }
            order.push(format!("{} {}", quote(&o.column), if o.descending { "DESC" } else { "ASC" }));
        }
        let order_sql = if order.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", order.join(", "))
        };

        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT {} FROM {table}{filter_sql}{order_sql} LIMIT {} OFFSET {}) t",
            select_list(model),
            query.limit,
            query.offset,
        );
        let rows = self.fetch_rows(&sql, &params).await?;

        Ok(Page { rows, row_count: row_count.max(0) as u64 })
    }

    async fn find_link(&self, link: &Link<'_>) -> Result<Option<Record>, StoreError> {
        let target = quote(link.target.table_name);
        let join = quote(link.join.table);
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (\
                SELECT {select} FROM {target} \
                JOIN {join} ON {join}.{other}::text = {target}.{target_id}::text \
                WHERE {join}.{fk}::text = $1 AND {target}.{target_id}::text = $2 \
                LIMIT 1\
             ) t",
            select = select_list(link.target),
            other = quote(link.join.other_key),
            fk = quote(link.join.foreign_key),
            target_id = quote(link.target.id_attribute),
        );

        let mut rows = self
            .fetch_rows(&sql, &[Value::from(link.source_id), Value::from(link.target_id)])
            .await?;
        Ok(rows.pop())
    }

    async fn attach(&self, link: &Link<'_>) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {join} ({fk}, {other}) \
             SELECT s.{source_id}, g.{target_id} FROM {source} s CROSS JOIN {target} g \
             WHERE s.{source_id}::text = $1 AND g.{target_id}::text = $2",
            join = quote(link.join.table),
            fk = quote(link.join.foreign_key),
            other = quote(link.join.other_key),
            source = quote(link.source.table_name),
            target = quote(link.target.table_name),
            source_id = quote(link.source.id_attribute),
            target_id = quote(link.target.id_attribute),
        );

        let result = sqlx::query(&sql)
            .bind(link.source_id)
            .bind(link.target_id)
            .execute(&self.pool)
            .await
            .map_err(map_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "{} ({}, {})",
                link.join.table, link.source_id, link.target_id
            )));
        }
        Ok(())
    }

    async fn detach(&self, link: &Link<'_>) -> Result<u64, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {}::text = $1 AND {}::text = $2",
            quote(link.join.table),
            quote(link.join.foreign_key),
            quote(link.join.other_key),
        );

        let result = sqlx::query(&sql)
            .bind(link.source_id)
            .bind(link.target_id)
            .execute(&self.pool)
            .await
            .map_err(map_error)?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::ASSESSMENT;
    use crate::models::organization::ORGANIZATION;
    use serde_json::json;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote("organization"), "\"organization\"");
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn select_list_adds_count_columns() {
        let select = select_list(&ASSESSMENT);
        assert!(select.starts_with("\"assessment\".*"));
        assert!(select.contains("AS \"AssessmentFormCount\""));
        assert_eq!(select_list(&ORGANIZATION), "\"organization\".*");
    }

    #[test]
    fn where_clause_numbers_placeholders() {
        let mut params = Vec::new();
        let sql = where_clause(
            &ORGANIZATION,
            &[
                Filter::Equals("Active".into(), json!(true)),
                Filter::ContainsIgnoreCase("OrganizationName".into(), "50%".into()),
            ],
            &mut params,
        )
        .unwrap();

        assert_eq!(
            sql,
            " WHERE \"organization\".\"Active\" = $1 AND \"organization\".\"OrganizationName\"::text ILIKE $2 ESCAPE '\\'"
        );
        assert_eq!(params, vec![json!(true), json!("%50\\%%")]);
    }

    #[test]
    fn where_clause_rejects_unknown_columns() {
        let mut params = Vec::new();
        let err = where_clause(&ORGANIZATION, &[Filter::Equals("Colour".into(), json!(1))], &mut params)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn(c) if c == "Colour"));
    }
}
