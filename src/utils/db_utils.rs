use crate::error::ApiError;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use sqlx::{
    FromRow, MySqlPool,
    mysql::{MySql, MySqlArguments, MySqlRow},
    query::{Query, QueryAs, QueryScalar},
};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Null,
}

/// What a column accepts in a partial update payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    Text,
    /// Text that may not be blank
    RequiredText,
    Id,
    NullableId,
    Int,
    Bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys listed in `columns` are accepted; column names are never taken
/// from the payload itself.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    columns: &[Column],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, ApiError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    build_update_from_map(table, obj, columns, id_column, id_value)
}

pub fn build_update_from_map(
    table: &str,
    obj: &Map<String, Value>,
    columns: &[Column],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, ApiError> {
    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let mut assignments = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let column = columns
            .iter()
            .find(|c| c.name == key)
            .ok_or_else(|| ApiError::bad_request(format!("Field '{key}' cannot be updated")))?;

        values.push(convert(column, value)?);
        assignments.push(format!("{} = ?", column.name));
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        assignments.join(", "),
        id_column
    );

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

fn convert(column: &Column, value: &Value) -> Result<SqlValue, ApiError> {
    let invalid = || ApiError::bad_request(format!("Invalid value for '{}'", column.name));

    match (column.kind, value) {
        (ColumnKind::Text, Value::String(s)) => Ok(SqlValue::String(s.trim().to_string())),
        (ColumnKind::Text, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::RequiredText, Value::String(s)) if !s.trim().is_empty() => {
            Ok(SqlValue::String(s.trim().to_string()))
        }
        (ColumnKind::Id, Value::Number(n)) | (ColumnKind::NullableId, Value::Number(n)) => {
            n.as_u64().map(SqlValue::U64).ok_or_else(invalid)
        }
        (ColumnKind::NullableId, Value::Null) => Ok(SqlValue::Null),
        (ColumnKind::Int, Value::Number(n)) => n.as_i64().map(SqlValue::I64).ok_or_else(invalid),
        (ColumnKind::Bool, Value::Bool(b)) => Ok(SqlValue::Bool(*b)),
        _ => Err(invalid()),
    }
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query: Query<'_, MySql, MySqlArguments> = sqlx::query(&update.sql);

    for value in &update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v.as_str()),
            SqlValue::U64(v) => query.bind(*v),
            SqlValue::I64(v) => query.bind(*v),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::DateTime(v) => query.bind(*v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// `?, ?, ?` for an `IN (...)` list of `n` items.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Loads every row of `select` whose `column` is one of `ids`.
///
/// `select` must not carry a WHERE clause; `suffix` (ORDER BY ...) is
/// appended after the generated one.
pub async fn fetch_where_in<T>(
    pool: &MySqlPool,
    select: &str,
    column: &str,
    ids: &[u64],
    suffix: &str,
) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "{select} WHERE {column} IN ({}) {suffix}",
        placeholders(ids.len())
    );
    let mut query = sqlx::query_as::<_, T>(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    query.fetch_all(pool).await
}

/// WHERE clause assembled from optional filters, with its bind values.
#[derive(Debug, Default)]
pub struct Filter {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl Filter {
    /// Adds a condition; `values` must match its placeholders in order.
    pub fn push(&mut self, condition: &str, values: impl IntoIterator<Item = SqlValue>) {
        self.conditions.push(condition.to_string());
        self.values.extend(values);
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn bind_as<'q, O>(
        &'q self,
        mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    ) -> QueryAs<'q, MySql, O, MySqlArguments> {
        for value in &self.values {
            query = match value {
                SqlValue::String(v) => query.bind(v.as_str()),
                SqlValue::U64(v) => query.bind(*v),
                SqlValue::I64(v) => query.bind(*v),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::DateTime(v) => query.bind(*v),
                SqlValue::Null => query.bind(None::<String>),
            };
        }
        query
    }

    pub fn bind_scalar<'q, O>(
        &'q self,
        mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    ) -> QueryScalar<'q, MySql, O, MySqlArguments> {
        for value in &self.values {
            query = match value {
                SqlValue::String(v) => query.bind(v.as_str()),
                SqlValue::U64(v) => query.bind(*v),
                SqlValue::I64(v) => query.bind(*v),
                SqlValue::Bool(v) => query.bind(*v),
                SqlValue::DateTime(v) => query.bind(*v),
                SqlValue::Null => query.bind(None::<String>),
            };
        }
        query
    }
}

/// `%term%` for LIKE searches, with LIKE wildcards in the term escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
