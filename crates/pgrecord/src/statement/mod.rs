//! SQL statement rendering and execution.
//!
//! Statements are rendered with named placeholders (`:name`), the form the
//! rest of the crate and its logs speak. Two dialects exist:
//!
//! - [`Dialect::Postgres`] is what gets executed. Named placeholders are
//!   compiled to `$1, $2, ...` right before the statement is sent.
//! - [`Dialect::MySql`] renders the classic active-record shapes
//!   (`LIMIT <offset>,<count>`). It is used as the canonical form in logs.
//!
//! ```ignore
//! use pgrecord::statement::{self, Dialect};
//!
//! let stmt = statement::delete("demo", "id", 5.into());
//! assert_eq!(stmt.sql(), "DELETE FROM demo WHERE id=:id");
//! ```

mod named;

#[cfg(test)]
mod tests;

pub use named::{Compiled, compile};

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::borrow::Cow;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Placeholder name used for the identifier in find/update/delete statements.
pub const ID_PARAM: &str = "id";

/// SQL flavour to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    /// `-1` is descending, any other value ascending.
    pub fn from_sign(sign: i32) -> Self {
        if sign == -1 { Order::Desc } else { Order::Asc }
    }
}

impl From<i32> for Order {
    fn from(sign: i32) -> Self {
        Order::from_sign(sign)
    }
}

/// A page window: `count` rows starting at zero-based `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: i64,
    pub count: i64,
}

impl Limit {
    /// Window for 1-based `page` of `per_page` rows.
    ///
    /// Page `0` or below gives a negative offset, which is rendered unchanged
    /// and left for the server to reject.
    pub fn page(page: i64, per_page: i64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(per_page),
            count: per_page,
        }
    }
}

/// Named parameters bound to a statement, in binding order.
///
/// Keys are stored without the leading `:`; binding the same key twice keeps
/// the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let key = key.strip_prefix(':').unwrap_or(key);
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let key = key.strip_prefix(':').unwrap_or(key);
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Clause fragments of a `SELECT * FROM <table>` query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectClauses {
    /// Predicate text, without the `WHERE` keyword.
    pub where_clause: Option<String>,
    pub group_by: Vec<String>,
    pub order_by: Option<(String, Order)>,
    pub limit: Option<Limit>,
}

/// A rendered statement with its named parameters.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Statement {
    sql: String,
    params: Params,
    canonical: Option<String>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
            canonical: None,
        }
    }

    /// Render with `build` for execution, remembering the MySQL-shaped form
    /// for logging when it differs.
    pub fn for_exec(build: impl Fn(Dialect) -> OrmResult<Statement>) -> OrmResult<Statement> {
        let mut stmt = build(Dialect::Postgres)?;
        let canonical = build(Dialect::MySql)?;
        if canonical.sql != stmt.sql {
            stmt.canonical = Some(canonical.sql);
        }
        Ok(stmt)
    }

    /// SQL text with named placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The canonical (MySQL-shaped) SQL, if it differs from [`Statement::sql`].
    pub fn canonical_sql(&self) -> Option<&str> {
        self.canonical.as_deref()
    }

    /// Compile to positional placeholders.
    pub fn compile(&self) -> OrmResult<Compiled<'_>> {
        compile(&self.sql, &self.params)
    }

    /// Execute the statement and return all rows.
    pub async fn fetch_rows(&self, client: &impl GenericClient) -> OrmResult<Vec<Row>> {
        let compiled = self.compile()?;
        self.trace(&compiled);
        let params = compiled.params_ref();
        client.query(&compiled.sql, &params).await
    }

    /// Execute a statement that always yields exactly one row.
    pub async fn fetch_one(&self, client: &impl GenericClient) -> OrmResult<Row> {
        let compiled = self.compile()?;
        self.trace(&compiled);
        let params = compiled.params_ref();
        client.query_one(&compiled.sql, &params).await
    }

    /// Execute the statement and return the number of affected rows.
    pub async fn execute(&self, client: &impl GenericClient) -> OrmResult<u64> {
        let compiled = self.compile()?;
        self.trace(&compiled);
        let params = compiled.params_ref();
        client.execute(&compiled.sql, &params).await
    }

    fn trace(&self, compiled: &Compiled<'_>) {
        let canonical_sql = self.canonical.as_deref().unwrap_or(&self.sql);
        tracing::debug!(
            target: "pgrecord.sql",
            param_count = compiled.params.len(),
            sql = %compiled.sql,
            canonical_sql = %canonical_sql,
        );
    }
}

impl Compiled<'_> {
    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|v| *v as &(dyn ToSql + Sync))
            .collect()
    }
}

/// Render a column name, quoting it when it is not a plain lowercase name.
pub(crate) fn column_sql(name: &str, dialect: Dialect) -> Cow<'_, str> {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c == '_' || c == '$' || c.is_ascii_lowercase() || c.is_ascii_digit());
    if plain {
        return Cow::Borrowed(name);
    }
    match dialect {
        Dialect::Postgres => Cow::Owned(format!("\"{}\"", name.replace('"', "\"\""))),
        Dialect::MySql => Cow::Owned(format!("`{}`", name.replace('`', "``"))),
    }
}

/// Placeholder name for a column: the column itself when it is a valid
/// placeholder token, otherwise a positional fallback.
pub(crate) fn placeholder_for(name: &str, position: usize) -> Cow<'_, str> {
    if named::is_placeholder_name(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("__p{position}"))
    }
}

/// `SELECT COUNT(<id>) AS nb FROM <table>`
pub fn count(table: &str, id_col: &str) -> Statement {
    Statement::new(
        format!("SELECT COUNT({id_col}) AS nb FROM {table}"),
        Params::new(),
    )
}

/// `SELECT * FROM <table> WHERE <id>=:id`
pub fn find_by_id(table: &str, id_col: &str, id: Value) -> Statement {
    let mut params = Params::new();
    params.bind(ID_PARAM, id);
    Statement::new(
        format!("SELECT * FROM {table} WHERE {id_col}=:{ID_PARAM}"),
        params,
    )
}

/// `SELECT * FROM <table> [WHERE ...] [GROUP BY ...] [ORDER BY ... [DESC]] [LIMIT ...]`
pub fn select(table: &str, clauses: &SelectClauses, params: Params, dialect: Dialect) -> Statement {
    let mut sql = format!("SELECT * FROM {table}");

    if let Some(predicate) = clauses.where_clause.as_deref().filter(|w| !w.is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(predicate);
    }
    if !clauses.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&clauses.group_by.join(","));
    }
    if let Some((column, order)) = &clauses.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(column);
        if *order == Order::Desc {
            sql.push_str(" DESC");
        }
    }
    if let Some(Limit { offset, count }) = clauses.limit {
        match dialect {
            Dialect::MySql => sql.push_str(&format!(" LIMIT {offset},{count}")),
            Dialect::Postgres => sql.push_str(&format!(" LIMIT {count} OFFSET {offset}")),
        }
    }

    Statement::new(sql, params)
}

/// `INSERT INTO <table> (<cols>) VALUES (<:cols>)`
pub fn insert<'a>(
    table: &str,
    columns: impl IntoIterator<Item = (&'a str, &'a Value)>,
    dialect: Dialect,
) -> Statement {
    let mut names = Vec::new();
    let mut placeholders = Vec::new();
    let mut params = Params::new();

    for (i, (name, value)) in columns.into_iter().enumerate() {
        let placeholder = placeholder_for(name, i + 1);
        names.push(column_sql(name, dialect).into_owned());
        placeholders.push(format!(":{placeholder}"));
        params.bind(&placeholder, value.clone());
    }

    let sql = match (names.is_empty(), dialect) {
        (true, Dialect::Postgres) => format!("INSERT INTO {table} DEFAULT VALUES"),
        _ => format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(","),
            placeholders.join(",")
        ),
    };

    Statement::new(sql, params)
}

/// `UPDATE <table> SET <col=:col,...> WHERE <id>=:id`
///
/// Fails when there is nothing to set, or when a column's placeholder would
/// collide with the `:id` key placeholder.
pub fn update<'a>(
    table: &str,
    id_col: &str,
    id: &Value,
    columns: impl IntoIterator<Item = (&'a str, &'a Value)>,
    dialect: Dialect,
) -> OrmResult<Statement> {
    let mut assignments = Vec::new();
    let mut params = Params::new();

    for (i, (name, value)) in columns.into_iter().enumerate() {
        let placeholder = placeholder_for(name, i + 1);
        if placeholder == ID_PARAM {
            return Err(OrmError::validation(format!(
                "column '{name}' of {table} collides with the :{ID_PARAM} placeholder"
            )));
        }
        assignments.push(format!("{}=:{placeholder}", column_sql(name, dialect)));
        params.bind(&placeholder, value.clone());
    }

    if assignments.is_empty() {
        return Err(OrmError::validation(format!(
            "nothing to update in {table}: every column is the identifier or blacklisted"
        )));
    }

    params.bind(ID_PARAM, id.clone());
    Ok(Statement::new(
        format!(
            "UPDATE {table} SET {} WHERE {id_col}=:{ID_PARAM}",
            assignments.join(",")
        ),
        params,
    ))
}

/// `DELETE FROM <table> WHERE <id>=:id`
pub fn delete(table: &str, id_col: &str, id: Value) -> Statement {
    let mut params = Params::new();
    params.bind(ID_PARAM, id);
    Statement::new(
        format!("DELETE FROM {table} WHERE {id_col}=:{ID_PARAM}"),
        params,
    )
}

/// `SELECT lastval() AS id`
pub fn last_id() -> Statement {
    Statement::new("SELECT lastval() AS id", Params::new())
}
