//! Find query builder.
//!
//! A [`FindQuery`] is the pending query of a table: it is started by
//! [`Table::find_all`], [`Table::find_where`] or [`Table::search`], refined
//! with `bind_param` / `group_by` / `order_by` / `limit`, and consumed by
//! [`FindQuery::fetch`]. Starting a new query never sees state from an earlier
//! one, and a fetched query cannot be fetched again.
//!
//! ```ignore
//! let records = demo
//!     .find_where(["field_name=:field_name"])
//!     .bind_param(":field_name", "field_value")
//!     .group_by(["field_name"])
//!     .order_by("field_name", Order::Desc)
//!     .limit(1, 10)
//!     .fetch(&conn)
//!     .await?;
//! ```

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::record::Record;
use crate::statement::{self, Dialect, Limit, Order, Params, SelectClauses, Statement};
use crate::table::Table;
use crate::value::Value;

/// Placeholder shared by every search column.
pub const SEARCH_PARAM: &str = "term";

/// Pending `SELECT * FROM <table> ...` query.
#[derive(Debug, Clone)]
#[must_use]
pub struct FindQuery {
    table: Table,
    clauses: SelectClauses,
    params: Params,
    /// First invalid column name seen, reported on fetch.
    build_error: Option<String>,
}

impl FindQuery {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table,
            clauses: SelectClauses::default(),
            params: Params::new(),
            build_error: None,
        }
    }

    /// Query matching every row.
    pub(crate) fn all(table: Table) -> Self {
        Self::new(table)
    }

    /// Query AND-joining raw predicate fragments.
    ///
    /// Fragments are inserted into the SQL verbatim; values must go through
    /// placeholders and [`FindQuery::bind_param`].
    pub(crate) fn matching<I, S>(table: Table, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let predicate = criteria
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut query = Self::new(table);
        if !predicate.is_empty() {
            query.clauses.where_clause = Some(predicate);
        }
        query
    }

    /// Query OR-joining `<col> LIKE :term` over the table's search columns.
    pub(crate) fn searching(table: Table, term: &str) -> Self {
        let predicate = table
            .def()
            .search_cols()
            .iter()
            .map(|col| format!("{col} LIKE :{SEARCH_PARAM}"))
            .collect::<Vec<_>>()
            .join(" OR ");

        let mut query = Self::new(table);
        if !predicate.is_empty() {
            query.clauses.where_clause = Some(predicate);
            query.params.bind(SEARCH_PARAM, format!("%{term}%"));
        }
        query
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn clauses(&self) -> &SelectClauses {
        &self.clauses
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Bind a value to a placeholder used in the predicate (`:key` or `key`).
    pub fn bind_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.bind(key, value);
        self
    }

    /// Set `GROUP BY`. Entries may themselves be comma-separated lists.
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut group_by = Vec::new();
        for entry in columns {
            for column in entry.as_ref().split(',').map(str::trim) {
                if let Some(column) = self.checked_column(column) {
                    group_by.push(column);
                }
            }
        }
        self.clauses.group_by = group_by;
        self
    }

    /// Set `ORDER BY`. Accepts an [`Order`] or a sign (`1` / `-1`).
    pub fn order_by(mut self, column: &str, order: impl Into<Order>) -> Self {
        if let Some(column) = self.checked_column(column) {
            self.clauses.order_by = Some((column, order.into()));
        }
        self
    }

    /// Restrict to 1-based `page` of `per_page` rows.
    pub fn limit(mut self, page: i64, per_page: i64) -> Self {
        self.clauses.limit = Some(Limit::page(page, per_page));
        self
    }

    /// Render the query without executing it.
    pub fn statement(&self, dialect: Dialect) -> OrmResult<Statement> {
        if let Some(err) = &self.build_error {
            return Err(OrmError::Validation(err.clone()));
        }
        Ok(statement::select(
            self.table.name(),
            &self.clauses,
            self.params.clone(),
            dialect,
        ))
    }

    /// Execute the query and materialize one record per row, in result order.
    ///
    /// No matching rows is an empty vector.
    pub async fn fetch(self, client: &impl GenericClient) -> OrmResult<Vec<Record>> {
        let stmt = Statement::for_exec(|dialect| self.statement(dialect))?;
        let rows = stmt.fetch_rows(client).await?;
        self.table.materialize(&rows)
    }

    fn checked_column(&mut self, column: &str) -> Option<String> {
        match Ident::parse(column) {
            Ok(ident) => Some(ident.into_string()),
            Err(_) => {
                if self.build_error.is_none() {
                    self.build_error = Some(format!("invalid column name '{column}'"));
                }
                None
            }
        }
    }
}
