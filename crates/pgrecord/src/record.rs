//! Records: one row's worth of column state plus persistence.

use crate::client::GenericClient;
use crate::columns::ColumnSet;
use crate::error::OrmResult;
use crate::statement::{self, Statement};
use crate::table::{Table, WriteOp};
use crate::value::Value;
use tokio_postgres::Row;

/// One record of a [`Table`].
///
/// A record whose identifier column is empty (see [`Value::is_empty`]) has not
/// been persisted yet: [`Record::save`] inserts it, otherwise it updates the
/// row with that identifier.
#[derive(Debug, Clone)]
pub struct Record {
    table: Table,
    columns: ColumnSet,
}

impl Record {
    pub(crate) fn new(table: Table) -> Self {
        let columns = ColumnSet::with_names(table.column_names().iter().cloned());
        Self { table, columns }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// All column values.
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    /// Value of `column`; `None` if the table has no such column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Set `column` and return the stored value; `None` (and no change) if
    /// the table has no such column.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Option<&Value> {
        self.columns.set(column, value)
    }

    /// Overwrite every known column present in `data`; unknown keys are ignored.
    pub fn hydrate<I, K, V>(&mut self, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.columns.hydrate(data);
    }

    /// [`Record::hydrate`] from a JSON object. Anything but an object is ignored.
    pub fn hydrate_json(&mut self, data: &serde_json::Value) {
        if let Some(object) = data.as_object() {
            self.columns
                .hydrate(object.iter().map(|(k, v)| (k, Value::from(v.clone()))));
        }
    }

    pub(crate) fn hydrate_row(&mut self, row: &Row) -> OrmResult<()> {
        self.columns.hydrate_row(row)
    }

    /// Current identifier value.
    pub fn id(&self) -> Option<&Value> {
        self.columns.get(self.table.id_col())
    }

    /// Whether the identifier is empty, i.e. `save` will INSERT.
    pub fn is_new(&self) -> bool {
        self.id().is_none_or(Value::is_empty)
    }

    /// The statement [`Record::save`] would run.
    ///
    /// - new record: INSERT of every column except the identifier and the
    ///   insert blacklist
    /// - persisted record: UPDATE of every column except the identifier and
    ///   the update blacklist, keyed by the identifier
    pub fn save_statement(&self) -> OrmResult<Statement> {
        let def = self.table.def();
        let id_col = def.id_col();

        if self.is_new() {
            let mut excluded: Vec<&str> = def
                .blacklist()
                .get(WriteOp::Insert)
                .iter()
                .map(String::as_str)
                .collect();
            excluded.push(id_col);

            Statement::for_exec(|dialect| {
                Ok(statement::insert(
                    def.name(),
                    self.columns.without(&excluded),
                    dialect,
                ))
            })
        } else {
            let mut excluded: Vec<&str> = def
                .blacklist()
                .get(WriteOp::Update)
                .iter()
                .map(String::as_str)
                .collect();
            excluded.push(id_col);
            let id = self.id().cloned().unwrap_or_default();

            Statement::for_exec(|dialect| {
                statement::update(
                    def.name(),
                    id_col,
                    &id,
                    self.columns.without(&excluded),
                    dialect,
                )
            })
        }
    }

    /// Insert or update this record.
    ///
    /// Returns whether a row was written. The generated identifier of an
    /// insert is available from [`Table::last_id`].
    pub async fn save(&self, client: &impl GenericClient) -> OrmResult<bool> {
        let stmt = self.save_statement()?;
        let affected = stmt.execute(client).await?;
        Ok(affected > 0)
    }

    /// Delete this record's row.
    ///
    /// A record with an empty identifier issues no statement and returns `false`.
    pub async fn remove(&self, client: &impl GenericClient) -> OrmResult<bool> {
        let Some(id) = self.id().filter(|id| !id.is_empty()) else {
            tracing::debug!(table = self.table.name(), "remove skipped: record has no identifier");
            return Ok(false);
        };
        let stmt = statement::delete(self.table.name(), self.table.id_col(), id.clone());
        let affected = stmt.execute(client).await?;
        Ok(affected > 0)
    }
}
