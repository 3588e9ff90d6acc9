//! Table definitions and the table handle.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::ident::{Ident, validate_all};
use crate::query::FindQuery;
use crate::record::Record;
use crate::schema::describe_table;
use crate::statement;
use crate::value::Value;
use std::sync::Arc;
use tokio_postgres::Row;

/// Write operation a blacklist applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOp {
    Insert,
    Update,
}

/// Columns left out of generated INSERT / UPDATE statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    insert: Vec<String>,
    update: Vec<String>,
}

impl Blacklist {
    pub fn get(&self, op: WriteOp) -> &[String] {
        match op {
            WriteOp::Insert => &self.insert,
            WriteOp::Update => &self.update,
        }
    }

    pub fn add<I, S>(&mut self, op: WriteOp, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = match op {
            WriteOp::Insert => &mut self.insert,
            WriteOp::Update => &mut self.update,
        };
        for column in columns {
            let column = column.into();
            if !list.contains(&column) {
                list.push(column);
            }
        }
    }

    pub fn contains(&self, op: WriteOp, column: &str) -> bool {
        self.get(op).iter().any(|c| c == column)
    }
}

/// Per-table configuration: name, identifier column, blacklists and search columns.
///
/// # Example
///
/// ```rust
/// use pgrecord::{TableDef, WriteOp};
///
/// let def = TableDef::new("demo")
///     .with_search_cols(["field1", "field2"])
///     .with_blacklist(WriteOp::Update, ["field_name"]);
/// assert_eq!(def.id_col(), "id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    id_col: String,
    search_cols: Vec<String>,
    blacklist: Blacklist,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_col: "id".to_string(),
            search_cols: Vec::new(),
            blacklist: Blacklist::default(),
        }
    }

    /// Definition declared by a [`Model`].
    pub fn of<M: Model + ?Sized>() -> Self {
        M::table_def()
    }

    pub fn with_id_col(mut self, col: impl Into<String>) -> Self {
        self.id_col = col.into();
        self
    }

    pub fn with_search_cols<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_cols = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_blacklist<I, S>(mut self, op: WriteOp, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.add(op, cols);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_col(&self) -> &str {
        &self.id_col
    }

    pub fn search_cols(&self) -> &[String] {
        &self.search_cols
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Check that every configured name is a safe identifier.
    pub fn validate(&self) -> OrmResult<()> {
        Ident::parse(&self.name)?;
        Ident::parse(&self.id_col)?;
        validate_all(&self.search_cols)?;
        validate_all(self.blacklist.get(WriteOp::Insert))?;
        validate_all(self.blacklist.get(WriteOp::Update))?;
        Ok(())
    }
}

/// Declarative configuration of a concrete table type.
///
/// Everything has a default; the table name defaults to the lower-cased type name.
///
/// ```rust
/// use pgrecord::{Model, TableDef};
///
/// struct Demo;
///
/// impl Model for Demo {
///     const UPDATE_BLACKLIST: &'static [&'static str] = &["field_name"];
///     const SEARCH_COLUMNS: &'static [&'static str] = &["field1", "field2"];
/// }
///
/// assert_eq!(TableDef::of::<Demo>().name(), "demo");
/// ```
pub trait Model {
    /// Table name; `None` uses the lower-cased type name.
    const TABLE_NAME: Option<&'static str> = None;
    /// Identifier column.
    const IDENTIFIER: &'static str = "id";
    /// Columns matched by [`Table::search`].
    const SEARCH_COLUMNS: &'static [&'static str] = &[];
    /// Columns never written by INSERT.
    const INSERT_BLACKLIST: &'static [&'static str] = &[];
    /// Columns never written by UPDATE.
    const UPDATE_BLACKLIST: &'static [&'static str] = &[];

    fn table_def() -> TableDef {
        let name = match Self::TABLE_NAME {
            Some(name) => name.to_string(),
            None => type_table_name::<Self>(),
        };
        TableDef::new(name)
            .with_id_col(Self::IDENTIFIER)
            .with_search_cols(Self::SEARCH_COLUMNS.iter().copied())
            .with_blacklist(WriteOp::Insert, Self::INSERT_BLACKLIST.iter().copied())
            .with_blacklist(WriteOp::Update, Self::UPDATE_BLACKLIST.iter().copied())
    }
}

/// Lower-cased type name without module path or generic arguments.
fn type_table_name<M: ?Sized>() -> String {
    let full = std::any::type_name::<M>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

#[derive(Debug)]
struct TableInner {
    def: TableDef,
    columns: Vec<String>,
}

/// A table bound to its discovered columns.
///
/// Cheap to clone; records and queries keep a handle to the table they came from.
#[derive(Debug, Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    /// Validate `def` and discover the table's columns.
    ///
    /// A table without columns (or that does not exist) is not an error: its
    /// records have an empty column set, so `get`/`set` never match.
    pub async fn open(client: &impl GenericClient, def: TableDef) -> OrmResult<Self> {
        def.validate()?;
        let schema = describe_table(client, def.name()).await?;
        if schema.columns.is_empty() {
            tracing::warn!(table = def.name(), "table has no columns");
        }
        let columns = schema.columns.into_iter().map(|c| c.name).collect();
        Ok(Self::build(def, columns))
    }

    /// Open the table declared by model `M`.
    pub async fn for_model<M: Model + ?Sized>(client: &impl GenericClient) -> OrmResult<Self> {
        Self::open(client, M::table_def()).await
    }

    /// Bind `def` to a known column list without asking the database.
    pub fn with_columns<I, S>(def: TableDef, columns: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        def.validate()?;
        Ok(Self::build(def, columns.into_iter().map(Into::into).collect()))
    }

    fn build(def: TableDef, columns: Vec<String>) -> Self {
        Self {
            inner: Arc::new(TableInner { def, columns }),
        }
    }

    pub fn def(&self) -> &TableDef {
        &self.inner.def
    }

    pub fn name(&self) -> &str {
        self.inner.def.name()
    }

    pub fn id_col(&self) -> &str {
        self.inner.def.id_col()
    }

    pub fn column_names(&self) -> &[String] {
        &self.inner.columns
    }

    /// A new, unsaved record with every column `NULL`.
    pub fn record(&self) -> Record {
        Record::new(self.clone())
    }

    /// Value generated by the most recent insert on this connection.
    ///
    /// Connection-scoped: call it right after [`Record::save`] inserted.
    pub async fn last_id(&self, client: &impl GenericClient) -> OrmResult<Value> {
        let row = statement::last_id().fetch_one(client).await?;
        Value::from_column(&row, 0)
    }

    /// Total number of rows (`COUNT(<id>)`).
    pub async fn count_records(&self, client: &impl GenericClient) -> OrmResult<i64> {
        let stmt = statement::count(self.name(), self.id_col());
        let row = stmt.fetch_one(client).await?;
        row.try_get::<_, i64>("nb")
            .map_err(|e| OrmError::decode("nb", e.to_string()))
    }

    /// The record whose identifier equals `id`.
    ///
    /// `None` unless exactly one row matches. An `id` that cannot be converted
    /// to the identifier column's type (`"abc"` for an integer column) matches
    /// nothing.
    pub async fn find_one(
        &self,
        client: &impl GenericClient,
        id: impl Into<Value>,
    ) -> OrmResult<Option<Record>> {
        let stmt = statement::find_by_id(self.name(), self.id_col(), id.into());
        let rows = match stmt.fetch_rows(client).await {
            Ok(rows) => rows,
            Err(OrmError::Encode(message)) => {
                tracing::debug!(table = self.name(), %message, "find_one identifier not comparable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        match rows.len() {
            1 => Ok(self.materialize(&rows)?.pop()),
            0 => Ok(None),
            n => {
                tracing::warn!(
                    table = self.name(),
                    rows = n,
                    "find_one matched more than one row"
                );
                Ok(None)
            }
        }
    }

    /// Start a query matching every row.
    pub fn find_all(&self) -> FindQuery {
        FindQuery::all(self.clone())
    }

    /// Start a query AND-joining raw SQL predicates.
    ///
    /// The fragments are not escaped. Use placeholders (`field=:field`) and
    /// [`FindQuery::bind_param`] for values.
    pub fn find_where<I, S>(&self, criteria: I) -> FindQuery
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        FindQuery::matching(self.clone(), criteria)
    }

    /// Start a query matching `term` anywhere in any search column.
    ///
    /// Without search columns the query matches every row.
    pub fn search(&self, term: &str) -> FindQuery {
        FindQuery::searching(self.clone(), term)
    }

    pub(crate) fn materialize(&self, rows: &[Row]) -> OrmResult<Vec<Record>> {
        rows.iter()
            .map(|row| {
                let mut record = self.record();
                record.hydrate_row(row)?;
                Ok(record)
            })
            .collect()
    }
}
