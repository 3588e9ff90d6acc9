//! Table column introspection.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};

const DESCRIBE_SQL: &str = r#"
SELECT
  a.attname AS column_name,
  pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
  a.attnotnull AS not_null,
  pg_get_expr(ad.adbin, ad.adrelid) AS default_expr,
  a.attnum AS ordinal
FROM pg_catalog.pg_attribute a
LEFT JOIN pg_catalog.pg_attrdef ad ON ad.adrelid = a.attrelid AND ad.adnum = a.attnum
WHERE a.attrelid = to_regclass($1::text)
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum
"#;

/// One column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default_expr: Option<String>,
    pub ordinal: i16,
}

/// Columns of one table, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Describe `table` (optionally schema-qualified, resolved through `search_path`).
///
/// This is the Postgres counterpart of `SHOW COLUMNS FROM <table>`. A table that
/// does not exist yields an empty column list rather than an error.
pub async fn describe_table(client: &impl GenericClient, table: &str) -> OrmResult<TableSchema> {
    let rows = client.query(DESCRIBE_SQL, &[&table]).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let get_err = |column: &str, e: tokio_postgres::Error| OrmError::decode(column, e.to_string());
        columns.push(ColumnInfo {
            name: row
                .try_get("column_name")
                .map_err(|e| get_err("column_name", e))?,
            data_type: row
                .try_get("data_type")
                .map_err(|e| get_err("data_type", e))?,
            not_null: row.try_get("not_null").map_err(|e| get_err("not_null", e))?,
            default_expr: row
                .try_get("default_expr")
                .map_err(|e| get_err("default_expr", e))?,
            ordinal: row.try_get("ordinal").map_err(|e| get_err("ordinal", e))?,
        });
    }

    tracing::debug!(
        target: "pgrecord.schema",
        table,
        columns = columns.len(),
        "described table"
    );

    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}
