//! # pgrecord
//!
//! A small active-record mapper for PostgreSQL.
//!
//! ## Features
//!
//! - **No declared fields**: a table's columns are discovered from the server
//!   catalog when the [`Table`] is opened
//! - **Records**: a [`Record`] holds one value per column; `save` inserts or
//!   updates depending on whether the identifier is set, `remove` deletes
//! - **Per-table configuration**: identifier column, search columns and
//!   insert/update blacklists via [`TableDef`] or the [`Model`] trait
//! - **Find queries**: `find_all` / `find_where` / `search` start a
//!   [`FindQuery`] that is refined with `group_by` / `order_by` / `limit`
//!   and consumed by `fetch`
//! - **Named placeholders**: SQL is written with `:name` placeholders and
//!   compiled to `$n` before execution
//! - **SQL logging**: every statement is emitted as a `tracing` event on the
//!   `pgrecord.sql` target
//!
//! ## Example
//!
//! ```ignore
//! use pgrecord::prelude::*;
//!
//! struct Demo;
//!
//! impl Model for Demo {
//!     const SEARCH_COLUMNS: &'static [&'static str] = &["field1", "field2"];
//!     const UPDATE_BLACKLIST: &'static [&'static str] = &["field_name"];
//! }
//!
//! let conn = Connection::connect(&DbConfig::from_env()?).await?;
//! let demo = Table::for_model::<Demo>(&conn).await?;
//!
//! let mut record = demo.record();
//! record.set("field_name", "field_value");
//! record.save(&conn).await?;
//!
//! let found = demo
//!     .find_where(["field_name=:field_name"])
//!     .bind_param(":field_name", "field_value")
//!     .order_by("id", Order::Desc)
//!     .limit(1, 10)
//!     .fetch(&conn)
//!     .await?;
//! ```

pub mod client;
pub mod columns;
pub mod config;
pub mod connection;
pub mod error;
pub mod ident;
pub mod query;
pub mod record;
pub mod schema;
pub mod statement;
pub mod table;
pub mod value;

pub mod prelude;

pub use client::GenericClient;
pub use columns::ColumnSet;
pub use config::{ConfigFile, DbConfig};
pub use connection::Connection;
pub use error::{OrmError, OrmResult};
pub use ident::Ident;
pub use query::FindQuery;
pub use record::Record;
pub use schema::{ColumnInfo, TableSchema, describe_table};
pub use statement::{Dialect, Order, Params, Statement};
pub use table::{Blacklist, Model, Table, TableDef, WriteOp};
pub use value::Value;

// Re-export tokio_postgres for convenience
pub use tokio_postgres;
