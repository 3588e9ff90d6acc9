//! Convenient imports for typical `pgrecord` usage.
//!
//! ```ignore
//! use pgrecord::prelude::*;
//! ```

pub use crate::{
    Connection, DbConfig, FindQuery, GenericClient, Model, Order, OrmError, OrmResult, Record,
    Table, TableDef, Value, WriteOp,
};
