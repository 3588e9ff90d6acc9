//! Per-record column state.

use crate::error::OrmResult;
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio_postgres::Row;

/// An ordered mapping from column name to current value.
///
/// The key set is fixed when the set is created (from schema introspection);
/// values can be read and overwritten but columns are never added or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSet {
    entries: Vec<(String, Value)>,
}

impl ColumnSet {
    /// Create a set with every column initialized to `NULL`.
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names.into_iter().map(|n| (n.into(), Value::Null)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Current value of `name`, or `None` if there is no such column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|i| &self.entries[i].1)
    }

    /// Overwrite `name` and return the stored value.
    ///
    /// Unknown columns are left alone and yield `None`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Option<&Value> {
        let i = self.position(name)?;
        self.entries[i].1 = value.into();
        Some(&self.entries[i].1)
    }

    /// Overwrite every known column present in `data`; unknown keys are ignored.
    pub fn hydrate<I, K, V>(&mut self, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in data {
            if let Some(i) = self.position(name.as_ref()) {
                self.entries[i].1 = value.into();
            }
        }
    }

    /// Overwrite known columns from a result row.
    pub fn hydrate_row(&mut self, row: &Row) -> OrmResult<()> {
        for (idx, column) in row.columns().iter().enumerate() {
            if let Some(i) = self.position(column.name()) {
                self.entries[i].1 = Value::from_column(row, idx)?;
            }
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Columns whose name is not in `excluded`, in column order.
    pub fn without<'a>(
        &'a self,
        excluded: &'a [&'a str],
    ) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.iter().filter(move |(n, _)| !excluded.contains(n))
    }

    /// Column values as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(n, v)| (n.clone(), serde_json::to_value(v).unwrap_or_default()))
                .collect(),
        )
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

impl Serialize for ColumnSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
