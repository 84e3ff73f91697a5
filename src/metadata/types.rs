//! Metadata types shared by the providers and the catalog.

use serde::{Deserialize, Serialize};

/// A base table visible in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Schema the table belongs to.
    pub schema: String,
    /// Table name.
    pub name: String,
}

/// Column information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared type name, as the store reports it.
    pub data_type: String,
    /// Whether NULL values are allowed.
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// Columns of one requested table.
///
/// Built fresh per request and never cached. Column order is whatever the
/// store returns; an absent table has no columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Requested table name.
    pub name: String,
    /// Columns in store order.
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    /// Whether the table was not found (or has no columns).
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Render the column list as `col (type), col (type), ...`.
    pub fn describe(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.data_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
