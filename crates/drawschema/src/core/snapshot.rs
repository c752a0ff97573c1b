//! Tables and columns as exchanged with the schema backend
//!
//! The same shapes serve both directions: a [`SchemaSnapshot`] read from the
//! backend, and the [`Table`]/[`Column`] records the change plan sends back.

use serde::{Deserialize, Serialize};

/// Column type for numeric attributes
pub const INT_TYPE: &str = "Int";
/// Column type for everything else
pub const ANY_TYPE: &str = "Any";

/// Reference column type pointing at `table`
pub fn ref_type(table: &str) -> String {
    format!("Ref:{}", table)
}

/// Mutable properties of a column
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
}

/// A column record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    #[serde(default)]
    pub fields: ColumnFields,
}

impl Column {
    /// Column to be created with a label and type
    pub fn new(id: impl Into<String>, label: Option<String>, column_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: ColumnFields {
                label,
                column_type: Some(column_type.into()),
            },
        }
    }

    /// Single-field type update, used for reference columns
    pub fn type_update(id: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: ColumnFields {
                label: None,
                column_type: Some(column_type.into()),
            },
        }
    }

    pub fn column_type(&self) -> Option<&str> {
        self.fields.column_type.as_deref()
    }

    pub fn label(&self) -> &str {
        self.fields.label.as_deref().unwrap_or("")
    }
}

/// A table record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn has_column(&self, id: &str) -> bool {
        self.column(id).is_some()
    }
}

/// Read-only view of the backend's current tables and columns
///
/// Reads either a bare array of tables or `{"tables": [...]}`; always
/// written in the second form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "SnapshotRepr")]
pub struct SchemaSnapshot {
    pub tables: Vec<Table>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotRepr {
    Tables(Vec<Table>),
    Wrapped {
        #[serde(default)]
        tables: Vec<Table>,
    },
}

impl From<SnapshotRepr> for SchemaSnapshot {
    fn from(repr: SnapshotRepr) -> Self {
        match repr {
            SnapshotRepr::Tables(tables) | SnapshotRepr::Wrapped { tables } => Self { tables },
        }
    }
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn has_table(&self, id: &str) -> bool {
        self.table(id).is_some()
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&Column> {
        self.table(table).and_then(|t| t.column(column))
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
