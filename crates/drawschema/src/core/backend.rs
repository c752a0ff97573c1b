//! Schema backend trait
//!
//! The backend is the spreadsheet-style store the inferred schema is synced
//! into. Inference itself never talks to it: the caller fetches a
//! [`SchemaSnapshot`] once, hands it to the pipeline as a plain value, and
//! applies the resulting plan through this trait afterwards.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, trace};

use super::snapshot::{Column, SchemaSnapshot, Table};

/// Core trait for schema backends
///
/// Every operation is additive: tables and columns are created or have
/// their type changed, never removed or renamed.
pub trait SchemaBackend: Send + Sync {
    /// Current tables with their columns
    fn fetch_snapshot(&self) -> Result<SchemaSnapshot>;

    /// Create new tables with their initial columns
    fn add_tables(&mut self, tables: &[Table]) -> Result<()>;

    /// Add columns to an existing table
    fn add_columns(&mut self, table_id: &str, columns: &[Column]) -> Result<()>;

    /// Update fields of existing columns
    fn update_columns(&mut self, table_id: &str, columns: &[Column]) -> Result<()>;
}

/// Backend holding its snapshot in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    snapshot: SchemaSnapshot,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: SchemaSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &SchemaSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> SchemaSnapshot {
        self.snapshot
    }

    fn table_mut(&mut self, table_id: &str) -> Result<&mut Table> {
        self.snapshot
            .tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| anyhow!("Table '{}' does not exist", table_id))
    }
}

impl SchemaBackend for MemoryBackend {
    fn fetch_snapshot(&self) -> Result<SchemaSnapshot> {
        Ok(self.snapshot.clone())
    }

    fn add_tables(&mut self, tables: &[Table]) -> Result<()> {
        for table in tables {
            if self.snapshot.has_table(&table.id) {
                return Err(anyhow!("Table '{}' already exists", table.id));
            }
            trace!(table = %table.id, columns = table.columns.len(), "Adding table");
            self.snapshot.tables.push(table.clone());
        }
        Ok(())
    }

    fn add_columns(&mut self, table_id: &str, columns: &[Column]) -> Result<()> {
        let table = self.table_mut(table_id)?;
        for column in columns {
            if table.has_column(&column.id) {
                return Err(anyhow!(
                    "Column '{}' already exists in table '{}'",
                    column.id,
                    table_id
                ));
            }
            table.columns.push(column.clone());
        }
        Ok(())
    }

    fn update_columns(&mut self, table_id: &str, columns: &[Column]) -> Result<()> {
        let table = self.table_mut(table_id)?;
        for update in columns {
            let column = table
                .columns
                .iter_mut()
                .find(|c| c.id == update.id)
                .ok_or_else(|| anyhow!("Column '{}' not found in table '{}'", update.id, table_id))?;
            if update.fields.label.is_some() {
                column.fields.label = update.fields.label.clone();
            }
            if update.fields.column_type.is_some() {
                column.fields.column_type = update.fields.column_type.clone();
            }
        }
        Ok(())
    }
}

/// Backend persisting its snapshot as a JSON file
///
/// A missing file reads as an empty schema. Each change rewrites the file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<MemoryBackend> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Snapshot file missing, starting empty");
            return Ok(MemoryBackend::new());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot '{}'", self.path.display()))?;
        let snapshot = SchemaSnapshot::from_json(&text)
            .with_context(|| format!("Invalid snapshot '{}'", self.path.display()))?;
        Ok(MemoryBackend::with_snapshot(snapshot))
    }

    fn store(&self, backend: MemoryBackend) -> Result<()> {
        let text = serde_json::to_string_pretty(backend.snapshot())?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("Failed to write snapshot '{}'", self.path.display()))
    }

    fn modify(&self, change: impl FnOnce(&mut MemoryBackend) -> Result<()>) -> Result<()> {
        let mut backend = self.load()?;
        change(&mut backend)?;
        self.store(backend)
    }
}

impl SchemaBackend for JsonFileBackend {
    fn fetch_snapshot(&self) -> Result<SchemaSnapshot> {
        Ok(self.load()?.into_snapshot())
    }

    fn add_tables(&mut self, tables: &[Table]) -> Result<()> {
        self.modify(|backend| backend.add_tables(tables))
    }

    fn add_columns(&mut self, table_id: &str, columns: &[Column]) -> Result<()> {
        self.modify(|backend| backend.add_columns(table_id, columns))
    }

    fn update_columns(&mut self, table_id: &str, columns: &[Column]) -> Result<()> {
        self.modify(|backend| backend.update_columns(table_id, columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::{ref_type, ANY_TYPE};

    fn book_table() -> Table {
        Table::new("BOOK").with_column(Column::new("AUTHOR", None, ANY_TYPE))
    }

    #[test]
    fn test_memory_backend_add_and_update() {
        let mut backend = MemoryBackend::new();
        backend.add_tables(&[book_table()]).unwrap();
        backend
            .add_columns("BOOK", &[Column::new("TITLE", Some("Title".into()), ANY_TYPE)])
            .unwrap();
        backend
            .update_columns("BOOK", &[Column::type_update("AUTHOR", ref_type("AUTHOR"))])
            .unwrap();

        let snapshot = backend.fetch_snapshot().unwrap();
        let author = snapshot.column("BOOK", "AUTHOR").unwrap();
        assert_eq!(author.column_type(), Some("Ref:AUTHOR"));
        assert!(snapshot.column("BOOK", "TITLE").is_some());
    }

    #[test]
    fn test_memory_backend_rejects_duplicates() {
        let mut backend = MemoryBackend::new();
        backend.add_tables(&[book_table()]).unwrap();
        assert!(backend.add_tables(&[book_table()]).is_err());
        assert!(backend
            .add_columns("BOOK", &[Column::new("AUTHOR", None, ANY_TYPE)])
            .is_err());
        assert!(backend.add_columns("MISSING", &[]).is_err());
    }

    #[test]
    fn test_json_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let mut backend = JsonFileBackend::new(&path);

        assert!(backend.fetch_snapshot().unwrap().tables.is_empty());
        backend.add_tables(&[book_table()]).unwrap();
        assert!(path.exists());

        let reopened = JsonFileBackend::new(&path);
        assert!(reopened.fetch_snapshot().unwrap().has_table("BOOK"));
    }
}
