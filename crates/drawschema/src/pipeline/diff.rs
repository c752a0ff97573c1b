//! Schema diff planning
//!
//! Classes become tables and their attributes become columns. The inferred
//! tables are compared with the snapshot to produce a purely additive
//! [`SchemaChangePlan`]: new tables, new columns on existing tables, and an
//! informational list of snapshot columns the diagram no longer mentions.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, span, Level};

use super::direction::primary_key_column;
use crate::core::{
    singularize, AttributeEntity, ClassEntity, Column, DiagnosticKind, Diagnostics, DiagramNode,
    EntityArena, InferenceConfig, SchemaBackend, SchemaSnapshot, Table, ANY_TYPE, INT_TYPE,
};

/// A table derived from one class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferredTable {
    pub id: String,
    pub label: String,
    pub columns: Vec<Column>,
    /// Id of the column derived from the generic primary key, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

impl InferredTable {
    pub fn to_table(&self) -> Table {
        Table {
            id: self.id.clone(),
            columns: self.columns.clone(),
        }
    }

    pub fn column_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.id.as_str())
    }
}

/// Additive changes that bring the backend in line with the diagram
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaChangePlan {
    pub new_tables: Vec<Table>,
    /// Columns missing from existing tables, by table id
    pub columns_to_add: BTreeMap<String, Vec<Column>>,
    /// Columns present both in the diagram and the snapshot, by table id
    pub columns_already_linked: BTreeMap<String, Vec<String>>,
    /// Snapshot columns the diagram does not mention; never applied
    pub columns_to_delete: BTreeMap<String, Vec<String>>,
}

impl SchemaChangePlan {
    /// True when applying the plan would not change the backend
    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty() && self.columns_to_add.values().all(Vec::is_empty)
    }

    /// Create the new tables, then add the missing columns
    pub fn apply_to(&self, backend: &mut dyn SchemaBackend) -> Result<()> {
        if !self.new_tables.is_empty() {
            info!(tables = self.new_tables.len(), "Creating tables");
            backend.add_tables(&self.new_tables)?;
        }
        for (table_id, columns) in &self.columns_to_add {
            if !columns.is_empty() {
                info!(table = %table_id, columns = columns.len(), "Adding columns");
                backend.add_columns(table_id, columns)?;
            }
        }
        Ok(())
    }
}

/// Turns classes into tables and diffs them against a snapshot
pub struct SchemaDiffPlanner<'a> {
    config: &'a InferenceConfig,
}

impl<'a> SchemaDiffPlanner<'a> {
    pub fn new(config: &'a InferenceConfig) -> Self {
        Self { config }
    }

    /// Tables for every class with a usable identifier and columns
    pub fn infer_tables(
        &self,
        arena: &EntityArena,
        diagnostics: &mut Diagnostics,
    ) -> Vec<InferredTable> {
        let mut tables: Vec<InferredTable> = Vec::new();
        let mut labels_by_id: HashMap<String, Vec<String>> = HashMap::new();

        for class in arena.classes() {
            let label = class.node.display_label().to_string();
            let Some(table_id) = class.node.schema_id() else {
                diagnostics.report(
                    DiagnosticKind::MissingIdentifier,
                    format!(
                        "Class \"{}\" has no identifier (EN is empty), the table will not be added",
                        label
                    ),
                );
                continue;
            };
            let Some(table) = self.infer_table(arena, class, table_id, diagnostics) else {
                continue;
            };
            labels_by_id
                .entry(table.id.clone())
                .or_default()
                .push(table.label.clone());
            tables.push(table);
        }

        let mut reported = HashSet::new();
        for table in &tables {
            let labels = &labels_by_id[&table.id];
            if labels.len() > 1 && reported.insert(table.id.clone()) {
                diagnostics.report_with_details(
                    DiagnosticKind::DuplicateIdentifier,
                    format!(
                        "More than one class has identifier {}, none of these tables will be added:",
                        table.id
                    ),
                    quoted(labels),
                );
            }
        }
        tables.retain(|table| labels_by_id[&table.id].len() == 1);
        debug!(tables = tables.len(), "Inferred tables");
        tables
    }

    fn infer_table(
        &self,
        arena: &EntityArena,
        class: &ClassEntity,
        table_id: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<InferredTable> {
        let label = class.node.display_label();

        // Grouped by final column id, in attachment order.
        let mut groups: Vec<(String, Vec<&AttributeEntity>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for attribute in arena.attributes_of(class) {
            let Some(en) = attribute.node.schema_id() else {
                diagnostics.report(
                    DiagnosticKind::MissingIdentifier,
                    format!(
                        "In class \"{}\" attribute \"{}\" has no identifier (EN is empty), the field will not be added",
                        label,
                        attribute.node.display_label()
                    ),
                );
                continue;
            };
            let column_id = primary_key_column(self.config, table_id, en);
            match positions.get(&column_id) {
                Some(&position) => groups[position].1.push(attribute),
                None => {
                    positions.insert(column_id.clone(), groups.len());
                    groups.push((column_id, vec![attribute]));
                }
            }
        }

        let mut columns = Vec::new();
        let mut primary_key = None;
        for (column_id, attributes) in groups {
            if attributes.len() > 1 {
                let labels: Vec<String> = attributes
                    .iter()
                    .map(|a| a.node.display_label().to_string())
                    .collect();
                diagnostics.report_with_details(
                    DiagnosticKind::DuplicateIdentifier,
                    format!(
                        "Class \"{}\" has more than one attribute with identifier {}, none of these fields will be added:",
                        label, column_id
                    ),
                    quoted(&labels),
                );
                continue;
            }
            let node = &attributes[0].node;
            if node.schema_id() == Some(self.config.primary_key_name.as_str()) {
                primary_key = Some(column_id.clone());
            }
            columns.push(Column::new(
                column_id,
                column_label(node),
                self.column_type(node),
            ));
        }

        if columns.is_empty() {
            diagnostics.report(
                DiagnosticKind::EmptyTable,
                format!(
                    "Table {} \"{}\" will not be added, the class has no attributes",
                    table_id, label
                ),
            );
            return None;
        }
        Some(InferredTable {
            id: table_id.to_string(),
            label: label.to_string(),
            columns,
            primary_key,
        })
    }

    fn column_type(&self, node: &DiagramNode) -> &'static str {
        if node.field("DATA_TYPE") == Some(self.config.numeric_type_hint.as_str()) {
            INT_TYPE
        } else {
            ANY_TYPE
        }
    }

    /// Diff inferred tables against `snapshot`
    pub fn diff(
        &self,
        tables: &[InferredTable],
        snapshot: &SchemaSnapshot,
        diagnostics: &mut Diagnostics,
    ) -> SchemaChangePlan {
        let mut plan = SchemaChangePlan::default();

        for table in tables {
            let Some(existing) = snapshot.table(&table.id) else {
                diagnostics.report_with_details(
                    DiagnosticKind::PlannedChange,
                    format!("Adding new table {} \"{}\" with fields:", table.id, table.label),
                    table.columns.iter().map(change_line).collect(),
                );
                plan.new_tables.push(table.to_table());
                continue;
            };

            let mut to_add = Vec::new();
            let mut linked = Vec::new();
            for column in &table.columns {
                if table.primary_key.as_deref() == Some(column.id.as_str())
                    || column.id == self.config.primary_key_name
                {
                    continue;
                }
                if existing.has_column(&column.id) {
                    linked.push(column.id.clone());
                } else {
                    to_add.push(column.clone());
                }
            }

            let inferred: HashSet<&str> = table.column_ids().collect();
            let own_keys = [
                format!("{}_ID", table.id),
                format!("{}_ID", singularize(&table.id)),
                self.config.primary_key_name.clone(),
            ];
            let unmapped: Vec<String> = existing
                .columns
                .iter()
                .map(|c| c.id.clone())
                .filter(|id| !inferred.contains(id.as_str()) && !own_keys.contains(id))
                .collect();

            if !to_add.is_empty() {
                diagnostics.report_with_details(
                    DiagnosticKind::PlannedChange,
                    format!("Adding fields to existing table {}:", table.id),
                    to_add.iter().map(change_line).collect(),
                );
                plan.columns_to_add.insert(table.id.clone(), to_add);
            }
            if !unmapped.is_empty() {
                diagnostics.report_with_details(
                    DiagnosticKind::UnmappedColumns,
                    format!("Table {} has fields that are not in the diagram:", table.id),
                    unmapped.iter().map(|id| format!("- {}", id)).collect(),
                );
                plan.columns_to_delete.insert(table.id.clone(), unmapped);
            }
            if !linked.is_empty() {
                plan.columns_already_linked.insert(table.id.clone(), linked);
            }
        }

        debug!(
            new_tables = plan.new_tables.len(),
            extended_tables = plan.columns_to_add.len(),
            "Planned schema changes"
        );
        plan
    }

    /// Infer tables from the arena and diff them against `snapshot`
    pub fn plan(
        &self,
        arena: &EntityArena,
        snapshot: &SchemaSnapshot,
        diagnostics: &mut Diagnostics,
    ) -> SchemaChangePlan {
        let plan_span = span!(Level::DEBUG, "plan_schema");
        let _enter = plan_span.enter();

        let tables = self.infer_tables(arena, diagnostics);
        self.diff(&tables, snapshot, diagnostics)
    }
}

/// Display label for a column: the label, falling back to the value
pub fn column_label(node: &DiagramNode) -> Option<String> {
    node.label
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(node.value.as_deref().filter(|s| !s.is_empty()))
        .map(str::to_string)
}

/// `+  <type>  <column>  "<label>"`
pub fn change_line(column: &Column) -> String {
    format!(
        "+  {}  {}  \"{}\"",
        column.column_type().unwrap_or(ANY_TYPE),
        column.id,
        column.label()
    )
}

fn quoted(labels: &[String]) -> Vec<String> {
    labels.iter().map(|label| format!("- \"{}\"", label)).collect()
}
