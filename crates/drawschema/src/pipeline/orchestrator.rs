//! Pipeline orchestrator
//!
//! Runs the stages in their fixed order:
//! Document → Flattener → AliasResolver → HierarchyResolver →
//! RelationClassifier → SchemaDiffPlanner / DirectionResolver
//!
//! Relations are only resolved once the hierarchy is complete, since
//! direction and field resolution read the final attribute owners.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, span, Level};

use super::alias::AliasResolver;
use super::diff::{InferredTable, SchemaChangePlan, SchemaDiffPlanner};
use super::direction::{DirectionResolver, ResolvedRelation};
use super::flatten::Flattener;
use super::hierarchy::HierarchyResolver;
use super::relation::{RelationCandidate, RelationClassifier};
use crate::core::{
    DiagramDocument, Diagnostics, EntityArena, InferenceConfig, MemoryBackend, SchemaBackend,
    SchemaSnapshot,
};

const CLASSES_SECTION: &str = "Classes and attributes";
const RELATIONS_SECTION: &str = "Relations";

/// Classes, attributes and relation candidates of one diagram
#[derive(Debug, Clone, Serialize)]
pub struct InferredModel {
    pub arena: EntityArena,
    pub candidates: Vec<RelationCandidate>,
    pub diagnostics: Diagnostics,
}

/// Result of inferring a diagram against a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferenceReport {
    pub plan: SchemaChangePlan,
    pub relations: Vec<ResolvedRelation>,
    pub diagnostics: Diagnostics,
}

impl InferenceReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.error_count() > 0
    }
}

/// Result of a sync run against a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// False for a dry run
    pub applied: bool,
    pub plan: SchemaChangePlan,
    pub relations: Vec<ResolvedRelation>,
    pub diagnostics: Diagnostics,
}

/// Runs the full inference pipeline with one configuration
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    config: InferenceConfig,
}

impl Orchestrator {
    /// Create an orchestrator with the default diagram convention
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Parse a diagram and resolve its classes, attributes and connectors
    ///
    /// Fails only when the document cannot be parsed.
    pub fn build_model(&self, xml: &str) -> Result<InferredModel> {
        let build_span = span!(Level::INFO, "build_model", input_len = xml.len());
        let _enter = build_span.enter();

        let document = DiagramDocument::parse(xml)?;
        let flattened = Flattener::new(&self.config).flatten(&document)?;
        debug!(nodes = flattened.node_count(), "Document flattened");

        let aliased = AliasResolver::new().resolve(flattened);

        let mut diagnostics = Diagnostics::new();
        diagnostics.section(CLASSES_SECTION);
        let arena = HierarchyResolver::new(&self.config).resolve(
            aliased.objects,
            &aliased.cells,
            &mut diagnostics,
        );
        let candidates = RelationClassifier::new().classify(&aliased.cells, &arena);

        info!(
            classes = arena.classes().len(),
            attributes = arena.attributes().len(),
            candidates = candidates.len(),
            "Diagram model built"
        );
        Ok(InferredModel {
            arena,
            candidates,
            diagnostics,
        })
    }

    /// Tables the model's classes turn into
    pub fn tables(&self, model: &InferredModel, diagnostics: &mut Diagnostics) -> Vec<InferredTable> {
        SchemaDiffPlanner::new(&self.config).infer_tables(&model.arena, diagnostics)
    }

    pub fn plan(
        &self,
        model: &InferredModel,
        snapshot: &SchemaSnapshot,
        diagnostics: &mut Diagnostics,
    ) -> SchemaChangePlan {
        SchemaDiffPlanner::new(&self.config).plan(&model.arena, snapshot, diagnostics)
    }

    pub fn resolve_relations(
        &self,
        model: &InferredModel,
        snapshot: &SchemaSnapshot,
        diagnostics: &mut Diagnostics,
    ) -> Vec<ResolvedRelation> {
        diagnostics.section(RELATIONS_SECTION);
        DirectionResolver::new(&self.config).resolve(
            &model.candidates,
            &model.arena,
            snapshot,
            diagnostics,
        )
    }

    /// Infer the change plan and relations for `xml` against `snapshot`
    ///
    /// Pure: relations are checked against `snapshot` as given, so a
    /// relation between tables the plan is about to create is reported as
    /// missing fields until the plan has been applied.
    pub fn infer(&self, xml: &str, snapshot: &SchemaSnapshot) -> Result<InferenceReport> {
        let infer_span = span!(Level::INFO, "infer");
        let _enter = infer_span.enter();

        let model = self.build_model(xml)?;
        let mut diagnostics = model.diagnostics.clone();
        let plan = self.plan(&model, snapshot, &mut diagnostics);
        let relations = self.resolve_relations(&model, snapshot, &mut diagnostics);

        info!(
            new_tables = plan.new_tables.len(),
            relations = relations.len(),
            errors = diagnostics.error_count(),
            "Inference complete"
        );
        Ok(InferenceReport {
            plan,
            relations,
            diagnostics,
        })
    }

    /// Plan against the backend, apply, then resolve relations against the
    /// refreshed schema and apply those too
    ///
    /// Without `apply` nothing is written: the plan is projected onto an
    /// in-memory copy of the snapshot and relations are resolved against
    /// that copy.
    pub fn sync(
        &self,
        xml: &str,
        backend: &mut dyn SchemaBackend,
        apply: bool,
    ) -> Result<SyncReport> {
        let sync_span = span!(Level::INFO, "sync", apply);
        let _enter = sync_span.enter();

        let model = self.build_model(xml)?;
        let mut diagnostics = model.diagnostics.clone();
        let snapshot = backend.fetch_snapshot()?;
        let plan = self.plan(&model, &snapshot, &mut diagnostics);

        let refreshed = if apply {
            plan.apply_to(backend)?;
            backend.fetch_snapshot()?
        } else {
            let mut projected = MemoryBackend::with_snapshot(snapshot);
            plan.apply_to(&mut projected)?;
            projected.into_snapshot()
        };

        let relations = self.resolve_relations(&model, &refreshed, &mut diagnostics);
        if apply {
            for relation in &relations {
                backend.update_columns(&relation.from_table, &[relation.update()])?;
            }
        }

        info!(
            applied = apply,
            new_tables = plan.new_tables.len(),
            relations = relations.len(),
            errors = diagnostics.error_count(),
            "Sync complete"
        );
        Ok(SyncReport {
            applied: apply,
            plan,
            relations,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DiagnosticKind, Table};

    const LIBRARY: &str = r#"<mxfile><diagram name="Page-1"><mxGraphModel><root>
        <mxCell id="0"/>
        <mxCell id="1" parent="0"/>
        <object id="author" label="Author" EN="AUTHOR" tags="_класс"><mxCell parent="1" vertex="1"/></object>
        <object id="author_id" label="Id" EN="ID" tags="_атрибут" DATA_TYPE="NUMBER"><mxCell parent="author" vertex="1"/></object>
        <object id="author_name" label="Name" EN="NAME" tags="_атрибут"><mxCell parent="author" vertex="1"/></object>
        <object id="book" label="Book" EN="BOOK" tags="_класс"><mxCell parent="1" vertex="1"/></object>
        <object id="book_id" label="Id" EN="ID" tags="_атрибут" DATA_TYPE="NUMBER"><mxCell parent="book" vertex="1"/></object>
        <object id="book_author" label="Author" EN="AUTHOR" tags="_атрибут"><mxCell parent="book" vertex="1"/></object>
        <mxCell id="e1" edge="1" parent="1" source="book_author" target="author_id" style="startArrow=ERoneToMany;endArrow=none;"/>
    </root></mxGraphModel></diagram></mxfile>"#;

    #[test]
    fn test_build_model() {
        let model = Orchestrator::new().build_model(LIBRARY).unwrap();
        assert_eq!(model.arena.classes().len(), 2);
        assert_eq!(model.arena.class("book").unwrap().attributes.len(), 2);
        assert_eq!(model.candidates.len(), 1);
        assert_eq!(model.diagnostics.error_count(), 0);
    }

    #[test]
    fn test_infer_against_empty_snapshot() {
        let report = Orchestrator::new()
            .infer(LIBRARY, &SchemaSnapshot::new())
            .unwrap();
        let tables: Vec<_> = report.plan.new_tables.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(tables, vec!["AUTHOR", "BOOK"]);
        assert!(report.relations.is_empty());
        assert_eq!(
            report.diagnostics.count_of(DiagnosticKind::TargetFieldMissing),
            1
        );
        assert!(report.has_errors());
    }

    #[test]
    fn test_dry_run_sync_projects_plan() {
        let mut backend = MemoryBackend::new();
        let report = Orchestrator::new().sync(LIBRARY, &mut backend, false).unwrap();
        assert!(!report.applied);
        assert_eq!(report.relations.len(), 1);
        assert!(backend.snapshot().tables.is_empty());
    }

    #[test]
    fn test_applied_sync_writes_backend() {
        let mut backend = MemoryBackend::new();
        let report = Orchestrator::new().sync(LIBRARY, &mut backend, true).unwrap();
        assert!(report.applied);
        let column = backend.snapshot().column("BOOK", "AUTHOR").unwrap();
        assert_eq!(column.column_type(), Some("Ref:AUTHOR"));

        let again = Orchestrator::new().sync(LIBRARY, &mut backend, true).unwrap();
        assert!(again.plan.is_empty());
        assert!(again.relations.is_empty());
        assert_eq!(
            again.diagnostics.count_of(DiagnosticKind::RelationAlreadyApplied),
            1
        );
    }

    #[test]
    fn test_sections_in_order() {
        let report = Orchestrator::new()
            .infer(
                LIBRARY,
                &SchemaSnapshot::new().with_table(Table::new("AUTHOR")),
            )
            .unwrap();
        let lines = report.diagnostics.lines();
        assert_eq!(lines[0], "======== Classes and attributes ========");
        assert!(lines.contains(&"======== Relations ========".to_string()));
    }

    #[test]
    fn test_malformed_xml_is_fatal() {
        assert!(Orchestrator::new().infer("<mxGraphModel><root>", &SchemaSnapshot::new()).is_err());
        assert!(Orchestrator::new().build_model("<html></html>").is_err());
    }
}
