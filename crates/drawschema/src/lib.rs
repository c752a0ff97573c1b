//! Drawschema - Infer a relational schema from draw.io ER diagrams
//!
//! Classes drawn in the diagram become tables, their attributes become
//! columns, and connectors with one-to-many arrows become typed references
//! between tables. The result is an additive change plan against an
//! existing schema snapshot.
//!
//! # Quick Start
//!
//! ```rust
//! use drawschema::{infer, SchemaSnapshot};
//!
//! let xml = r#"<mxGraphModel><root>
//!     <mxCell id="0"/><mxCell id="1" parent="0"/>
//!     <object id="c" label="City" EN="CITIES" tags="_класс"><mxCell parent="1"/></object>
//!     <object id="a" label="Id" EN="ID" tags="_атрибут"><mxCell parent="c"/></object>
//! </root></mxGraphModel>"#;
//!
//! let report = infer(xml, &SchemaSnapshot::new()).unwrap();
//! assert_eq!(report.plan.new_tables[0].id, "CITIES");
//! assert_eq!(report.plan.new_tables[0].columns[0].id, "CITY_ID");
//! ```
//!
//! # Advanced Usage
//!
//! For more control, run the stages yourself:
//!
//! ```rust
//! use drawschema::prelude::*;
//!
//! let xml = r#"<mxGraphModel><root>
//!     <object id="c" EN="BOOK" tags="_класс"><mxCell parent="1"/></object>
//!     <object id="g" label="Layout group"><mxCell parent="c"/></object>
//!     <object id="a" EN="TITLE" tags="_атрибут"><mxCell parent="g"/></object>
//! </root></mxGraphModel>"#;
//!
//! let config = InferenceConfig::default();
//! let document = DiagramDocument::parse(xml).unwrap();
//! let flattened = Flattener::new(&config).flatten(&document).unwrap();
//! let aliased = AliasResolver::new().resolve(flattened);
//!
//! let mut diagnostics = Diagnostics::new();
//! let arena = HierarchyResolver::new(&config).resolve(aliased.objects, &aliased.cells, &mut diagnostics);
//! assert_eq!(arena.class("c").unwrap().attributes, vec!["a".to_string()]);
//! assert!(arena.others().is_empty());
//! ```

pub mod core;
pub mod pipeline;

pub use core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Column, DiagnosticKind, Diagnostics, DiagramDocument, DiagramNode, EntityArena,
        InferenceConfig, JsonFileBackend, MemoryBackend, SchemaBackend, SchemaSnapshot, Table,
    };
    pub use crate::pipeline::{
        AliasResolver, DirectionResolver, Flattener, HierarchyResolver, InferenceReport,
        Orchestrator, RelationClassifier, ResolvedRelation, SchemaChangePlan, SchemaDiffPlanner,
        SyncReport,
    };
}

pub use pipeline::{InferenceReport, Orchestrator, ResolvedRelation, SchemaChangePlan};

/// Infer the change plan for a diagram with the default convention
///
/// # Arguments
/// * `xml` - draw.io diagram document
/// * `snapshot` - current tables and columns of the target schema
///
/// # Returns
/// * `Ok(InferenceReport)` - plan, actionable relations and diagnostics
/// * `Err` - if the document cannot be parsed
pub fn infer(xml: &str, snapshot: &SchemaSnapshot) -> anyhow::Result<InferenceReport> {
    Orchestrator::new().infer(xml, snapshot)
}

/// Parse a diagram into its classes, attributes and relation candidates
///
/// # Example
/// ```rust
/// let model = drawschema::parse(r#"<mxGraphModel><root>
///     <object id="c" EN="BOOK" tags="_класс"><mxCell parent="1"/></object>
/// </root></mxGraphModel>"#).unwrap();
/// assert_eq!(model.arena.classes().len(), 1);
/// ```
pub fn parse(xml: &str) -> anyhow::Result<pipeline::InferredModel> {
    Orchestrator::new().build_model(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_simple_class() {
        let xml = r#"<mxGraphModel><root>
            <object id="c" label="Author" EN="AUTHOR" tags="_класс"><mxCell parent="1"/></object>
            <object id="a" label="Name" EN="NAME" tags="_атрибут"><mxCell parent="c"/></object>
        </root></mxGraphModel>"#;
        let report = infer(xml, &SchemaSnapshot::new()).unwrap();
        assert_eq!(report.plan.new_tables.len(), 1);
        assert_eq!(report.plan.new_tables[0].columns[0].label(), "Name");
        assert!(!report.has_errors());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("not xml at all <").is_err());
    }

    #[test]
    fn test_parse_empty_diagram() {
        let model = parse("<mxGraphModel><root/></mxGraphModel>").unwrap();
        assert!(model.arena.classes().is_empty());
        assert!(model.candidates.is_empty());
    }
}
