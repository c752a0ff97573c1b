//! Connector classification
//!
//! Only connectors that draw an arrow at one end or both carry foreign-key
//! meaning. Plain lines are layout decoration and are dropped here.

use serde::Serialize;
use tracing::{debug, span, trace, Level};

use crate::core::{DiagramNode, EntityArena, EntityRef, FieldReference, END_ARROW, START_ARROW};

/// One end of a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Raw endpoint id as drawn
    pub id: Option<String>,
    /// Arrow marker at this end, `None` when absent or `none`
    pub arrow: Option<String>,
    /// Entity the id resolves to in the arena
    pub entity: Option<EntityRef>,
}

impl Endpoint {
    fn new(id: Option<&str>, arrow: Option<&str>, arena: &EntityArena) -> Self {
        Self {
            id: id.map(str::to_string),
            arrow: arrow.map(str::to_string),
            entity: id.and_then(|id| arena.lookup(id)),
        }
    }

    pub fn has_arrow(&self, marker: &str) -> bool {
        self.arrow.as_deref() == Some(marker)
    }
}

/// A connector that may become a foreign-key reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationCandidate {
    pub edge_id: Option<String>,
    pub source: Endpoint,
    pub target: Endpoint,
    /// Field named by the connector's reference-attribute field
    pub ref_attribute: Option<String>,
    /// Table and field named by the all-uppercase convention
    pub reference: Option<FieldReference>,
}

impl RelationCandidate {
    pub fn from_edge(edge: &DiagramNode, arena: &EntityArena) -> Self {
        Self {
            edge_id: edge.id.clone(),
            source: Endpoint::new(edge.source.as_deref(), edge.arrow(START_ARROW), arena),
            target: Endpoint::new(edge.target.as_deref(), edge.arrow(END_ARROW), arena),
            ref_attribute: edge.ref_attribute.clone().filter(|r| !r.is_empty()),
            reference: edge.reference.clone(),
        }
    }
}

/// Picks arrow-bearing connectors out of cells and leftover objects
#[derive(Debug, Default)]
pub struct RelationClassifier;

impl RelationClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, cells: &[DiagramNode], arena: &EntityArena) -> Vec<RelationCandidate> {
        let relation_span = span!(Level::DEBUG, "classify_relations");
        let _enter = relation_span.enter();

        let candidates: Vec<RelationCandidate> = cells
            .iter()
            .chain(arena.others())
            .filter(|node| node.has_arrow())
            .map(|edge| {
                let candidate = RelationCandidate::from_edge(edge, arena);
                trace!(
                    edge = ?candidate.edge_id,
                    source = ?candidate.source.id,
                    target = ?candidate.target.id,
                    "Relation candidate"
                );
                candidate
            })
            .collect();
        debug!(candidates = candidates.len(), "Classified connectors");
        candidates
    }
}
