//! Attribute re-parenting
//!
//! An attribute is usually drawn inside a stack of layout containers rather
//! than directly inside its class. Resolution walks the original `parent`
//! chain of each attribute until a class is reached; every object passed on
//! the way is a mediator and is removed afterwards.

use std::collections::{HashMap, HashSet};

use tracing::{debug, span, trace, Level};

use crate::core::{
    AttributeEntity, ClassEntity, DiagnosticKind, Diagnostics, DiagramNode, EntityArena,
    EntityRef, InferenceConfig, NodeRole,
};

/// Why a containment walk ended without reaching a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkFailure {
    /// The chain ended at a node with no parent
    Root(String),
    /// The chain pointed at an id that is not a known node
    Unknown(String),
    /// The chain came back to a node it already passed
    Cycle(String),
}

impl WalkFailure {
    fn describe(&self) -> String {
        match self {
            WalkFailure::Root(id) => format!("containment ends at '{}'", id),
            WalkFailure::Unknown(id) => format!("parent '{}' is not a diagram object", id),
            WalkFailure::Cycle(id) => format!("containment loops back to '{}'", id),
        }
    }
}

/// Owning class of one attribute and the mediators between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub class_id: String,
    pub mediators: Vec<String>,
}

/// Builds the entity arena and attaches attributes to their classes
pub struct HierarchyResolver<'a> {
    config: &'a InferenceConfig,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(config: &'a InferenceConfig) -> Self {
        Self { config }
    }

    /// Partition `objects` by role and attach every attribute to its class
    ///
    /// `cells` are only consulted as pass-through containers (plain group
    /// cells); they never become entities.
    pub fn resolve(
        &self,
        objects: Vec<DiagramNode>,
        cells: &[DiagramNode],
        diagnostics: &mut Diagnostics,
    ) -> EntityArena {
        let hierarchy_span = span!(Level::DEBUG, "hierarchy");
        let _enter = hierarchy_span.enter();

        let mut classes = Vec::new();
        let mut attributes = Vec::new();
        let mut others = Vec::new();
        for node in objects {
            match node.role(self.config) {
                NodeRole::Class => classes.push(ClassEntity::new(node)),
                NodeRole::Attribute => attributes.push(AttributeEntity::new(node)),
                NodeRole::Other => others.push(node),
            }
        }
        debug!(
            classes = classes.len(),
            attributes = attributes.len(),
            others = others.len(),
            "Partitioned objects"
        );

        let mut arena = EntityArena::new(classes, attributes, others);
        let cells_by_id: HashMap<&str, &DiagramNode> = cells
            .iter()
            .filter_map(|cell| cell.id().map(|id| (id, cell)))
            .collect();

        let mut placements = Vec::new();
        let mut mediators = HashSet::new();
        for (index, attribute) in arena.attributes().iter().enumerate() {
            let node = &attribute.node;
            if node.id().is_none() {
                diagnostics.report(
                    DiagnosticKind::MissingIdentifier,
                    format!(
                        "Attribute \"{}\" has no id and cannot be placed in a class",
                        node.display_label()
                    ),
                );
                continue;
            }
            match find_owner(&arena, &cells_by_id, node) {
                Ok(ownership) => {
                    trace!(
                        attribute = node.display_label(),
                        class = %ownership.class_id,
                        mediators = ownership.mediators.len(),
                        "Attribute owner found"
                    );
                    mediators.extend(ownership.mediators);
                    placements.push((index, ownership.class_id));
                }
                Err(failure) => diagnostics.report(
                    DiagnosticKind::UnownedAttribute,
                    format!(
                        "Attribute {} \"{}\" has no owning class ({}), it will not be added",
                        node.schema_id().unwrap_or("<no EN>"),
                        node.display_label(),
                        failure.describe()
                    ),
                ),
            }
        }

        let attached = placements
            .into_iter()
            .filter(|(index, class_id)| arena.attach(*index, class_id))
            .count();
        let removed = arena.remove_others(&mediators);
        debug!(attached, mediators = removed, "Attributes attached");

        self.report_unclassified(&arena, diagnostics);
        arena
    }

    fn report_unclassified(&self, arena: &EntityArena, diagnostics: &mut Diagnostics) {
        let leftovers: Vec<String> = arena
            .others()
            .iter()
            .filter(|node| !node.is_edge() && !node.has_arrow())
            .map(|node| format!("- \"{}\"", node.display_label()))
            .collect();
        if !leftovers.is_empty() {
            diagnostics.report_with_details(
                DiagnosticKind::UnclassifiedObjects,
                format!(
                    "{} objects are neither classes nor attributes and were ignored:",
                    leftovers.len()
                ),
                leftovers,
            );
        }
    }
}

/// Walk the original parent chain of `attribute` up to a class
pub fn find_owner<'n>(
    arena: &'n EntityArena,
    cells: &HashMap<&'n str, &'n DiagramNode>,
    attribute: &'n DiagramNode,
) -> Result<Ownership, WalkFailure> {
    let mut visited: HashSet<&str> = attribute.id().into_iter().collect();
    let mut mediators = Vec::new();
    let mut current: &'n DiagramNode = attribute;

    loop {
        let Some(parent_id) = current.parent.as_deref() else {
            return Err(WalkFailure::Root(current.id().unwrap_or("").to_string()));
        };
        if !visited.insert(parent_id) {
            return Err(WalkFailure::Cycle(parent_id.to_string()));
        }
        current = match arena.lookup(parent_id) {
            Some(EntityRef::Class(_)) => {
                return Ok(Ownership {
                    class_id: parent_id.to_string(),
                    mediators,
                })
            }
            Some(entity @ EntityRef::Other(_)) => {
                mediators.push(parent_id.to_string());
                arena.node(entity)
            }
            Some(entity @ EntityRef::Attribute(_)) => arena.node(entity),
            None => match cells.get(parent_id) {
                Some(cell) => *cell,
                None => return Err(WalkFailure::Unknown(parent_id.to_string())),
            },
        };
    }
}
