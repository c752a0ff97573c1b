//! Clone collapse
//!
//! Diagrams place one class in several spots by cloning it. A clone carries
//! the id of its original in the clone marker field. Clones are removed, and
//! every `parent`/`source`/`target` pointing at one is rewritten to the
//! original, which records the clone's container in `used_in`.

use std::collections::HashMap;

use tracing::{debug, span, trace, Level};

use super::flatten::FlattenedDiagram;
use crate::core::DiagramNode;

/// Mapping from clone ids to the ids they duplicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, clone_id: impl Into<String>, original_id: impl Into<String>) {
        self.aliases.insert(clone_id.into(), original_id.into());
    }

    pub fn is_clone(&self, id: &str) -> bool {
        self.aliases.contains_key(id)
    }

    /// Final original behind `id`, following clone-of-clone chains
    ///
    /// Ids that are not clones resolve to themselves. A cyclic chain stops
    /// at the last id before the cycle closes.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        let mut current = id;
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(current) {
                Some(next) if next.as_str() != id => current = next.as_str(),
                _ => return current,
            }
        }
        current
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn rewrite(&self, reference: &mut Option<String>) {
        if let Some(id) = reference.as_deref() {
            if self.is_clone(id) {
                let original = self.resolve(id).to_string();
                trace!(clone = id, original = %original, "Rewriting clone reference");
                *reference = Some(original);
            }
        }
    }
}

/// Node collections with every clone collapsed onto its original
#[derive(Debug, Clone, Default)]
pub struct AliasedGraph {
    pub cells: Vec<DiagramNode>,
    /// Objects and user objects, clones removed
    pub objects: Vec<DiagramNode>,
    pub aliases: AliasTable,
}

/// Collapses clone nodes onto their originals
#[derive(Debug, Default)]
pub struct AliasResolver;

impl AliasResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, diagram: FlattenedDiagram) -> AliasedGraph {
        let alias_span = span!(Level::DEBUG, "alias");
        let _enter = alias_span.enter();

        let FlattenedDiagram {
            mut cells,
            objects,
            user_objects,
        } = diagram;

        let (clones, mut objects): (Vec<_>, Vec<_>) = objects
            .into_iter()
            .chain(user_objects)
            .partition(|node| node.clone_of.as_deref().is_some_and(|c| !c.is_empty()));

        let mut aliases = AliasTable::new();
        for clone in &clones {
            if let (Some(id), Some(original)) = (clone.id(), clone.clone_of.as_deref()) {
                aliases.insert(id, original);
            }
        }

        let mut usage: HashMap<String, Vec<String>> = HashMap::new();
        for clone in &clones {
            let (Some(original), Some(parent)) = (clone.clone_of.as_deref(), clone.parent.as_deref())
            else {
                continue;
            };
            let context = aliases.resolve(parent).to_string();
            let contexts = usage.entry(aliases.resolve(original).to_string()).or_default();
            if !contexts.contains(&context) {
                contexts.push(context);
            }
        }

        for node in cells.iter_mut().chain(objects.iter_mut()) {
            aliases.rewrite(&mut node.parent);
            aliases.rewrite(&mut node.source);
            aliases.rewrite(&mut node.target);
        }

        for node in objects.iter_mut() {
            if let Some(contexts) = node.id().and_then(|id| usage.get(id)) {
                node.used_in.extend(contexts.iter().cloned());
            }
        }

        debug!(
            clones = clones.len(),
            objects = objects.len(),
            "Collapsed clones onto originals"
        );
        AliasedGraph {
            cells,
            objects,
            aliases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clone_of(id: &str, original: &str, parent: &str) -> DiagramNode {
        let mut node = DiagramNode::new(id).with_parent(parent);
        node.clone_of = Some(original.to_string());
        node
    }

    #[test]
    fn test_resolve_follows_chains() {
        let mut aliases = AliasTable::new();
        aliases.insert("k2", "k1");
        aliases.insert("k1", "c1");
        assert_eq!(aliases.resolve("k2"), "c1");
        assert_eq!(aliases.resolve("c1"), "c1");
        assert_eq!(aliases.resolve("other"), "other");
    }

    #[test]
    fn test_resolve_stops_on_cycle() {
        let mut aliases = AliasTable::new();
        aliases.insert("a", "b");
        aliases.insert("b", "a");
        assert_eq!(aliases.resolve("a"), "b");
    }

    #[test]
    fn test_references_rewritten_and_usage_recorded() {
        let diagram = FlattenedDiagram {
            cells: vec![DiagramNode::new("e1").with_endpoints("k1", "c2")],
            objects: vec![
                DiagramNode::new("c1").with_tags("_класс"),
                clone_of("k1", "c1", "feature"),
                DiagramNode::new("a1").with_parent("k1"),
            ],
            user_objects: vec![DiagramNode::new("c2")],
        };
        let graph = AliasResolver::new().resolve(diagram);

        assert_eq!(graph.aliases.len(), 1);
        assert_eq!(graph.objects.len(), 3);
        assert!(graph.objects.iter().all(|n| n.id() != Some("k1")));
        assert_eq!(graph.cells[0].source.as_deref(), Some("c1"));
        assert_eq!(graph.cells[0].target.as_deref(), Some("c2"));

        let attribute = graph.objects.iter().find(|n| n.id() == Some("a1")).unwrap();
        assert_eq!(attribute.parent.as_deref(), Some("c1"));
        let original = graph.objects.iter().find(|n| n.id() == Some("c1")).unwrap();
        assert_eq!(original.used_in, vec!["feature".to_string()]);
    }

    #[test]
    fn test_no_clones_is_identity() {
        let diagram = FlattenedDiagram {
            cells: vec![],
            objects: vec![DiagramNode::new("c1").with_parent("1")],
            user_objects: vec![],
        };
        let graph = AliasResolver::new().resolve(diagram);
        assert!(graph.aliases.is_empty());
        assert_eq!(graph.objects[0].parent.as_deref(), Some("1"));
        assert!(graph.objects[0].used_in.is_empty());
    }
}
