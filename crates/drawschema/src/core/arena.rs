//! Entity arena for resolved diagram objects
//!
//! Classes, attributes and the remaining objects live in separate vectors
//! and are addressed by their diagram id through one index. Links between
//! them (a class's attribute list, an attribute's owner) are stored as ids
//! and resolved through the arena, never as direct references.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::types::DiagramNode;

/// Handle to an entity inside an [`EntityArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum EntityRef {
    Class(usize),
    Attribute(usize),
    Other(usize),
}

/// A node tagged as a class (prospective table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassEntity {
    pub node: DiagramNode,
    /// Ids of attached attributes, in attachment order
    pub attributes: Vec<String>,
}

impl ClassEntity {
    pub fn new(node: DiagramNode) -> Self {
        Self {
            node,
            attributes: Vec::new(),
        }
    }
}

/// A node tagged as an attribute (prospective column)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeEntity {
    pub node: DiagramNode,
    /// Id of the owning class, set by hierarchy resolution
    pub owner: Option<String>,
}

impl AttributeEntity {
    pub fn new(node: DiagramNode) -> Self {
        Self { node, owner: None }
    }
}

/// Borrowed view of any arena entity
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Class(&'a ClassEntity),
    Attribute(&'a AttributeEntity),
    Other(&'a DiagramNode),
}

impl<'a> Entity<'a> {
    pub fn node(&self) -> &'a DiagramNode {
        match self {
            Entity::Class(class) => &class.node,
            Entity::Attribute(attribute) => &attribute.node,
            Entity::Other(node) => node,
        }
    }
}

/// Id-addressed store of resolved classes, attributes and other objects
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityArena {
    classes: Vec<ClassEntity>,
    attributes: Vec<AttributeEntity>,
    others: Vec<DiagramNode>,
    #[serde(skip)]
    index: HashMap<String, EntityRef>,
}

impl EntityArena {
    pub fn new(
        classes: Vec<ClassEntity>,
        attributes: Vec<AttributeEntity>,
        others: Vec<DiagramNode>,
    ) -> Self {
        let mut arena = Self {
            classes,
            attributes,
            others,
            index: HashMap::new(),
        };
        arena.rebuild_index();
        arena
    }

    // Classes win over attributes, attributes over other objects.
    fn rebuild_index(&mut self) {
        self.index.clear();
        let classes = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.node.id(), EntityRef::Class(i)));
        let attributes = self
            .attributes
            .iter()
            .enumerate()
            .map(|(i, a)| (a.node.id(), EntityRef::Attribute(i)));
        let others = self
            .others
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id(), EntityRef::Other(i)));
        for (id, entity) in classes.chain(attributes).chain(others) {
            if let Some(id) = id {
                self.index.entry(id.to_string()).or_insert(entity);
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Option<EntityRef> {
        self.index.get(id).copied()
    }

    pub fn entity(&self, entity: EntityRef) -> Entity<'_> {
        match entity {
            EntityRef::Class(i) => Entity::Class(&self.classes[i]),
            EntityRef::Attribute(i) => Entity::Attribute(&self.attributes[i]),
            EntityRef::Other(i) => Entity::Other(&self.others[i]),
        }
    }

    pub fn get(&self, id: &str) -> Option<Entity<'_>> {
        self.lookup(id).map(|entity| self.entity(entity))
    }

    pub fn node(&self, entity: EntityRef) -> &DiagramNode {
        self.entity(entity).node()
    }

    pub fn class(&self, id: &str) -> Option<&ClassEntity> {
        match self.lookup(id)? {
            EntityRef::Class(i) => Some(&self.classes[i]),
            _ => None,
        }
    }

    pub fn attribute(&self, id: &str) -> Option<&AttributeEntity> {
        match self.lookup(id)? {
            EntityRef::Attribute(i) => Some(&self.attributes[i]),
            _ => None,
        }
    }

    pub fn classes(&self) -> &[ClassEntity] {
        &self.classes
    }

    pub fn attributes(&self) -> &[AttributeEntity] {
        &self.attributes
    }

    pub fn others(&self) -> &[DiagramNode] {
        &self.others
    }

    /// Owning class of an attribute, through its stored owner id
    pub fn owner_of(&self, attribute: &AttributeEntity) -> Option<&ClassEntity> {
        attribute.owner.as_deref().and_then(|id| self.class(id))
    }

    /// Attached attributes of a class, in attachment order
    pub fn attributes_of<'a>(
        &'a self,
        class: &'a ClassEntity,
    ) -> impl Iterator<Item = &'a AttributeEntity> + 'a {
        class.attributes.iter().filter_map(|id| self.attribute(id))
    }

    /// Record `class_id` as the owner of the attribute at `index`
    pub fn attach(&mut self, index: usize, class_id: &str) -> bool {
        let Some(EntityRef::Class(class_index)) = self.lookup(class_id) else {
            return false;
        };
        let Some(attribute) = self.attributes.get_mut(index) else {
            return false;
        };
        let Some(attribute_id) = attribute.node.id.clone() else {
            return false;
        };
        attribute.node.parent = Some(class_id.to_string());
        attribute.owner = Some(class_id.to_string());
        self.classes[class_index].attributes.push(attribute_id);
        true
    }

    /// Drop the other objects whose ids are in `ids`
    pub fn remove_others(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.others.len();
        self.others
            .retain(|node| node.id().map_or(true, |id| !ids.contains(id)));
        let removed = before - self.others.len();
        if removed > 0 {
            self.rebuild_index();
        }
        removed
    }
}
