//! Flattening of the document tree into diagram nodes
//!
//! Each graph element under the model root is visited recursively and every
//! recognized attribute found at any depth is collected into one
//! [`DiagramNode`]. Objects wrap an inner cell, so an object's label and
//! identifier end up next to its cell's parent and style.

use tracing::{debug, span, trace, Level};

use crate::core::{
    DiagramDocument, DiagramNode, FieldReference, InferenceConfig, SchemaError, Style, TreeNode,
    TreeValue, ATTR_PREFIX,
};

/// Generic graph cells (shapes and connectors)
pub const CELL_TAG: &str = "mxCell";
/// Objects carrying custom properties
pub const OBJECT_TAG: &str = "object";
/// User objects carrying custom properties
pub const USER_OBJECT_TAG: &str = "UserObject";

/// Free-form hints carried through unchanged
pub const SCALAR_FIELDS: &[&str] = &["DATA_TYPE", "DATA_LENGTH", "DATA_PRECISION", "NULLABLE"];

/// The three raw node collections of a diagram
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedDiagram {
    pub cells: Vec<DiagramNode>,
    pub objects: Vec<DiagramNode>,
    pub user_objects: Vec<DiagramNode>,
}

impl FlattenedDiagram {
    pub fn node_count(&self) -> usize {
        self.cells.len() + self.objects.len() + self.user_objects.len()
    }
}

/// Turns the document tree into flat node records
pub struct Flattener<'a> {
    config: &'a InferenceConfig,
}

impl<'a> Flattener<'a> {
    pub fn new(config: &'a InferenceConfig) -> Self {
        Self { config }
    }

    pub fn flatten(&self, document: &DiagramDocument) -> Result<FlattenedDiagram, SchemaError> {
        let flatten_span = span!(Level::DEBUG, "flatten");
        let _enter = flatten_span.enter();

        let root = document.graph_root()?;
        let collect = |tag: &str| -> Vec<DiagramNode> {
            root.children(tag)
                .into_iter()
                .map(|tree| self.flatten_node(tree))
                .collect()
        };

        let flattened = FlattenedDiagram {
            cells: collect(CELL_TAG),
            objects: collect(OBJECT_TAG),
            user_objects: collect(USER_OBJECT_TAG),
        };
        debug!(
            cells = flattened.cells.len(),
            objects = flattened.objects.len(),
            user_objects = flattened.user_objects.len(),
            "Flattened diagram"
        );
        Ok(flattened)
    }

    /// Collect the recognized attributes of `tree` and all its descendants
    pub fn flatten_node(&self, tree: &TreeNode) -> DiagramNode {
        let mut node = DiagramNode::default();
        self.visit(tree, &mut node);
        node
    }

    fn visit(&self, tree: &TreeNode, acc: &mut DiagramNode) {
        for (key, value) in tree.entries() {
            match value {
                TreeValue::Scalar(raw) => {
                    if let Some(name) = key.strip_prefix(ATTR_PREFIX) {
                        self.assign(name, raw, acc);
                    }
                }
                TreeValue::Node(child) => self.visit(child, acc),
                TreeValue::Sequence(children) => {
                    for child in children {
                        self.visit(child, acc);
                    }
                }
            }
        }
    }

    fn assign(&self, name: &str, raw: &str, acc: &mut DiagramNode) {
        let value = raw.trim().to_string();
        match name {
            "id" => acc.id = Some(value),
            "parent" => acc.parent = Some(value),
            "tags" => acc.tags = Some(value),
            "style" => acc.style = Some(Style::parse(&value)),
            "value" => acc.value = Some(value),
            "label" => acc.label = Some(value),
            "EN" => acc.en = Some(value),
            "source" => acc.source = Some(value),
            "target" => acc.target = Some(value),
            _ if name == self.config.clone_field => acc.clone_of = Some(value),
            _ if name == self.config.ref_attribute_field => acc.ref_attribute = Some(value),
            _ if SCALAR_FIELDS.contains(&name) => {
                acc.fields.insert(name.to_string(), value);
            }
            _ if is_reference_key(name) => {
                acc.reference = Some(FieldReference {
                    class: name.to_string(),
                    attribute: value,
                });
            }
            _ => trace!(attribute = name, "Dropping unrecognized attribute"),
        }
    }
}

/// All-uppercase keys name a referenced class; their value is the field
fn is_reference_key(name: &str) -> bool {
    name.chars().any(char::is_uppercase) && !name.chars().any(char::is_lowercase)
}
