//! Parsed diagram document tree
//!
//! The XML export is read into a small heterogeneous tree: every element
//! becomes a [`TreeNode`] whose entries are either prefixed attribute
//! scalars, a single child element, or a sequence of same-named child
//! elements. The flattener walks this tree without caring how it was built.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, span, trace, Level};

use super::error::SchemaError;

/// Prefix distinguishing attribute entries from child elements
pub const ATTR_PREFIX: &str = "@_";

/// Element holding the graph of a diagram page
pub const GRAPH_MODEL_TAG: &str = "mxGraphModel";

/// Value of a [`TreeNode`] entry
#[derive(Debug, Clone, PartialEq)]
pub enum TreeValue {
    /// An attribute value
    Scalar(String),
    /// A single child element
    Node(TreeNode),
    /// Repeated child elements sharing one tag
    Sequence(Vec<TreeNode>),
}

/// One element of the parsed document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeNode {
    entries: Vec<(String, TreeValue)>,
}

impl TreeNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute entry under its prefixed key
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push_attr(name, value);
        self
    }

    /// Add a child element entry
    pub fn with_child(mut self, tag: &str, child: TreeNode) -> Self {
        self.push_child(tag, child);
        self
    }

    pub fn push_attr(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .push((format!("{}{}", ATTR_PREFIX, name), TreeValue::Scalar(value.into())));
    }

    /// Add a child; a second child with the same tag turns the entry into a sequence
    pub fn push_child(&mut self, tag: &str, child: TreeNode) {
        if let Some((_, value)) = self.entries.iter_mut().find(|(key, _)| key == tag) {
            let previous = std::mem::replace(value, TreeValue::Sequence(Vec::new()));
            *value = match previous {
                TreeValue::Sequence(mut items) => {
                    items.push(child);
                    TreeValue::Sequence(items)
                }
                TreeValue::Node(first) => TreeValue::Sequence(vec![first, child]),
                TreeValue::Scalar(_) => TreeValue::Node(child),
            };
            return;
        }
        self.entries.push((tag.to_string(), TreeValue::Node(child)));
    }

    pub fn entries(&self) -> &[(String, TreeValue)] {
        &self.entries
    }

    /// Unprefixed attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|(key, value)| match value {
            TreeValue::Scalar(s) if key.strip_prefix(ATTR_PREFIX) == Some(name) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Direct children under `tag`, whether stored as one node or a sequence
    pub fn children(&self, tag: &str) -> Vec<&TreeNode> {
        match self.entries.iter().find(|(key, _)| key == tag) {
            Some((_, TreeValue::Node(node))) => vec![node],
            Some((_, TreeValue::Sequence(items))) => items.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// First element named `tag` at any depth, in document order
    pub fn find(&self, tag: &str) -> Option<&TreeNode> {
        for (key, value) in &self.entries {
            match value {
                TreeValue::Node(node) => {
                    if key == tag {
                        return Some(node);
                    }
                    if let Some(found) = node.find(tag) {
                        return Some(found);
                    }
                }
                TreeValue::Sequence(items) => {
                    for node in items {
                        if key == tag {
                            return Some(node);
                        }
                        if let Some(found) = node.find(tag) {
                            return Some(found);
                        }
                    }
                }
                TreeValue::Scalar(_) => {}
            }
        }
        None
    }
}

/// A parsed diagram document
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramDocument {
    root: TreeNode,
}

impl DiagramDocument {
    /// Parse XML text into a document tree
    pub fn parse(xml: &str) -> Result<Self, SchemaError> {
        let parse_span = span!(Level::DEBUG, "parse_document", input_len = xml.len());
        let _enter = parse_span.enter();

        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        // The bottom entry is a synthetic holder for the top-level elements.
        let mut stack: Vec<(String, TreeNode)> = vec![(String::new(), TreeNode::new())];
        let mut element_count = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let (tag, node) = element_from(&start)?;
                    stack.push((tag, node));
                }
                Event::Empty(start) => {
                    let (tag, node) = element_from(&start)?;
                    element_count += 1;
                    if let Some((_, parent)) = stack.last_mut() {
                        parent.push_child(&tag, node);
                    }
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(SchemaError::document_error("unexpected closing tag"));
                    }
                    if let Some((tag, node)) = stack.pop() {
                        element_count += 1;
                        if let Some((_, parent)) = stack.last_mut() {
                            parent.push_child(&tag, node);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            let open = stack.last().map(|(tag, _)| tag.clone()).unwrap_or_default();
            return Err(SchemaError::document_error(format!(
                "document ended inside <{}>",
                open
            )));
        }

        debug!(element_count, "Parsed document tree");
        let (_, root) = stack.remove(0);
        Ok(Self { root })
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// The `root` element of the first graph model in the document
    pub fn graph_root(&self) -> Result<&TreeNode, SchemaError> {
        let model = self
            .root
            .find(GRAPH_MODEL_TAG)
            .ok_or(SchemaError::MissingGraphModel)?;
        trace!("Found graph model");
        model
            .children("root")
            .into_iter()
            .next()
            .ok_or(SchemaError::MissingGraphModel)
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<(String, TreeNode), SchemaError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut node = TreeNode::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        // Unknown entities are kept verbatim rather than failing the document.
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        node.push_attr(&key, value);
    }
    Ok((tag, node))
}
