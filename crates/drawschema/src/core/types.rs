//! Core type definitions for diagram nodes
//!
//! A [`DiagramNode`] is one flattened graph element: a cell, an object or a
//! user object, reduced to the fields the schema inference cares about.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::config::InferenceConfig;

const STYLE_PARAM_DELIMITER: char = ';';
const STYLE_VALUE_DELIMITER: char = '=';

/// Style key for the arrow drawn at the source end of a connector
pub const START_ARROW: &str = "startArrow";
/// Style key for the arrow drawn at the target end of a connector
pub const END_ARROW: &str = "endArrow";

/// One `param=value` pair of a style string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleParam {
    pub param: String,
    pub value: Option<String>,
}

/// Parsed style string, order preserved
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Style(Vec<StyleParam>);

impl Style {
    /// Parse a `key=value;key2=value2;flag;` style string
    pub fn parse(style: &str) -> Self {
        let params = style
            .split(STYLE_PARAM_DELIMITER)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once(STYLE_VALUE_DELIMITER) {
                Some((param, value)) => StyleParam {
                    param: param.trim().to_string(),
                    value: Some(value.trim().to_string()),
                },
                None => StyleParam {
                    param: segment.to_string(),
                    value: None,
                },
            })
            .collect();
        Self(params)
    }

    pub fn params(&self) -> &[StyleParam] {
        &self.0
    }

    /// Value of the last occurrence of `param`
    pub fn get(&self, param: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|p| p.param == param)
            .and_then(|p| p.value.as_deref())
    }

    /// Arrow marker for `param`, with `none` and empty values treated as absent
    pub fn arrow(&self, param: &str) -> Option<&str> {
        self.get(param)
            .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("none"))
    }

    /// True when the style draws an arrow at either end
    pub fn has_arrow(&self) -> bool {
        self.arrow(START_ARROW).is_some() || self.arrow(END_ARROW).is_some()
    }
}

/// Target of the all-uppercase reference convention on edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReference {
    /// Schema identifier of the referenced class
    pub class: String,
    /// Schema identifier of the referenced attribute
    pub attribute: String,
}

/// Role of a node, derived from its `tags` marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeRole {
    Class,
    Attribute,
    Other,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Class => write!(f, "class"),
            NodeRole::Attribute => write!(f, "attribute"),
            NodeRole::Other => write!(f, "other"),
        }
    }
}

/// One normalized graph node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiagramNode {
    pub id: Option<String>,
    pub parent: Option<String>,
    pub tags: Option<String>,
    pub style: Option<Style>,
    pub value: Option<String>,
    pub label: Option<String>,
    /// Schema-facing identifier
    pub en: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    /// Id of the node this one is a clone of
    pub clone_of: Option<String>,
    /// Edge field naming the attribute a connector links
    pub ref_attribute: Option<String>,
    pub reference: Option<FieldReference>,
    /// Free-form hints such as `DATA_TYPE` or `NULLABLE`
    pub fields: BTreeMap<String, String>,
    /// Containers the node's clones were placed in
    pub used_in: Vec<String>,
}

impl DiagramNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_en(mut self, en: impl Into<String>) -> Self {
        self.en = Some(en.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = Some(Style::parse(style));
        self
    }

    pub fn with_endpoints(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self.target = Some(target.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Schema identifier, `None` when absent or blank
    pub fn schema_id(&self) -> Option<&str> {
        self.en.as_deref().filter(|en| !en.is_empty())
    }

    /// Human-readable name for diagnostics: label, then value, then id
    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.value.as_deref().filter(|s| !s.is_empty()))
            .or(self.id.as_deref())
            .unwrap_or("")
    }

    pub fn role(&self, config: &InferenceConfig) -> NodeRole {
        match self.tags.as_deref() {
            Some(tag) if tag == config.class_tag => NodeRole::Class,
            Some(tag) if tag == config.attribute_tag => NodeRole::Attribute,
            _ => NodeRole::Other,
        }
    }

    /// True when the node connects two other nodes
    pub fn is_edge(&self) -> bool {
        self.source.is_some() || self.target.is_some()
    }

    pub fn has_arrow(&self) -> bool {
        self.style.as_ref().is_some_and(Style::has_arrow)
    }

    pub fn arrow(&self, param: &str) -> Option<&str> {
        self.style.as_ref().and_then(|s| s.arrow(param))
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse_order_and_flags() {
        let style = Style::parse("ellipse;whiteSpace=wrap; html=1 ;;endArrow=ERoneToMany;");
        let names: Vec<_> = style.params().iter().map(|p| p.param.as_str()).collect();
        assert_eq!(names, vec!["ellipse", "whiteSpace", "html", "endArrow"]);
        assert_eq!(style.params()[0].value, None);
        assert_eq!(style.get("html"), Some("1"));
        assert_eq!(style.get("endArrow"), Some("ERoneToMany"));
    }

    #[test]
    fn test_none_arrow_is_absent() {
        let style = Style::parse("startArrow=none;endArrow=");
        assert!(!style.has_arrow());
        assert!(Style::parse("endArrow=block").has_arrow());
        assert!(!Style::parse("rounded=0").has_arrow());
    }

    #[test]
    fn test_role_from_tags() {
        let config = InferenceConfig::default();
        assert_eq!(DiagramNode::new("a").with_tags("_класс").role(&config), NodeRole::Class);
        assert_eq!(
            DiagramNode::new("b").with_tags("_атрибут").role(&config),
            NodeRole::Attribute
        );
        assert_eq!(DiagramNode::new("c").role(&config), NodeRole::Other);
    }

    #[test]
    fn test_display_label_fallbacks() {
        let node = DiagramNode::new("n1");
        assert_eq!(node.display_label(), "n1");
        let mut node = node.with_label("");
        node.value = Some("Value".to_string());
        assert_eq!(node.display_label(), "Value");
        assert_eq!(node.with_label("Label").display_label(), "Label");
    }

    #[test]
    fn test_node_role_display() {
        assert_eq!(format!("{}", NodeRole::Class), "class");
        assert_eq!(format!("{}", NodeRole::Attribute), "attribute");
    }
}
