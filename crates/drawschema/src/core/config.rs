//! Diagram convention settings
//!
//! The marker strings below are the ones used by the ER-diagramming
//! convention this crate reads. They can be overridden from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::SchemaError;

/// Convention constants consulted by every pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    /// `tags` value marking a node as a class (table)
    pub class_tag: String,
    /// `tags` value marking a node as an attribute (column)
    pub attribute_tag: String,
    /// Field holding the id of the node a clone duplicates
    pub clone_field: String,
    /// Arrow style marking the "many" end of a connector
    pub one_to_many_arrow: String,
    /// Generic primary-key identifier, renamed to `<TABLE>_ID`
    pub primary_key_name: String,
    /// `DATA_TYPE` value that maps to an integer column
    pub numeric_type_hint: String,
    /// Edge field naming the attribute a connector links
    pub ref_attribute_field: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            class_tag: "_класс".to_string(),
            attribute_tag: "_атрибут".to_string(),
            clone_field: "_копия".to_string(),
            one_to_many_arrow: "ERoneToMany".to_string(),
            primary_key_name: "ID".to_string(),
            numeric_type_hint: "NUMBER".to_string(),
            ref_attribute_field: "refAttribute".to_string(),
        }
    }
}

impl InferenceConfig {
    /// Parse a config from JSON text; missing keys keep their defaults
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject settings that would make markers indistinguishable
    pub fn validate(&self) -> Result<(), SchemaError> {
        let required = [
            ("class_tag", &self.class_tag),
            ("attribute_tag", &self.attribute_tag),
            ("clone_field", &self.clone_field),
            ("one_to_many_arrow", &self.one_to_many_arrow),
            ("primary_key_name", &self.primary_key_name),
            ("ref_attribute_field", &self.ref_attribute_field),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SchemaError::config_error(format!("{} must not be empty", name)));
            }
        }
        if self.class_tag == self.attribute_tag {
            return Err(SchemaError::config_error(
                "class_tag and attribute_tag must differ",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers() {
        let config = InferenceConfig::default();
        assert_eq!(config.class_tag, "_класс");
        assert_eq!(config.attribute_tag, "_атрибут");
        assert_eq!(config.clone_field, "_копия");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = InferenceConfig::from_json(r#"{"primary_key_name": "PK"}"#).unwrap();
        assert_eq!(config.primary_key_name, "PK");
        assert_eq!(config.one_to_many_arrow, "ERoneToMany");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(InferenceConfig::from_json(r#"{"class": "x"}"#).is_err());
    }

    #[test]
    fn test_identical_tags_rejected() {
        let result = InferenceConfig::from_json(r#"{"class_tag": "t", "attribute_tag": "t"}"#);
        assert!(matches!(result, Err(SchemaError::ConfigError { .. })));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"numeric_type_hint": "INTEGER"}"#).unwrap();
        let config = InferenceConfig::from_file(&path).unwrap();
        assert_eq!(config.numeric_type_hint, "INTEGER");
    }
}
