//! Core error types for schema inference
//!
//! Only conditions that stop a run before inference begins live here.
//! Everything the pipeline can recover from is reported as a
//! [`Diagnostic`](crate::core::Diagnostic) instead.

use thiserror::Error;

/// Fatal errors for diagram loading and schema inference
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("XML error: {source}")]
    XmlError {
        #[from]
        source: quick_xml::Error,
    },

    #[error("Document error: {message}")]
    DocumentError { message: String },

    #[error("No graph model found in document (compressed diagrams are not supported)")]
    MissingGraphModel,

    #[error("Config error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },
}

impl SchemaError {
    /// Create a new document error
    pub fn document_error(message: impl Into<String>) -> Self {
        Self::DocumentError {
            message: message.into(),
        }
    }

    /// Create a new config error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}
