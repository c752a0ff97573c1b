//! Core types shared by every pipeline stage
//!
//! Diagram nodes and the parsed document tree, the entity arena, schema
//! wire types and the backend trait, plus configuration, diagnostics,
//! errors and logging.

mod arena;
mod backend;
mod config;
mod diagnostics;
mod document;
mod error;
pub mod inflect;
pub mod logging;
mod snapshot;
mod types;

pub use arena::*;
pub use backend::*;
pub use config::*;
pub use diagnostics::*;
pub use document::*;
pub use error::*;
pub use inflect::singularize;
pub use logging::*;
pub use snapshot::*;
pub use types::*;
