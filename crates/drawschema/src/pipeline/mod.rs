//! Inference pipeline stages
//!
//! Each stage is a pure transformation over the previous stage's output.
//! The orchestrator runs them in order and collects their diagnostics.

pub mod alias;
pub mod diff;
pub mod direction;
pub mod flatten;
pub mod hierarchy;
pub mod orchestrator;
pub mod relation;

pub use alias::*;
pub use diff::*;
pub use direction::*;
pub use flatten::*;
pub use hierarchy::*;
pub use orchestrator::*;
pub use relation::*;
