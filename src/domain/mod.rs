//! Domain layer types and invariants.

pub mod comments;
pub mod error;
pub mod patch;
pub mod text;
pub mod types;
