//! Pure domain model: the document tree, its identifiers and payload encoding.

pub mod content;
pub mod errors;
pub mod ids;
pub mod model;
pub mod tree;
