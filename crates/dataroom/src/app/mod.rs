//! Application layer orchestrating domain logic and infrastructure.

pub mod persistence;
pub mod preview;
pub mod prompt;
pub mod session;
pub mod upload;
