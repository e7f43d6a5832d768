//! Infrastructure adapters for storage, configuration, and logging.

pub mod config;
pub mod logging;
pub mod storage;
