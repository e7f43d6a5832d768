//! Collection of reusable TUI components.

pub mod file_list;
pub mod folder_tree;
pub mod preview;
pub mod prompt;
