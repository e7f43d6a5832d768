//! Domain-specific errors.

use thiserror::Error;

use crate::domain::model::NodeId;

/// Failures reported by the tree store primitives.
///
/// Every variant means the tree was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("no node with id `{0}`")]
    NotFound(NodeId),
    #[error("node `{0}` is not a folder")]
    NotAFolder(NodeId),
    #[error("the root folder cannot be renamed or deleted")]
    RootImmutable,
    #[error("a node with id `{0}` already exists")]
    DuplicateId(NodeId),
    #[error("node `{id}` would nest folders deeper than {max} levels")]
    TooDeep { id: NodeId, max: usize },
    #[error("tree root must be the folder `{expected}`, found `{found}`")]
    UnexpectedRoot { expected: NodeId, found: NodeId },
    #[error("file `{id}` content decodes to {actual} bytes but declares {declared}")]
    SizeMismatch {
        id: NodeId,
        declared: u64,
        actual: u64,
    },
    #[error("file `{id}` has undecodable content: {reason}")]
    BadContent { id: NodeId, reason: String },
}
