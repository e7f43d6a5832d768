//! Tree persistence on top of a key-value slot.

use serde::Deserialize;
use thiserror::Error;

use crate::domain::model::Tree;
use crate::domain::tree::MAX_DEPTH;
use crate::infra::storage::{KeyValueStore, StorageError};

/// Slot holding the serialized tree.
pub const STORAGE_KEY: &str = "data-room-mvp-v1";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to serialize tree: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("stored tree is unreadable: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("stored tree nests {depth} levels deep, more than {max} allowed")]
    TooDeep { depth: usize, max: usize },
}

/// JSON nesting of a tree at [`MAX_DEPTH`]: each folder takes an object and a
/// `children` array, plus the root and the files in the deepest folder.
const MAX_JSON_NESTING: usize = 2 * MAX_DEPTH + 3;

/// Loads and saves the whole tree as JSON under [`STORAGE_KEY`].
#[derive(Debug, Clone)]
pub struct TreeRepository<S> {
    store: S,
    root_name: String,
}

impl<S: KeyValueStore> TreeRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            root_name: crate::domain::model::DEFAULT_ROOT_NAME.to_owned(),
        }
    }

    /// Name given to the root when a fresh tree has to be created.
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the stored tree; `Ok(None)` when nothing was saved yet.
    pub fn try_load(&self) -> Result<Option<Tree>, PersistenceError> {
        let Some(raw) = self.store.get(STORAGE_KEY)? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let depth = json_nesting(&raw);
        if depth > MAX_JSON_NESTING {
            return Err(PersistenceError::TooDeep {
                depth,
                max: MAX_JSON_NESTING,
            });
        }
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        deserializer.disable_recursion_limit();
        let tree = Tree::deserialize(&mut deserializer).map_err(PersistenceError::Corrupt)?;
        deserializer.end().map_err(PersistenceError::Corrupt)?;
        Ok(Some(tree))
    }

    /// Read the stored tree, falling back to a fresh one on any failure.
    pub fn load(&self) -> Tree {
        match self.try_load() {
            Ok(Some(tree)) => {
                tracing::debug!(nodes = tree.len(), "loaded stored tree");
                tree
            }
            Ok(None) => {
                tracing::info!("no stored tree, starting fresh");
                self.fresh()
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding stored tree");
                self.fresh()
            }
        }
    }

    /// Serialize `tree` into the slot.
    pub fn save(&mut self, tree: &Tree) -> Result<(), PersistenceError> {
        let data = serde_json::to_string(tree).map_err(PersistenceError::Serialize)?;
        self.store.set(STORAGE_KEY, &data)?;
        tracing::debug!(bytes = data.len(), "saved tree");
        Ok(())
    }

    fn fresh(&self) -> Tree {
        Tree::with_root_name(self.root_name.clone())
    }
}

/// Deepest object/array nesting in `raw`, ignoring brackets inside strings.
fn json_nesting(raw: &str) -> usize {
    let (mut depth, mut deepest) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);
    for byte in raw.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}
