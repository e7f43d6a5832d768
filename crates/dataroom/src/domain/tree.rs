//! Tree store primitives: lookup, insertion, removal, renaming and search.
//!
//! Mutating operations work on the [`Tree`] they are called on and never keep
//! a reference to it, so callers can apply them to a private copy and publish
//! the copy only when the operation succeeded.

use std::collections::HashSet;

use crate::domain::errors::TreeError;
use crate::domain::model::{FileNode, FolderNode, Node, NodeId, NodeRef, ROOT_ID, Tree};

/// Deepest folder nesting below the root. Children of the root sit at depth 1.
///
/// Files may live inside a folder at this depth.
pub const MAX_DEPTH: usize = 128;

/// Result of a successful [`Tree::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found<'a> {
    pub node: NodeRef<'a>,
    /// Direct parent; `None` only for the root.
    pub parent: Option<&'a FolderNode>,
}

impl Tree {
    /// Locate a node and its direct parent.
    pub fn find(&self, id: &str) -> Option<Found<'_>> {
        if self.root.id == id {
            return Some(Found {
                node: NodeRef::Folder(&self.root),
                parent: None,
            });
        }
        find_in(&self.root, id)
    }

    /// Whether any node in the tree carries `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Resolve `id` to a folder.
    pub fn folder(&self, id: &str) -> Option<&FolderNode> {
        self.find(id).and_then(|found| found.node.as_folder())
    }

    /// Resolve `id` to a file.
    pub fn file(&self, id: &str) -> Option<&FileNode> {
        self.find(id).and_then(|found| found.node.as_file())
    }

    /// Append `node` to the children of the folder `target`.
    pub fn add_child(&mut self, target: &str, node: Node) -> Result<(), TreeError> {
        match self.find(target) {
            None => return Err(TreeError::NotFound(target.into())),
            Some(found) if found.node.as_folder().is_none() => {
                return Err(TreeError::NotAFolder(target.into()));
            }
            Some(_) => {}
        }

        if let Some(duplicate) = self.duplicate_of(&node) {
            return Err(TreeError::DuplicateId(duplicate));
        }

        let target_depth = self.depth_of(target).unwrap_or(0);
        if let Some(below) = deepest_folder(NodeRef::from(&node))
            && target_depth + 1 + below > MAX_DEPTH
        {
            return Err(TreeError::TooDeep {
                id: node.id().clone(),
                max: MAX_DEPTH,
            });
        }

        let folder = folder_mut(&mut self.root, target)
            .ok_or_else(|| TreeError::NotFound(target.into()))?;
        folder.children.push(node);
        Ok(())
    }

    /// Detach the node `id` together with its subtree and hand it back.
    pub fn delete(&mut self, id: &str) -> Result<Node, TreeError> {
        if self.root.id == id {
            return Err(TreeError::RootImmutable);
        }
        remove_from(&mut self.root, id).ok_or_else(|| TreeError::NotFound(id.into()))
    }

    /// Replace the name of node `id`. Any string is accepted.
    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<(), TreeError> {
        if self.root.id == id {
            return Err(TreeError::RootImmutable);
        }
        let node = node_mut(&mut self.root, id).ok_or_else(|| TreeError::NotFound(id.into()))?;
        node.set_name(name.into());
        Ok(())
    }

    /// Files whose name contains `term`, ignoring case, in document order.
    ///
    /// A blank term matches nothing.
    pub fn search(&self, term: &str) -> Vec<&FileNode> {
        if term.trim().is_empty() {
            return Vec::new();
        }
        let needle = term.to_lowercase();
        self.files()
            .filter(|file| file.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Every file in document order.
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.walk().filter_map(|node| node.as_file())
    }

    /// Every node except the root, in document order.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.root.children.iter().rev().collect(),
        }
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        1 + self.walk().count()
    }

    /// Always false: a tree holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Ids of `id` and all of its descendants; empty when `id` is unknown.
    pub fn subtree_ids(&self, id: &str) -> Vec<NodeId> {
        let mut ids = Vec::new();
        if let Some(found) = self.find(id) {
            collect_ids(found.node, &mut ids);
        }
        ids.into_iter().cloned().collect()
    }

    /// Check every structural invariant of the tree.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.root.id != ROOT_ID {
            return Err(TreeError::UnexpectedRoot {
                expected: NodeId::root(),
                found: self.root.id.clone(),
            });
        }

        let mut seen: HashSet<&NodeId> = HashSet::new();
        seen.insert(&self.root.id);
        for (node, depth) in self.walk_with_depth() {
            if !seen.insert(node.id()) {
                return Err(TreeError::DuplicateId(node.id().clone()));
            }
            if matches!(node, Node::Folder(_)) && depth > MAX_DEPTH {
                return Err(TreeError::TooDeep {
                    id: node.id().clone(),
                    max: MAX_DEPTH,
                });
            }
            if let Node::File(file) = node {
                check_content(file)?;
            }
        }
        Ok(())
    }

    /// First id in `node`'s subtree that is already taken, either in the
    /// tree or earlier in the subtree itself.
    fn duplicate_of(&self, node: &Node) -> Option<NodeId> {
        let existing = self.ids();
        let mut incoming = Vec::new();
        collect_ids(NodeRef::from(node), &mut incoming);
        let mut seen = HashSet::new();
        incoming
            .into_iter()
            .find(|id| existing.contains(*id) || !seen.insert(*id))
            .cloned()
    }

    /// Nesting depth of node `id`; the root is at 0.
    fn depth_of(&self, id: &str) -> Option<usize> {
        if self.root.id == id {
            return Some(0);
        }
        self.walk_with_depth()
            .find(|(node, _)| node.id() == id)
            .map(|(_, depth)| depth)
    }

    fn walk_with_depth(&self) -> impl Iterator<Item = (&Node, usize)> {
        let mut stack: Vec<(&Node, usize)> =
            self.root.children.iter().rev().map(|child| (child, 1)).collect();
        std::iter::from_fn(move || {
            let (node, depth) = stack.pop()?;
            if let Node::Folder(folder) = node {
                stack.extend(folder.children.iter().rev().map(|child| (child, depth + 1)));
            }
            Some((node, depth))
        })
    }

    fn ids(&self) -> HashSet<&NodeId> {
        let mut ids: HashSet<&NodeId> = self.walk().map(Node::id).collect();
        ids.insert(&self.root.id);
        ids
    }
}

/// Depth-first, pre-order iterator over the nodes below the root.
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Node::Folder(folder) = node {
            self.stack.extend(folder.children.iter().rev());
        }
        Some(node)
    }
}

fn check_content(file: &FileNode) -> Result<(), TreeError> {
    let Some(content) = &file.content else {
        return Ok(());
    };
    let decoded = content.decode().map_err(|err| TreeError::BadContent {
        id: file.id.clone(),
        reason: err.to_string(),
    })?;
    let actual = decoded.len() as u64;
    if actual != file.size {
        return Err(TreeError::SizeMismatch {
            id: file.id.clone(),
            declared: file.size,
            actual,
        });
    }
    Ok(())
}

/// Depth of the deepest folder in `node`'s subtree, relative to `node`;
/// `None` when the subtree holds no folder.
fn deepest_folder(node: NodeRef<'_>) -> Option<usize> {
    let mut stack = vec![(node, 0usize)];
    let mut deepest = None;
    while let Some((node, depth)) = stack.pop() {
        if let NodeRef::Folder(folder) = node {
            deepest = deepest.max(Some(depth));
            stack.extend(
                folder
                    .children
                    .iter()
                    .map(|child| (NodeRef::from(child), depth + 1)),
            );
        }
    }
    deepest
}

fn find_in<'a>(folder: &'a FolderNode, id: &str) -> Option<Found<'a>> {
    for child in &folder.children {
        if child.id() == id {
            return Some(Found {
                node: NodeRef::from(child),
                parent: Some(folder),
            });
        }
        if let Node::Folder(sub) = child
            && let Some(found) = find_in(sub, id)
        {
            return Some(found);
        }
    }
    None
}

fn collect_ids<'a>(node: NodeRef<'a>, out: &mut Vec<&'a NodeId>) {
    out.push(node.id());
    if let NodeRef::Folder(folder) = node {
        for child in &folder.children {
            collect_ids(NodeRef::from(child), out);
        }
    }
}

fn folder_mut<'a>(folder: &'a mut FolderNode, id: &str) -> Option<&'a mut FolderNode> {
    if folder.id == id {
        return Some(folder);
    }
    for child in folder.children.iter_mut() {
        if let Node::Folder(sub) = child
            && let Some(found) = folder_mut(sub, id)
        {
            return Some(found);
        }
    }
    None
}

fn node_mut<'a>(folder: &'a mut FolderNode, id: &str) -> Option<&'a mut Node> {
    for child in folder.children.iter_mut() {
        if child.id() == id {
            return Some(child);
        }
        if let Node::Folder(sub) = child
            && let Some(found) = node_mut(sub, id)
        {
            return Some(found);
        }
    }
    None
}

fn remove_from(folder: &mut FolderNode, id: &str) -> Option<Node> {
    if let Some(index) = folder.children.iter().position(|child| child.id() == id) {
        return Some(folder.children.remove(index));
    }
    for child in folder.children.iter_mut() {
        if let Node::Folder(sub) = child
            && let Some(removed) = remove_from(sub, id)
        {
            return Some(removed);
        }
    }
    None
}
