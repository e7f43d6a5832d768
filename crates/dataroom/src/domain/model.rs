//! Domain models for the document tree.

use std::borrow::Borrow;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::content::EncodedContent;

/// Identifier of the distinguished root folder.
pub const ROOT_ID: &str = "root";

/// Display name given to the root of a fresh tree.
pub const DEFAULT_ROOT_NAME: &str = "Main";

/// Identifier of a node, unique within one tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// An uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: NodeId,
    pub name: String,
    pub mime: String,
    pub size: u64,
    /// Encoded payload; absent until the upload completed.
    #[serde(rename = "dataUrl", default, skip_serializing_if = "Option::is_none")]
    pub content: Option<EncodedContent>,
}

/// A folder holding an ordered list of children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl FolderNode {
    /// An empty folder.
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Child folders in display order.
    pub fn folders(&self) -> impl Iterator<Item = &FolderNode> {
        self.children.iter().filter_map(Node::as_folder)
    }

    /// Child files in display order.
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.children.iter().filter_map(Node::as_file)
    }
}

/// Either a file or a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    File(FileNode),
    Folder(FolderNode),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::File(file) => &file.id,
            Node::Folder(folder) => &folder.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::File(file) => &file.name,
            Node::Folder(folder) => &folder.name,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(file) => Some(file),
            Node::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderNode> {
        match self {
            Node::File(_) => None,
            Node::Folder(folder) => Some(folder),
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            Node::File(file) => file.name = name,
            Node::Folder(folder) => folder.name = name,
        }
    }
}

impl From<FileNode> for Node {
    fn from(value: FileNode) -> Self {
        Node::File(value)
    }
}

impl From<FolderNode> for Node {
    fn from(value: FolderNode) -> Self {
        Node::Folder(value)
    }
}

/// Borrowed view of a node, which may be the root folder itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    File(&'a FileNode),
    Folder(&'a FolderNode),
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> &'a NodeId {
        match *self {
            NodeRef::File(file) => &file.id,
            NodeRef::Folder(folder) => &folder.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            NodeRef::File(file) => &file.name,
            NodeRef::Folder(folder) => &folder.name,
        }
    }

    pub fn as_file(&self) -> Option<&'a FileNode> {
        match *self {
            NodeRef::File(file) => Some(file),
            NodeRef::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&'a FolderNode> {
        match *self {
            NodeRef::File(_) => None,
            NodeRef::Folder(folder) => Some(folder),
        }
    }
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(value: &'a Node) -> Self {
        match value {
            Node::File(file) => NodeRef::File(file),
            Node::Folder(folder) => NodeRef::Folder(folder),
        }
    }
}

/// A rooted folder/file tree.
///
/// Serializes as the root folder object so stored data keeps the
/// `{"id":"root","type":"folder",...}` shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub(crate) root: FolderNode,
}

impl Tree {
    /// A fresh tree: an empty root folder with the default name.
    pub fn new() -> Self {
        Self::with_root_name(DEFAULT_ROOT_NAME)
    }

    pub fn with_root_name(name: impl Into<String>) -> Self {
        Self {
            root: FolderNode::new(ROOT_ID, name),
        }
    }

    /// Adopt an existing root folder after checking every tree invariant.
    pub fn from_root(root: FolderNode) -> Result<Self, crate::domain::errors::TreeError> {
        let tree = Self { root };
        tree.validate()?;
        Ok(tree)
    }

    pub fn root(&self) -> &FolderNode {
        &self.root
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root.id
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RootDocument<'a> {
    Folder(&'a FolderNode),
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RootDocument::Folder(&self.root).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Node::deserialize(deserializer)? {
            Node::Folder(root) => Tree::from_root(root).map_err(de::Error::custom),
            Node::File(file) => Err(de::Error::custom(format!(
                "tree root must be a folder, found file `{}`",
                file.id
            ))),
        }
    }
}
