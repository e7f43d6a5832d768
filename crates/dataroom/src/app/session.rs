//! Session controller: applies user intents to the tree and keeps the
//! surrounding UI state (expansion, selection, preview, search) consistent.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::app::persistence::{PersistenceError, TreeRepository};
use crate::app::preview::{PreviewError, PreviewHandle, PreviewProvider, PreviewState};
use crate::app::prompt::{DELETE_CONFIRMATION, Prompter};
use crate::app::upload::{PendingUpload, UploadRequest};
use crate::domain::content::{ContentError, DecodedContent};
use crate::domain::errors::TreeError;
use crate::domain::ids::IdGenerator;
use crate::domain::model::{FileNode, FolderNode, Node, NodeId, Tree};
use crate::infra::storage::KeyValueStore;

/// Answer offered when prompting for a new folder name.
pub const DEFAULT_NEW_FOLDER_NAME: &str = "New folder";

/// Errors returned by session operations. None of them leave a partial
/// mutation behind.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Only PDF files are supported.")]
    UnsupportedMediaType(String),
    #[error("name must not be empty")]
    EmptyName,
    #[error("node `{0}` is not a file")]
    NotAFile(NodeId),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("cannot decode file content: {0}")]
    Content(#[from] ContentError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
}

impl SessionError {
    /// Whether the error is a rejected user input rather than a failed lookup.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SessionError::UnsupportedMediaType(_) | SessionError::EmptyName
        )
    }
}

/// One user's view of the document room.
pub struct Session<S, P> {
    tree: Arc<Tree>,
    repository: TreeRepository<S>,
    previews: P,
    ids: IdGenerator,
    expanded: BTreeSet<NodeId>,
    selected_folder: NodeId,
    selected_file: Option<NodeId>,
    preview: PreviewState,
    search_term: String,
    new_folder_name: String,
    last_persist_error: Option<PersistenceError>,
}

impl<S: KeyValueStore, P: PreviewProvider> Session<S, P> {
    /// Start a session from whatever the repository holds.
    pub fn open(repository: TreeRepository<S>, previews: P) -> Self {
        let tree = repository.load();
        let root = tree.root_id().clone();
        Self {
            tree: Arc::new(tree),
            repository,
            previews,
            ids: IdGenerator::new(),
            expanded: BTreeSet::from([root.clone()]),
            selected_folder: root,
            selected_file: None,
            preview: PreviewState::Empty,
            search_term: String::new(),
            new_folder_name: DEFAULT_NEW_FOLDER_NAME.to_owned(),
            last_persist_error: None,
        }
    }

    /// Default answer offered when prompting for a new folder name.
    pub fn with_new_folder_name(mut self, name: impl Into<String>) -> Self {
        self.new_folder_name = name.into();
        self
    }

    pub fn new_folder_name(&self) -> &str {
        &self.new_folder_name
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The current snapshot. Later mutations never modify it.
    pub fn snapshot(&self) -> Arc<Tree> {
        Arc::clone(&self.tree)
    }

    pub fn repository(&self) -> &TreeRepository<S> {
        &self.repository
    }

    pub fn previews(&self) -> &P {
        &self.previews
    }

    pub fn ids_issued(&self) -> u64 {
        self.ids.issued()
    }

    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    pub fn preview_handle(&self) -> Option<&PreviewHandle> {
        self.preview.handle()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn last_persist_error(&self) -> Option<&PersistenceError> {
        self.last_persist_error.as_ref()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn selected_folder_id(&self) -> &NodeId {
        &self.selected_folder
    }

    /// The selected folder, or the root when the selection went stale.
    pub fn selected_folder(&self) -> &FolderNode {
        self.tree
            .folder(self.selected_folder.as_str())
            .unwrap_or_else(|| self.tree.root())
    }

    pub fn selected_file_id(&self) -> Option<&NodeId> {
        self.selected_file.as_ref()
    }

    /// The selected file, if it still exists.
    pub fn selected_file(&self) -> Option<&FileNode> {
        self.selected_file
            .as_ref()
            .and_then(|id| self.tree.file(id.as_str()))
    }

    pub fn search_results(&self) -> Vec<&FileNode> {
        self.tree.search(&self.search_term)
    }

    /// Check and encode an upload and attach it to `target`.
    pub fn upload(&mut self, request: UploadRequest, target: &str) -> Result<NodeId, SessionError> {
        let pending = PendingUpload::prepare(request).map_err(|rejected| {
            tracing::info!(name = %rejected.name, mime = %rejected.mime, "rejected upload");
            SessionError::UnsupportedMediaType(rejected.mime)
        })?;
        self.complete_upload(pending, target)
    }

    /// Attach a prepared upload. Works on the tree as it is now, not as it
    /// was when the upload was prepared.
    pub fn complete_upload(
        &mut self,
        pending: PendingUpload,
        target: &str,
    ) -> Result<NodeId, SessionError> {
        if self.tree.folder(target).is_none() {
            return Err(self.resolution_error(target));
        }

        let PendingUpload {
            name,
            mime,
            bytes,
            content,
        } = pending;
        let id = self.ids.generate("file");
        let file = FileNode {
            id: id.clone(),
            name,
            mime: mime.clone(),
            size: bytes.len() as u64,
            content: Some(content),
        };
        self.commit(|tree| tree.add_child(target, Node::File(file)))?;
        tracing::debug!(file = %id, folder = target, "uploaded file");

        self.selected_file = Some(id.clone());
        let decoded = DecodedContent { mime, bytes };
        if let Err(err) = self.show_preview(&id, &decoded) {
            tracing::warn!(error = %err, file = %id, "preview unavailable after upload");
        }
        Ok(id)
    }

    /// Create a folder named `name` inside `parent`.
    pub fn create_folder(&mut self, parent: &str, name: &str) -> Result<NodeId, SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        if self.tree.folder(parent).is_none() {
            return Err(self.resolution_error(parent));
        }

        let id = self.ids.generate("folder");
        let folder = FolderNode::new(id.clone(), name);
        self.commit(|tree| tree.add_child(parent, Node::Folder(folder)))?;
        self.expanded.insert(NodeId::from(parent));
        tracing::debug!(folder = %id, parent, "created folder");
        Ok(id)
    }

    /// Ask for a folder name, then create it. `Ok(None)` when cancelled.
    pub fn request_create_folder(
        &mut self,
        parent: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<Option<NodeId>, SessionError> {
        let initial = self.new_folder_name.clone();
        match prompter.input("Folder name", &initial) {
            Some(name) if !name.is_empty() => self.create_folder(parent, &name).map(Some),
            _ => Ok(None),
        }
    }

    /// Delete `id` and everything below it. The caller has already confirmed.
    pub fn delete(&mut self, id: &str) -> Result<(), SessionError> {
        let removed: HashSet<NodeId> = self.tree.subtree_ids(id).into_iter().collect();
        self.commit(|tree| tree.delete(id).map(|_| ()))?;
        tracing::debug!(node = id, removed = removed.len(), "deleted subtree");

        if self
            .preview
            .file_id()
            .is_some_and(|file| removed.contains(file))
        {
            self.clear_preview();
        }
        if self
            .selected_file
            .as_ref()
            .is_some_and(|file| removed.contains(file))
        {
            self.selected_file = None;
        }
        if removed.contains(&self.selected_folder) {
            self.selected_folder = self.tree.root_id().clone();
        }
        self.expanded.retain(|folder| !removed.contains(folder));
        Ok(())
    }

    /// Confirm, then delete. `Ok(false)` when the user declined.
    pub fn request_delete(
        &mut self,
        id: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<bool, SessionError> {
        if !prompter.confirm(DELETE_CONFIRMATION) {
            return Ok(false);
        }
        self.delete(id)?;
        Ok(true)
    }

    /// Rename `id`. Blank names are rejected.
    pub fn rename(&mut self, id: &str, name: &str) -> Result<(), SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        self.commit(|tree| tree.rename(id, name))?;
        tracing::debug!(node = id, "renamed");
        Ok(())
    }

    /// Ask for a new name (defaulting to the current one), then rename.
    pub fn request_rename(
        &mut self,
        id: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<bool, SessionError> {
        let current = match self.tree.find(id) {
            Some(found) => found.node.name().to_owned(),
            None => return Err(TreeError::NotFound(id.into()).into()),
        };
        match prompter.input("New name", &current) {
            Some(name) if !name.is_empty() => {
                self.rename(id, &name)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Select a file and preview its stored content.
    pub fn select_file(&mut self, id: &str) -> Result<(), SessionError> {
        let file = match self.tree.find(id) {
            None => return Err(TreeError::NotFound(id.into()).into()),
            Some(found) => found
                .node
                .as_file()
                .cloned()
                .ok_or_else(|| SessionError::NotAFile(id.into()))?,
        };

        self.selected_file = Some(file.id.clone());
        let Some(content) = &file.content else {
            self.release_preview();
            return Ok(());
        };

        let decoded = match content.decode() {
            Ok(decoded) => decoded,
            Err(err) => {
                self.release_preview();
                return Err(err.into());
            }
        };
        self.show_preview(&file.id, &decoded)
    }

    /// Drop the preview and the file selection.
    pub fn clear_preview(&mut self) {
        self.release_preview();
        self.selected_file = None;
    }

    /// Flip the expansion of a folder; returns whether it is now expanded.
    pub fn toggle_folder(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(NodeId::from(id));
            true
        }
    }

    pub fn select_folder(&mut self, id: &str) {
        self.selected_folder = NodeId::from(id);
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    fn show_preview(&mut self, file_id: &NodeId, content: &DecodedContent) -> Result<(), SessionError> {
        self.release_preview();
        let handle = self.previews.create(file_id, content)?;
        self.preview = PreviewState::Active {
            handle,
            file_id: file_id.clone(),
        };
        Ok(())
    }

    fn release_preview(&mut self) {
        if let PreviewState::Active { handle, .. } = std::mem::take(&mut self.preview) {
            self.previews.release(&handle);
        }
    }

    fn resolution_error(&self, id: &str) -> SessionError {
        if self.tree.contains(id) {
            TreeError::NotAFolder(id.into()).into()
        } else {
            TreeError::NotFound(id.into()).into()
        }
    }

    /// Apply `change` to a copy of the tree; publish and persist the copy only
    /// when the change succeeded.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Tree) -> Result<T, TreeError>,
    ) -> Result<T, SessionError> {
        let mut draft = Tree::clone(&self.tree);
        let outcome = change(&mut draft)?;
        self.tree = Arc::new(draft);
        self.persist();
        Ok(outcome)
    }

    fn persist(&mut self) {
        match self.repository.save(&self.tree) {
            Ok(()) => self.last_persist_error = None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist tree; keeping in-memory copy");
                self.last_persist_error = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::app::preview::MemoryPreviews;
    use crate::app::prompt::ScriptedPrompter;
    use crate::app::upload::PDF_MIME;
    use crate::domain::model::ROOT_ID;
    use crate::infra::storage::MemoryStore;

    type TestSession = Session<MemoryStore, MemoryPreviews>;

    fn session() -> TestSession {
        Session::open(TreeRepository::new(MemoryStore::new()), MemoryPreviews::new())
    }

    fn pdf(name: &str, bytes: &[u8]) -> UploadRequest {
        UploadRequest::new(name, PDF_MIME, bytes.to_vec())
    }

    #[test]
    fn opens_with_root_selected_and_expanded() {
        let session = session();
        assert_eq!(session.selected_folder_id(), ROOT_ID);
        assert!(session.is_expanded(ROOT_ID));
        assert!(session.selected_file().is_none());
        assert!(!session.preview().is_active());
    }

    #[test]
    fn create_folder_expands_parent() {
        let mut session = session();
        let parent = session.create_folder(ROOT_ID, "Contracts").unwrap();
        assert!(!session.is_expanded(parent.as_str()));

        session.create_folder(parent.as_str(), "Signed").unwrap();
        assert!(session.is_expanded(parent.as_str()));
    }

    #[test]
    fn create_folder_rejects_blank_and_unknown_parent() {
        let mut session = session();
        assert!(matches!(
            session.create_folder(ROOT_ID, "  "),
            Err(SessionError::EmptyName)
        ));
        assert!(matches!(
            session.create_folder("missing", "X"),
            Err(SessionError::Tree(TreeError::NotFound(_)))
        ));
        assert_eq!(session.ids_issued(), 0);
        assert!(session.tree().root().children.is_empty());
    }

    #[test]
    fn upload_into_a_file_is_a_resolution_error() {
        let mut session = session();
        let file = session.upload(pdf("a.pdf", b"1"), ROOT_ID).unwrap();
        let err = session
            .upload(pdf("b.pdf", b"2"), file.as_str())
            .unwrap_err();
        assert!(matches!(err, SessionError::Tree(TreeError::NotAFolder(_))));
        assert_eq!(session.tree().root().children.len(), 1);
    }

    #[test]
    fn upload_previews_without_redecoding() {
        let mut session = session();
        let id = session.upload(pdf("a.pdf", b"%PDF-1"), ROOT_ID).unwrap();

        let handle = session.preview_handle().cloned().unwrap();
        assert_eq!(session.preview().file_id(), Some(&id));
        assert_eq!(
            session.previews().get(&handle).map(|c| c.bytes.as_slice()),
            Some(&b"%PDF-1"[..])
        );
    }

    #[test]
    fn selecting_another_file_releases_prior_handle() {
        let mut session = session();
        let first = session.upload(pdf("a.pdf", b"a"), ROOT_ID).unwrap();
        let second = session.upload(pdf("b.pdf", b"b"), ROOT_ID).unwrap();
        assert_eq!(session.previews().live(), 1);

        session.select_file(first.as_str()).unwrap();
        assert_eq!(session.previews().live(), 1);
        assert_eq!(session.previews().released(), 2);
        assert_eq!(session.preview().file_id(), Some(&first));
        assert_ne!(session.selected_file_id(), Some(&second));
    }

    #[test]
    fn select_file_without_content_clears_preview() {
        let store = MemoryStore::new().with_slot(
            crate::app::persistence::STORAGE_KEY,
            r#"{"id":"root","name":"Main","type":"folder","children":[
                {"id":"bare","name":"bare.pdf","type":"file","mime":"application/pdf","size":0}]}"#,
        );
        let mut session = Session::open(TreeRepository::new(store), MemoryPreviews::new());
        session.upload(pdf("a.pdf", b"a"), ROOT_ID).unwrap();
        assert!(session.preview().is_active());

        session.select_file("bare").unwrap();
        assert!(!session.preview().is_active());
        assert_eq!(session.selected_file().map(|f| f.name.as_str()), Some("bare.pdf"));
        assert_eq!(session.previews().live(), 0);
    }

    #[test]
    fn select_file_rejects_folders() {
        let mut session = session();
        let folder = session.create_folder(ROOT_ID, "Docs").unwrap();
        assert!(matches!(
            session.select_file(folder.as_str()),
            Err(SessionError::NotAFile(_))
        ));
        assert!(matches!(
            session.select_file("missing"),
            Err(SessionError::Tree(TreeError::NotFound(_)))
        ));
    }

    #[test]
    fn clear_preview_resets_file_selection() {
        let mut session = session();
        session.upload(pdf("a.pdf", b"a"), ROOT_ID).unwrap();
        session.clear_preview();
        assert!(session.selected_file_id().is_none());
        assert!(!session.preview().is_active());
        assert_eq!(session.previews().live(), 0);
    }

    #[test]
    fn deleting_an_ancestor_clears_nested_preview() {
        let mut session = session();
        let outer = session.create_folder(ROOT_ID, "Outer").unwrap();
        let inner = session.create_folder(outer.as_str(), "Inner").unwrap();
        session.upload(pdf("deep.pdf", b"deep"), inner.as_str()).unwrap();
        session.select_folder(inner.as_str());

        session.delete(outer.as_str()).unwrap();

        assert!(!session.preview().is_active());
        assert!(session.selected_file_id().is_none());
        assert_eq!(session.selected_folder_id(), ROOT_ID);
        assert!(!session.is_expanded(outer.as_str()));
        assert_eq!(session.previews().live(), 0);
    }

    #[test]
    fn deleting_unrelated_node_keeps_preview() {
        let mut session = session();
        let folder = session.create_folder(ROOT_ID, "Other").unwrap();
        let file = session.upload(pdf("a.pdf", b"a"), ROOT_ID).unwrap();

        session.delete(folder.as_str()).unwrap();
        assert_eq!(session.preview().file_id(), Some(&file));
        assert_eq!(session.selected_file_id(), Some(&file));
    }

    #[test]
    fn root_cannot_be_deleted_or_renamed() {
        let mut session = session();
        assert!(matches!(
            session.delete(ROOT_ID),
            Err(SessionError::Tree(TreeError::RootImmutable))
        ));
        assert!(matches!(
            session.rename(ROOT_ID, "Top"),
            Err(SessionError::Tree(TreeError::RootImmutable))
        ));
        assert_eq!(session.tree().root().name, "Main");
    }

    #[test]
    fn snapshots_are_not_affected_by_later_mutations() {
        let mut session = session();
        let before = session.snapshot();
        session.create_folder(ROOT_ID, "Contracts").unwrap();
        assert!(before.root().children.is_empty());
        assert_eq!(session.tree().root().children.len(), 1);
    }

    #[test]
    fn prompted_operations_follow_answers() {
        let mut session = session();
        let mut prompter = ScriptedPrompter::new()
            .answer(Some("Board"))
            .answer(None)
            .answer(Some("Board minutes"))
            .confirmation(false)
            .confirmation(true);

        let folder = session
            .request_create_folder(ROOT_ID, &mut prompter)
            .unwrap()
            .unwrap();
        assert!(session.request_create_folder(ROOT_ID, &mut prompter).unwrap().is_none());
        assert!(session.request_rename(folder.as_str(), &mut prompter).unwrap());
        assert_eq!(
            session.tree().folder(folder.as_str()).map(|f| f.name.as_str()),
            Some("Board minutes")
        );

        assert!(!session.request_delete(folder.as_str(), &mut prompter).unwrap());
        assert!(session.tree().contains(folder.as_str()));
        assert!(session.request_delete(folder.as_str(), &mut prompter).unwrap());
        assert!(!session.tree().contains(folder.as_str()));
        assert_eq!(prompter.asked()[3], DELETE_CONFIRMATION);
    }

    #[test]
    fn ui_state_updates_do_not_persist() {
        let mut session = session();
        session.create_folder(ROOT_ID, "Docs").unwrap();
        let stored = session
            .repository()
            .store()
            .get(crate::app::persistence::STORAGE_KEY)
            .unwrap();

        session.toggle_folder(ROOT_ID);
        session.select_folder("anything");
        session.set_search_term("doc");

        assert!(!session.is_expanded(ROOT_ID));
        assert_eq!(session.selected_folder().id, ROOT_ID);
        assert_eq!(
            session
                .repository()
                .store()
                .get(crate::app::persistence::STORAGE_KEY)
                .unwrap(),
            stored
        );
    }

    #[test]
    fn search_results_follow_term() {
        let mut session = session();
        session.upload(pdf("Term Sheet.pdf", b"1"), ROOT_ID).unwrap();
        session.upload(pdf("nda.pdf", b"2"), ROOT_ID).unwrap();

        session.set_search_term("   ");
        assert!(session.search_results().is_empty());
        session.set_search_term("TERM");
        let names: Vec<_> = session
            .search_results()
            .into_iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["Term Sheet.pdf"]);
    }
}
