use std::fs;

use anyhow::Result;
use dataroom::app::persistence::{PersistenceError, STORAGE_KEY, TreeRepository};
use dataroom::app::preview::{MemoryPreviews, TempFilePreviews};
use dataroom::app::prompt::ScriptedPrompter;
use dataroom::app::session::{Session, SessionError};
use dataroom::app::upload::{PDF_MIME, PendingUpload, UploadRequest};
use dataroom::domain::errors::TreeError;
use dataroom::domain::model::{Node, ROOT_ID};
use dataroom::domain::tree::MAX_DEPTH;
use dataroom::infra::storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

fn memory_session() -> Session<MemoryStore, MemoryPreviews> {
    Session::open(TreeRepository::new(MemoryStore::new()), MemoryPreviews::new())
}

fn file_session(dir: &std::path::Path) -> Session<FileStore, MemoryPreviews> {
    Session::open(TreeRepository::new(FileStore::new(dir)), MemoryPreviews::new())
}

fn pdf(name: &str, len: usize) -> UploadRequest {
    UploadRequest::new(name, PDF_MIME, vec![b'%'; len])
}

#[test]
fn create_folder_under_root() -> Result<()> {
    let mut session = memory_session();
    let id = session.create_folder(ROOT_ID, "Contracts")?;

    let children = &session.tree().root().children;
    assert_eq!(children.len(), 1);
    assert!(matches!(&children[0], Node::Folder(folder) if folder.name == "Contracts"));
    assert_eq!(children[0].id(), &id);
    assert!(!id.is_root());
    Ok(())
}

#[test]
fn upload_pdf_to_root_selects_it() -> Result<()> {
    let mut session = memory_session();
    let id = session.upload(pdf("a.pdf", 10), ROOT_ID)?;

    let file = session.tree().file(id.as_str()).expect("uploaded file");
    assert_eq!(file.size, 10);
    assert_eq!(file.mime, PDF_MIME);
    assert_eq!(session.tree().root().children.len(), 1);
    assert_eq!(session.selected_file_id(), Some(&id));
    Ok(())
}

#[test]
fn deleting_selected_folder_falls_back_to_root() -> Result<()> {
    let mut session = memory_session();
    let contracts = session.create_folder(ROOT_ID, "Contracts")?;
    session.select_folder(contracts.as_str());

    session.delete(contracts.as_str())?;

    assert_eq!(session.selected_folder_id(), ROOT_ID);
    assert!(session.tree().root().children.is_empty());
    Ok(())
}

#[test]
fn png_upload_is_rejected_without_side_effects() {
    let mut session = memory_session();
    let before = session.snapshot();

    let err = session
        .upload(UploadRequest::new("x.png", "image/png", vec![1, 2, 3]), ROOT_ID)
        .unwrap_err();

    assert!(matches!(err, SessionError::UnsupportedMediaType(_)));
    assert_eq!(err.to_string(), "Only PDF files are supported.");
    assert!(err.is_validation());
    assert_eq!(*session.tree(), *before);
    assert_eq!(session.ids_issued(), 0);
}

#[test]
fn renaming_to_empty_keeps_name() -> Result<()> {
    let mut session = memory_session();
    let id = session.upload(pdf("a.pdf", 1), ROOT_ID)?;

    assert!(matches!(
        session.rename(id.as_str(), ""),
        Err(SessionError::EmptyName)
    ));
    let mut prompter = ScriptedPrompter::new().answer(Some(""));
    assert!(!session.request_rename(id.as_str(), &mut prompter)?);

    assert_eq!(
        session.tree().file(id.as_str()).map(|f| f.name.as_str()),
        Some("a.pdf")
    );
    Ok(())
}

#[test]
fn reload_after_restart_previews_stored_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let id = {
        let mut session = file_session(dir.path());
        let folder = session.create_folder(ROOT_ID, "Board")?;
        session.upload(
            UploadRequest::new("minutes.pdf", PDF_MIME, b"%PDF-minutes".to_vec()),
            folder.as_str(),
        )?
    };
    assert!(dir.path().join(format!("{STORAGE_KEY}.json")).exists());

    let previews = TempFilePreviews::new()?;
    let preview_dir = previews.dir().to_path_buf();
    let mut session = Session::open(TreeRepository::new(FileStore::new(dir.path())), previews);
    assert!(session.selected_file_id().is_none());

    session.select_file(id.as_str())?;
    let handle = session.preview_handle().expect("preview handle");
    assert!(handle.url().starts_with(preview_dir.to_string_lossy().as_ref()));
    assert_eq!(fs::read(handle.url())?, b"%PDF-minutes");
    Ok(())
}

#[test]
fn prepared_uploads_both_persist() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut session = file_session(dir.path());

    let first = PendingUpload::prepare(pdf("one.pdf", 3)).expect("pdf accepted");
    let second = PendingUpload::prepare(pdf("two.pdf", 5)).expect("pdf accepted");
    session.complete_upload(first, ROOT_ID)?;
    session.complete_upload(second, ROOT_ID)?;

    let reloaded = TreeRepository::new(FileStore::new(dir.path()))
        .try_load()?
        .expect("stored tree");
    let names: Vec<_> = reloaded.files().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["one.pdf", "two.pdf"]);
    Ok(())
}

#[test]
fn snapshot_is_stable_across_mutations() -> Result<()> {
    let mut session = memory_session();
    let folder = session.create_folder(ROOT_ID, "Deals")?;
    let snapshot = session.snapshot();

    session.rename(folder.as_str(), "Closed deals")?;
    session.upload(pdf("a.pdf", 2), folder.as_str())?;
    session.delete(folder.as_str())?;

    assert_eq!(
        snapshot.folder(folder.as_str()).map(|f| f.name.as_str()),
        Some("Deals")
    );
    assert!(snapshot.files().next().is_none());
    assert!(!session.tree().contains(folder.as_str()));
    Ok(())
}

#[test]
fn quota_failure_is_recorded_and_session_continues() -> Result<()> {
    let repository = TreeRepository::new(MemoryStore::new().with_quota(Some(200)));
    let mut session = Session::open(repository, MemoryPreviews::new());

    let id = session.upload(pdf("big.pdf", 1024), ROOT_ID)?;
    assert!(matches!(
        session.last_persist_error(),
        Some(PersistenceError::Storage(StorageError::QuotaExceeded { .. }))
    ));
    assert!(session.tree().contains(id.as_str()));
    assert!(session.repository().store().get(STORAGE_KEY)?.is_none());

    session.delete(id.as_str())?;
    assert!(session.last_persist_error().is_none());
    assert!(session.repository().store().get(STORAGE_KEY)?.is_some());
    Ok(())
}

#[test]
fn corrupt_storage_starts_fresh() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join(format!("{STORAGE_KEY}.json")), "{\"id\":\"nope\"")?;

    let mut session = file_session(dir.path());
    assert_eq!(session.tree().root().id, ROOT_ID);
    assert!(session.tree().root().children.is_empty());

    session.create_folder(ROOT_ID, "Fresh")?;
    let stored = fs::read_to_string(dir.path().join(format!("{STORAGE_KEY}.json")))?;
    assert!(stored.contains("\"Fresh\""));
    Ok(())
}

#[test]
fn deeply_nested_folders_survive_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (saved, deepest) = {
        let mut session = file_session(dir.path());
        let mut parent = ROOT_ID.to_owned();
        for level in 1..=100 {
            parent = session
                .create_folder(&parent, &format!("Level {level}"))?
                .to_string();
        }
        session.upload(pdf("bottom.pdf", 6), &parent)?;
        assert!(session.last_persist_error().is_none());
        (session.snapshot(), parent)
    };

    let reopened = file_session(dir.path());
    assert_eq!(reopened.tree().len(), 102);
    assert_eq!(*reopened.tree(), *saved);
    assert!(reopened.tree().folder(&deepest).is_some());
    Ok(())
}

#[test]
fn folders_beyond_depth_limit_are_refused() -> Result<()> {
    let mut session = memory_session();
    let mut parent = ROOT_ID.to_owned();
    for _ in 0..MAX_DEPTH {
        parent = session.create_folder(&parent, "Nested")?.to_string();
    }
    let before = session.snapshot();

    let err = session.create_folder(&parent, "Too deep").unwrap_err();
    assert!(matches!(err, SessionError::Tree(TreeError::TooDeep { .. })));
    assert_eq!(*session.tree(), *before);

    session.upload(pdf("leaf.pdf", 1), &parent)?;
    Ok(())
}
