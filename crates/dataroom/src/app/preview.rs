//! Preview handles for decoded file content.
//!
//! A handle is an external, revocable reference to decoded bytes, comparable
//! to a browser object URL. Providers create handles and must be told when a
//! handle is released.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;

use crate::domain::content::DecodedContent;
use crate::domain::model::NodeId;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to prepare preview storage: {0}")]
    Setup(#[source] io::Error),
    #[error("failed to write preview for `{file_id}`: {source}")]
    Write {
        file_id: NodeId,
        #[source]
        source: io::Error,
    },
}

/// Opaque reference to a live preview.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle {
    url: String,
}

impl PreviewHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Location a viewer can open.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Creates and revokes preview handles.
pub trait PreviewProvider {
    fn create(
        &mut self,
        file_id: &NodeId,
        content: &DecodedContent,
    ) -> Result<PreviewHandle, PreviewError>;

    fn release(&mut self, handle: &PreviewHandle);
}

/// Preview lifecycle: at most one handle is active, tied to one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreviewState {
    #[default]
    Empty,
    Active {
        handle: PreviewHandle,
        file_id: NodeId,
    },
}

impl PreviewState {
    pub fn handle(&self) -> Option<&PreviewHandle> {
        match self {
            PreviewState::Empty => None,
            PreviewState::Active { handle, .. } => Some(handle),
        }
    }

    pub fn file_id(&self) -> Option<&NodeId> {
        match self {
            PreviewState::Empty => None,
            PreviewState::Active { file_id, .. } => Some(file_id),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PreviewState::Active { .. })
    }
}

/// Writes decoded bytes to files inside a private temporary directory.
///
/// File names come from a per-provider counter and a sanitized file id, so a
/// stored id can never point outside the directory. The directory disappears
/// when the provider is dropped.
#[derive(Debug)]
pub struct TempFilePreviews {
    dir: TempDir,
    files: HashMap<String, PathBuf>,
    next: u64,
}

impl TempFilePreviews {
    pub fn new() -> Result<Self, PreviewError> {
        let dir = tempfile::Builder::new()
            .prefix("dataroom-preview-")
            .tempdir()
            .map_err(PreviewError::Setup)?;
        Ok(Self {
            dir,
            files: HashMap::new(),
            next: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Number of handles not yet released.
    pub fn live(&self) -> usize {
        self.files.len()
    }
}

impl PreviewProvider for TempFilePreviews {
    fn create(
        &mut self,
        file_id: &NodeId,
        content: &DecodedContent,
    ) -> Result<PreviewHandle, PreviewError> {
        self.next += 1;
        let path = self.dir.path().join(format!(
            "{}-{}.{}",
            self.next,
            file_stem(file_id.as_str()),
            extension_for(&content.mime)
        ));
        fs::write(&path, &content.bytes).map_err(|source| PreviewError::Write {
            file_id: file_id.clone(),
            source,
        })?;
        let handle = PreviewHandle::new(path.display().to_string());
        self.files.insert(handle.url().to_owned(), path);
        Ok(handle)
    }

    fn release(&mut self, handle: &PreviewHandle) {
        if let Some(path) = self.files.remove(handle.url())
            && let Err(err) = fs::remove_file(&path)
        {
            tracing::warn!(error = %err, path = %path.display(), "failed to remove preview file");
        }
    }
}

/// Keeps decoded blobs in memory under `blob:` urls.
#[derive(Debug, Default)]
pub struct MemoryPreviews {
    blobs: HashMap<String, DecodedContent>,
    created: usize,
    released: usize,
}

impl MemoryPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: &PreviewHandle) -> Option<&DecodedContent> {
        self.blobs.get(handle.url())
    }

    pub fn live(&self) -> usize {
        self.blobs.len()
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn released(&self) -> usize {
        self.released
    }
}

impl PreviewProvider for MemoryPreviews {
    fn create(
        &mut self,
        file_id: &NodeId,
        content: &DecodedContent,
    ) -> Result<PreviewHandle, PreviewError> {
        self.created += 1;
        let handle = PreviewHandle::new(format!("blob:dataroom/{}/{file_id}", self.created));
        self.blobs.insert(handle.url().to_owned(), content.clone());
        Ok(handle)
    }

    fn release(&mut self, handle: &PreviewHandle) {
        if self.blobs.remove(handle.url()).is_some() {
            self.released += 1;
        }
    }
}

/// `id` reduced to characters that are safe in a single path component.
fn file_stem(id: &str) -> String {
    id.chars()
        .take(64)
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(bytes: &[u8]) -> DecodedContent {
        DecodedContent {
            mime: "application/pdf".into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn temp_file_previews_write_and_release() -> Result<(), PreviewError> {
        let mut previews = TempFilePreviews::new()?;
        let handle = previews.create(&"file_1".into(), &pdf(b"%PDF-1.7"))?;

        let path = PathBuf::from(handle.url());
        assert!(path.starts_with(previews.dir()));
        assert_eq!(path.extension().and_then(|ext| ext.to_str()), Some("pdf"));
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.7");

        previews.release(&handle);
        assert!(!path.exists());
        assert_eq!(previews.live(), 0);
        Ok(())
    }

    #[test]
    fn temp_file_previews_stay_inside_their_dir() -> Result<(), PreviewError> {
        let mut previews = TempFilePreviews::new()?;
        for id in ["../escaped", "a/b", "..", "/etc/passwd", "c:\\x", ""] {
            let handle = previews.create(&id.into(), &pdf(id.as_bytes()))?;
            let path = PathBuf::from(handle.url());
            assert_eq!(path.parent(), Some(previews.dir()), "{id} left the dir");
            assert_eq!(fs::read(&path).unwrap(), id.as_bytes());
        }
        assert!(!previews.dir().parent().unwrap().join("escaped.pdf").exists());
        assert_eq!(previews.live(), 6);
        Ok(())
    }

    #[test]
    fn same_file_gets_distinct_preview_paths() -> Result<(), PreviewError> {
        let mut previews = TempFilePreviews::new()?;
        let first = previews.create(&"file_1".into(), &pdf(b"old"))?;
        let second = previews.create(&"file_1".into(), &pdf(b"new"))?;
        assert_ne!(first, second);

        previews.release(&first);
        assert_eq!(fs::read(second.url()).unwrap(), b"new");
        Ok(())
    }

    #[test]
    fn memory_previews_track_lifecycle() {
        let mut previews = MemoryPreviews::new();
        let first = previews.create(&"a".into(), &pdf(b"1")).unwrap();
        let second = previews.create(&"a".into(), &pdf(b"2")).unwrap();
        assert_ne!(first, second);
        assert_eq!(previews.created(), 2);
        assert_eq!(previews.get(&second).map(|c| c.bytes.clone()), Some(b"2".to_vec()));

        previews.release(&first);
        previews.release(&first);
        assert_eq!(previews.live(), 1);
        assert_eq!(previews.released(), 1);
    }

    #[test]
    fn preview_state_accessors() {
        let state = PreviewState::Active {
            handle: PreviewHandle::new("blob:x"),
            file_id: "f".into(),
        };
        assert!(state.is_active());
        assert_eq!(state.file_id().map(|id| id.as_str()), Some("f"));
        assert!(PreviewState::default().handle().is_none());
    }
}
