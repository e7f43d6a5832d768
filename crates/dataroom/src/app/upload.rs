//! Upload intake: media type checks and payload encoding.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::content::EncodedContent;

/// The only media type the room accepts.
pub const PDF_MIME: &str = "application/pdf";
const FALLBACK_MIME: &str = "application/octet-stream";

/// A file handed in by the user, before any checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub name: String,
    /// Media type declared by the caller.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its type from the extension unless
    /// `mime` is given.
    pub fn from_path(path: &Path, mime: Option<&str>) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime
            .map(str::to_owned)
            .unwrap_or_else(|| mime_from_extension(path).to_owned());
        Ok(Self { name, mime, bytes })
    }

    pub fn is_accepted(&self) -> bool {
        self.mime == PDF_MIME
    }
}

/// An accepted upload whose payload has been encoded and is ready to be
/// attached to the tree.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub(crate) name: String,
    pub(crate) mime: String,
    pub(crate) bytes: Vec<u8>,
    pub(crate) content: EncodedContent,
}

impl PendingUpload {
    /// Check the declared type and encode the payload. Returns the request
    /// back when its type is not accepted.
    pub fn prepare(request: UploadRequest) -> Result<Self, UploadRequest> {
        if !request.is_accepted() {
            return Err(request);
        }
        let content = EncodedContent::encode(&request.mime, &request.bytes);
        Ok(Self {
            name: request.name,
            mime: request.mime,
            bytes: request.bytes,
            content,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Media type guessed from a file extension.
pub fn mime_from_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => PDF_MIME,
        _ => FALLBACK_MIME,
    }
}
