//! Text-safe encoding of uploaded payloads.
//!
//! Payloads are stored as data URLs (`data:<mime>;base64,<payload>`) so the
//! whole tree serializes to a single string.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Errors raised when a stored payload cannot be turned back into bytes.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content is not a data url")]
    MissingScheme,
    #[error("data url has no `,` separating header and payload")]
    MissingSeparator,
    #[error("data url payload is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
}

/// Encoded payload of a file. Cloning shares the underlying text.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedContent(Arc<str>);

impl EncodedContent {
    /// Encode raw bytes with their media type.
    pub fn encode(mime: &str, bytes: &[u8]) -> Self {
        let payload = STANDARD.encode(bytes);
        let text = format!("{SCHEME}{mime}{BASE64_MARKER},{payload}");
        Self(Arc::from(text))
    }

    /// Wrap already encoded text without checking it.
    pub fn from_encoded(text: impl Into<String>) -> Self {
        Self(Arc::from(text.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Media type recorded in the header, if the text looks like a data url.
    pub fn mime(&self) -> Option<&str> {
        let (header, _) = self.0.strip_prefix(SCHEME)?.split_once(',')?;
        Some(header.strip_suffix(BASE64_MARKER).unwrap_or(header))
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> Result<DecodedContent, ContentError> {
        let rest = self
            .0
            .strip_prefix(SCHEME)
            .ok_or(ContentError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(ContentError::MissingSeparator)?;
        let mime = header
            .strip_suffix(BASE64_MARKER)
            .ok_or(ContentError::NotBase64)?;
        let bytes = STANDARD.decode(payload)?;
        Ok(DecodedContent {
            mime: mime.to_owned(),
            bytes,
        })
    }
}

impl fmt::Debug for EncodedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedContent")
            .field("mime", &self.mime())
            .field("len", &self.0.len())
            .finish()
    }
}

impl Serialize for EncodedContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EncodedContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::from_encoded(text))
    }
}

/// Raw bytes recovered from an [`EncodedContent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedContent {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DecodedContent {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
