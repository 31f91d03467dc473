//! Inline image assets carried by create/describe/composite requests.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;

use super::ids::TaskId;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("not a data URL")]
    NotDataUrl,

    #[error("data URL is not base64 encoded")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// An embedded binary payload with its declared media type.
///
/// Consumed by exactly one upload step; never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineAsset {
    media_type: String,
    data: Vec<u8>,
}

impl InlineAsset {
    pub fn new(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            data,
        }
    }

    /// Parse `data:<media-type>;base64,<payload>`.
    pub fn from_data_url(url: &str) -> Result<Self, AssetError> {
        let rest = url.strip_prefix("data:").ok_or(AssetError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(AssetError::NotDataUrl)?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or(AssetError::NotBase64)?;
        let data = BASE64_STANDARD
            .decode(payload.trim())
            .map_err(|e| AssetError::InvalidPayload(e.to_string()))?;
        Ok(Self::new(media_type, data))
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// File extension guessed from the media type.
    pub fn file_suffix(&self) -> &str {
        let essence = self
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        match essence {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            other => match other.split_once('/') {
                Some((_, subtype)) if !subtype.is_empty() => subtype,
                _ => "png",
            },
        }
    }

    /// Upload filename for this asset within `task_id`.
    pub fn file_name(&self, task_id: TaskId) -> String {
        format!("{task_id}.{}", self.file_suffix())
    }
}

impl std::fmt::Debug for InlineAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineAsset")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}
