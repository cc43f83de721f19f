//! User-selected source and target media.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    #[error("Unsupported media type: {0}")]
    UnsupportedType(String),
}

/// Broad media category of an asset
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

/// A media file picked by the user. Never uploaded anywhere by itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedAsset {
    pub id: Uuid,
    pub name: String,
    pub path: PathBuf,
    pub kind: AssetKind,
    pub mime_type: String,
}

/// Map a file extension to (kind, mime type)
fn classify(extension: &str) -> Option<(AssetKind, &'static str)> {
    let entry = match extension.to_lowercase().as_str() {
        "png" => (AssetKind::Image, "image/png"),
        "jpg" | "jpeg" => (AssetKind::Image, "image/jpeg"),
        "webp" => (AssetKind::Image, "image/webp"),
        "gif" => (AssetKind::Image, "image/gif"),
        "heic" => (AssetKind::Image, "image/heic"),
        "mp4" | "m4v" => (AssetKind::Video, "video/mp4"),
        "mov" => (AssetKind::Video, "video/quicktime"),
        "webm" => (AssetKind::Video, "video/webm"),
        "mkv" => (AssetKind::Video, "video/x-matroska"),
        "avi" => (AssetKind::Video, "video/x-msvideo"),
        _ => return None,
    };
    Some(entry)
}

impl UploadedAsset {
    /// Describe a path without touching the filesystem
    pub fn describe(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        let (kind, mime_type) = classify(extension)
            .ok_or_else(|| AssetError::UnsupportedType(path.display().to_string()))?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            path: path.to_path_buf(),
            kind,
            mime_type: mime_type.to_string(),
        })
    }

    /// Describe a path after checking it is a readable file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(AssetError::NotAFile(path.to_path_buf()));
        }
        Self::describe(path)
    }

    /// Local locator usable for previews
    pub fn reference(&self) -> String {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir()
                .map(|dir| dir.join(&self.path))
                .unwrap_or_else(|_| self.path.clone())
        };
        url::Url::from_file_path(&absolute)
            .map(String::from)
            .unwrap_or_else(|_| self.path.display().to_string())
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>, AssetError> {
        Ok(fs::read(&self.path).await?)
    }

    /// File contents as standard base64, without any `data:` prefix
    pub async fn to_base64(&self) -> Result<String, AssetError> {
        Ok(STANDARD.encode(self.read_bytes().await?))
    }
}
