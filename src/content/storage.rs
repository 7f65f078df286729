//! The single content-storage port: bytes plus a content type go in, a
//! stable reference comes out; the reference later resolves back to bytes.
//! Files are content-addressed by SHA-256 under `<data_dir>/content/`.
//!
//! Objects are immutable and never deleted here. Callers write content
//! before the database row that references it, so a failed insert or a
//! later note delete can leave unreferenced objects on disk; identical
//! re-uploads reclaim them by hash.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Upload cap for note and image payloads.
pub const MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ContentStorageError {
    #[error("content not found")]
    NotFound,
    #[error("invalid content reference")]
    InvalidRef,
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("payload too large: {0} bytes")]
    TooLarge(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContentStorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Only note payload types the catalog accepts.
#[must_use]
pub fn is_allowed_content_type(content_type: &str) -> bool {
    content_type.starts_with("image/") || content_type == "application/pdf"
}

/// Opaque, stable reference to stored content: `sha256:<hex>/<type>`.
/// Carrying the content type in the ref lets resolution hand back the
/// right Content-Type header without a side lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    pub hash: String,
    pub content_type: String,
}

impl ContentRef {
    #[must_use]
    pub fn encode(&self) -> String {
        format!("sha256:{}/{}", self.hash, self.content_type)
    }

    pub fn decode(s: &str) -> Result<Self, ContentStorageError> {
        let rest = s
            .strip_prefix("sha256:")
            .ok_or(ContentStorageError::InvalidRef)?;
        let (hash, content_type) = rest
            .split_once('/')
            .ok_or(ContentStorageError::InvalidRef)?;

        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()) {
            return Err(ContentStorageError::InvalidRef);
        }

        Ok(Self {
            hash: hash.to_string(),
            content_type: content_type.to_string(),
        })
    }
}

pub struct ContentStorage {
    base_path: PathBuf,
}

impl ContentStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("content"),
        }
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        let prefix1 = &hash[0..2];
        let prefix2 = &hash[2..4];
        self.base_path
            .join("objects")
            .join(prefix1)
            .join(prefix2)
            .join(hash)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    /// Stores bytes and returns a stable reference. Rejects payloads whose
    /// content type the catalog does not accept, and payloads over the cap.
    pub async fn store(
        &self,
        data: &[u8],
        content_type: &str,
    ) -> Result<ContentRef, ContentStorageError> {
        if !is_allowed_content_type(content_type) {
            return Err(ContentStorageError::UnsupportedContentType(
                content_type.to_string(),
            ));
        }
        if data.len() > MAX_UPLOAD_SIZE {
            return Err(ContentStorageError::TooLarge(data.len()));
        }

        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = hex::encode(hasher.finalize());

        let final_path = self.object_path(&hash);
        if !final_path.exists() {
            // Write to a temp file and rename so a crash never leaves a
            // half-written object at the final path.
            let temp_path = self.temp_path();
            if let Some(parent) = temp_path.parent() {
                fs::create_dir_all(parent).await?;
            }

            let mut temp_file = File::create(&temp_path).await?;
            temp_file.write_all(data).await?;
            temp_file.sync_all().await?;

            if let Some(parent) = final_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(&temp_path, &final_path).await?;
        }

        Ok(ContentRef {
            hash,
            content_type: content_type.to_string(),
        })
    }

    /// Resolves a reference back to its bytes and content type.
    pub async fn resolve(
        &self,
        reference: &str,
    ) -> Result<(Vec<u8>, String), ContentStorageError> {
        let content_ref = ContentRef::decode(reference)?;
        let path = self.object_path(&content_ref.hash);

        let data = fs::read(&path)
            .await
            .map_err(ContentStorageError::from_io)?;
        Ok((data, content_ref.content_type))
    }
}
