// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem blob store for media attachments.
//!
//! Blobs live under a configured root directory, keyed by a relative
//! `folder/filename` path. Retrieval links are `file://` URLs with an
//! advisory TTL so callers can treat them uniformly with signed remote
//! URLs if a different backend is swapped in.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use unibox_config::model::MediaConfig;
use unibox_core::types::RetrievalLink;
use unibox_core::{BlobStore, UniboxError};

pub struct FsBlobStore {
    root: PathBuf,
    link_ttl_secs: u64,
}

impl FsBlobStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            link_ttl_secs: config.link_ttl_secs,
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, UniboxError> {
        // Keys are produced internally, but reject traversal anyway.
        let relative = Path::new(key);
        if relative.components().any(|c| {
            matches!(
                c,
                std::path::Component::ParentDir | std::path::Component::RootDir
            )
        }) {
            return Err(UniboxError::Blob {
                message: format!("invalid blob key: {key}"),
                source: Some("key must be a relative path without parent components".into()),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        _mime_type: &str,
        folder: &str,
    ) -> Result<String, UniboxError> {
        let key = format!("{folder}/{filename}");
        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UniboxError::Blob {
                    message: format!("failed to create blob directory for {key}"),
                    source: Some(Box::new(e)),
                })?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| UniboxError::Blob {
                message: format!("failed to write blob {key}"),
                source: Some(Box::new(e)),
            })?;
        debug!(key = %key, "blob stored");
        Ok(key)
    }

    async fn retrieval_link(&self, key: &str) -> Result<RetrievalLink, UniboxError> {
        let path = self.resolve(key)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| UniboxError::Blob {
                message: format!("blob not found: {key}"),
                source: Some(Box::new(e)),
            })?;
        if !metadata.is_file() {
            return Err(UniboxError::Blob {
                message: format!("blob key does not point at a file: {key}"),
                source: Some("expected a regular file".into()),
            });
        }
        Ok(RetrievalLink {
            url: format!("file://{}", path.display()),
            expires_in_secs: self.link_ttl_secs,
        })
    }
}
