// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob storage trait for persisted media attachments.

use async_trait::async_trait;

use crate::error::UniboxError;
use crate::types::RetrievalLink;

/// Stores media blobs and produces time-bounded retrieval links.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Uploads a blob under `folder/filename` and returns its storage key.
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        mime_type: &str,
        folder: &str,
    ) -> Result<String, UniboxError>;

    /// Produces a time-bounded link for retrieving a stored blob.
    async fn retrieval_link(&self, key: &str) -> Result<RetrievalLink, UniboxError>;
}
