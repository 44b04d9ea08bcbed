// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock blob store with upload capture and failure injection.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use unibox_core::types::RetrievalLink;
use unibox_core::{BlobStore, UniboxError};

/// One captured upload.
#[derive(Debug, Clone)]
pub struct CapturedUpload {
    pub key: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Default)]
pub struct MockBlobStore {
    uploads: Mutex<Vec<CapturedUpload>>,
    fail_uploads: AtomicBool,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub async fn uploads(&self) -> Vec<CapturedUpload> {
        self.uploads.lock().await.clone()
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        mime_type: &str,
        folder: &str,
    ) -> Result<String, UniboxError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(UniboxError::Blob {
                message: "injected upload failure".to_string(),
                source: None,
            });
        }
        let key = format!("{folder}/{filename}");
        self.uploads.lock().await.push(CapturedUpload {
            key: key.clone(),
            mime_type: mime_type.to_string(),
            data,
        });
        Ok(key)
    }

    async fn retrieval_link(&self, key: &str) -> Result<RetrievalLink, UniboxError> {
        Ok(RetrievalLink {
            url: format!("mock://{key}"),
            expires_in_secs: 3600,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uploads_are_captured_under_folder_key() {
        let store = MockBlobStore::new();
        let key = store
            .upload(b"bytes".to_vec(), "100.jpg", "image/jpeg", "co-1/ops")
            .await
            .unwrap();
        assert_eq!(key, "co-1/ops/100.jpg");

        let uploads = store.uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn failure_injection() {
        let store = MockBlobStore::new();
        store.set_fail_uploads(true);
        assert!(
            store
                .upload(b"x".to_vec(), "1.bin", "application/octet-stream", "f")
                .await
                .is_err()
        );
        assert_eq!(store.upload_count().await, 0);
    }
}
