// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media ingestion pipeline.
//!
//! Downloads a message's attachment from the protocol client, uploads it to
//! blob storage under a per-company, per-channel folder, and resolves a
//! time-bounded retrieval link. Every failure is caught and logged; a
//! missing attachment never blocks message ingestion, so the caller
//! persists the message with empty storage fields when this returns `None`.

use std::sync::Arc;

use tracing::{debug, warn};

use unibox_core::types::ChatMessage;
use unibox_core::{BlobStore, ProtocolClient};

pub struct MediaPipeline {
    blobs: Arc<dyn BlobStore>,
}

impl MediaPipeline {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Runs the full pipeline for one message. Returns the blob storage key
    /// and retrieval URL, or `None` if any step failed.
    pub async fn ingest(
        &self,
        client: &dyn ProtocolClient,
        company_id: &str,
        message: &ChatMessage,
    ) -> Option<(String, String)> {
        let payload = match client.download_media(message).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    error = %e,
                    "media download failed, persisting message without attachment"
                );
                return None;
            }
        };

        let extension = extension_for_mime(&payload.mime_type);
        let filename = format!("{}.{}", message.timestamp, extension);
        let folder = format!(
            "{}/{}",
            company_id,
            sanitize_channel_name(&message.channel_name)
        );

        let key = match self
            .blobs
            .upload(payload.data, &filename, &payload.mime_type, &folder)
            .await
        {
            Ok(key) => key,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "media upload failed");
                return None;
            }
        };

        match self.blobs.retrieval_link(&key).await {
            Ok(link) => {
                debug!(message_id = %message.id, key = %key, "media ingested");
                Some((key, link.url))
            }
            Err(e) => {
                warn!(message_id = %message.id, key = %key, error = %e, "retrieval link failed");
                None
            }
        }
    }
}

/// Reduces a channel name to a filesystem-safe folder token: lowercase
/// ASCII alphanumerics with runs of everything else collapsed to a single
/// underscore.
pub fn sanitize_channel_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "channel".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalizes a MIME type to a file extension. Parameters after `;` are
/// ignored (voice notes report `audio/ogg; codecs=opus`).
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let base = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_lowercase();
    match base.as_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/3gpp" => "3gp",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/aac" => "aac",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_become_folder_tokens() {
        assert_eq!(sanitize_channel_name("Ops Team"), "ops_team");
        assert_eq!(sanitize_channel_name("Sales / EMEA (2026)"), "sales_emea_2026");
        assert_eq!(sanitize_channel_name("  spaced  out  "), "spaced_out");
        assert_eq!(sanitize_channel_name("already_safe"), "already_safe");
    }

    #[test]
    fn empty_or_symbolic_names_fall_back() {
        assert_eq!(sanitize_channel_name(""), "channel");
        assert_eq!(sanitize_channel_name("!!!"), "channel");
        assert_eq!(sanitize_channel_name("★彡"), "channel");
    }

    #[test]
    fn common_mime_types_map_to_extensions() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("video/mp4"), "mp4");
        assert_eq!(extension_for_mime("application/pdf"), "pdf");
    }

    #[test]
    fn mime_parameters_are_stripped() {
        assert_eq!(extension_for_mime("audio/ogg; codecs=opus"), "ogg");
        assert_eq!(extension_for_mime("IMAGE/PNG"), "png");
    }

    #[test]
    fn unknown_mime_types_default_to_bin() {
        assert_eq!(extension_for_mime("application/x-unknown"), "bin");
        assert_eq!(extension_for_mime(""), "bin");
    }
}
