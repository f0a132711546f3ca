use crate::client::GeminiClient;
use crate::error::{GeminiError, Result};
use crate::types::Part;
use std::sync::Arc;

const SUMMARY_INSTRUCTIONS: &str = "\
Combine what this image shows with the text below into one comprehensive summary of the scene.";

/// Prompt used when the caller gives none
pub const DEFAULT_IMAGE_PROMPT: &str = "\
Describe every element in this image in detail, where they are relative to each other and their \
colours.";

/// MIME type from the leading magic bytes of an image
pub fn detect_image_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WEBP"[..]) {
        Some("image/webp")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

/// Turns an image plus a user prompt into a textual scene summary
pub struct ImageSummarizer {
    client: Arc<GeminiClient>,
}

impl ImageSummarizer {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }

    /// Parts go out as instructions, user prompt, then the image
    pub async fn summarize(&self, image: &[u8], prompt: &str) -> Result<String> {
        let mime_type = detect_image_mime_type(image).ok_or_else(|| {
            GeminiError::UnsupportedImage("expected PNG, JPEG, WebP or GIF data".to_string())
        })?;
        log::info!(
            "Summarizing {} image ({} bytes) with {}",
            mime_type,
            image.len(),
            self.client.config().llm_model
        );

        let summary = self
            .client
            .generate_text(vec![
                Part::text(SUMMARY_INSTRUCTIONS),
                Part::text(prompt.trim()),
                Part::inline_data(mime_type, image),
            ])
            .await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(GeminiError::InvalidResponse("empty summary".to_string()));
        }
        Ok(summary.to_string())
    }
}
