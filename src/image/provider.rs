//! The remote image-editing capability.

use crate::error::Result;
use crate::image::types::{AspectRatio, UploadedImage};
use async_trait::async_trait;
use serde::Serialize;

/// Base64 image data paired with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineImage {
    /// Raw base64 payload, without a data-URI prefix.
    pub data: String,
    /// MIME type of the payload.
    pub mime_type: String,
}

impl From<&UploadedImage> for InlineImage {
    fn from(image: &UploadedImage) -> Self {
        Self {
            data: image.payload().to_string(),
            mime_type: image.mime_type().to_string(),
        }
    }
}

/// One instruction-driven edit of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditRequest {
    /// Natural-language instruction.
    pub instruction: String,
    /// Source image.
    pub image: InlineImage,
    /// Desired output aspect ratio.
    pub aspect_ratio: AspectRatio,
}

/// The first inline image found in a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedImage {
    /// Base64 payload.
    pub data: String,
    /// MIME type reported by the provider, if any.
    pub mime_type: Option<String>,
}

/// Trait for providers that edit an image from an instruction.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Sends the edit request and returns the produced image.
    async fn edit(&self, request: &EditRequest) -> Result<EditedImage>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;
}
