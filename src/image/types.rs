//! Image types: uploaded sources, returned results and their formats.

use crate::error::{PassportError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP".as_slice()) {
            return Some(Self::WebP);
        }

        None
    }
}

/// Aspect ratios the editor requests from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 3:4 portrait, the closest supported ratio to a 40x50 mm passport photo.
    #[default]
    #[serde(rename = "3:4")]
    Passport,
}

impl AspectRatio {
    /// Returns the aspect ratio as a string (e.g., "3:4").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "3:4",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The photograph the user selected, held as a self-describing data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    data_uri: String,
    mime_type: String,
}

impl UploadedImage {
    /// Wraps raw file bytes. The MIME type is sniffed from magic bytes when the
    /// caller does not declare one.
    pub fn from_bytes(data: &[u8], mime_type: Option<&str>) -> Result<Self> {
        if data.is_empty() {
            return Err(PassportError::InvalidImage("file is empty".into()));
        }
        let mime_type = match mime_type {
            Some(declared) => declared.trim().to_ascii_lowercase(),
            None => ImageFormat::from_magic_bytes(data)
                .map(|f| f.mime_type().to_string())
                .ok_or_else(|| {
                    PassportError::InvalidImage("unrecognized image format".into())
                })?,
        };
        ensure_image_mime(&mime_type)?;

        let payload = base64::engine::general_purpose::STANDARD.encode(data);
        Ok(Self {
            data_uri: format!("data:{mime_type};base64,{payload}"),
            mime_type,
        })
    }

    /// Parses a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| PassportError::InvalidImage("not a data URI".into()))?;
        let (mime_type, payload) = rest.split_once(";base64,").ok_or_else(|| {
            PassportError::InvalidImage("data URI is not base64 encoded".into())
        })?;
        let mime_type = mime_type.to_ascii_lowercase();
        ensure_image_mime(&mime_type)?;
        if payload.is_empty() {
            return Err(PassportError::InvalidImage("data URI has no payload".into()));
        }
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| PassportError::Decode(e.to_string()))?;

        Ok(Self {
            data_uri: format!("data:{mime_type};base64,{payload}"),
            mime_type,
        })
    }

    /// Reads an image file. The format comes from the file contents, falling
    /// back to the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let declared = match ImageFormat::from_magic_bytes(&data) {
            Some(_) => None,
            None => path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ImageFormat::from_extension)
                .map(|f| f.mime_type()),
        };
        Self::from_bytes(&data, declared)
    }

    /// Returns the full data URI.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    /// Returns the MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the raw base64 payload with the data-URI prefix stripped.
    pub fn payload(&self) -> &str {
        self.data_uri
            .split_once(',')
            .map(|(_, payload)| payload)
            .unwrap_or_default()
    }
}

fn ensure_image_mime(mime_type: &str) -> Result<()> {
    if mime_type.starts_with("image/") && mime_type.len() > "image/".len() {
        Ok(())
    } else {
        Err(PassportError::InvalidImage(format!(
            "unsupported file type '{mime_type}'"
        )))
    }
}

/// The portrait returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "result image should be displayed or downloaded"]
pub struct ResultImage {
    data: Vec<u8>,
}

impl ResultImage {
    /// Decodes the base64 payload of an inline image part.
    pub fn from_base64(payload: &str) -> Result<Self> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| PassportError::Decode(e.to_string()))?;
        if data.is_empty() {
            return Err(PassportError::UnexpectedResponse(
                "image part carried no data".into(),
            ));
        }
        Ok(Self { data })
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a `data:image/png;base64,...` URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            ImageFormat::Png.mime_type(),
            self.to_base64()
        )
    }
}
