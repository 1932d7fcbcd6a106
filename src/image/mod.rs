//! Image types and the remote editing capability.

mod provider;
pub mod providers;
mod types;

pub use provider::{EditRequest, EditedImage, ImageEditor, InlineImage};
pub use types::{AspectRatio, ImageFormat, ResultImage, UploadedImage};
