#![warn(missing_docs)]
//! Passport photo editor backed by Gemini image models.
//!
//! The crate turns a portrait plus a handful of cosmetic choices (background
//! color, attire, face and skin touch-ups, lighting) into a single edit request
//! for a generative image model, and tracks the editing session around it.
//!
//! # Quick Start
//!
//! ```no_run
//! use passport_photo::{ConfigChange, AttireSelection, Settings, UploadedImage};
//!
//! #[tokio::main]
//! async fn main() -> passport_photo::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let invoker = settings.invoker()?;
//!     let mut session = settings.session();
//!
//!     session.select_image(UploadedImage::from_path("me.jpg")?)?;
//!     session.apply(ConfigChange::Attire(AttireSelection::FormalSuit))?;
//!     session.generate(&invoker).await;
//!
//!     if let Some(download) = session.download() {
//!         download.save_in(".")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! - [`options`]: selectable options and the default configuration
//! - [`instruction`]: deterministic instruction rendering
//! - [`image`]: image types, the [`ImageEditor`] trait and the Gemini provider
//! - [`invoker`]: one request per attempt, folded into a [`ProcessingOutcome`]
//! - [`session`]: the session state machine
//! - [`server`]: JSON-RPC session server for presentation layers
//! - [`settings`]: environment configuration

mod error;

pub mod image;
pub mod instruction;
pub mod invoker;
pub mod options;
pub mod server;
pub mod session;
pub mod settings;

#[cfg(feature = "cli")]
#[doc(hidden)]
pub mod logging;

// Re-export error types at crate root
pub use error::{PassportError, Result};

pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
pub use image::{
    AspectRatio, EditRequest, EditedImage, ImageEditor, ImageFormat, InlineImage, ResultImage,
    UploadedImage,
};
pub use instruction::{Directive, Instruction, InstructionBuilder};
pub use invoker::{FailureReason, Invoker, ProcessingOutcome};
pub use options::{
    AttireSelection, BackgroundPreset, ConfigChange, EditingConfiguration, HexColor,
    LightingMode, OptionCatalog,
};
pub use server::SessionServer;
pub use session::{
    Download, GenerationJob, Locale, SessionController, SessionPhase, SessionSnapshot,
    SessionState,
};
pub use settings::Settings;
