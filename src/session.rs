//! Editor session controller.
//!
//! [`SessionController`] owns the only mutable editor state. Presentation
//! layers send it events (image selection, configuration changes, generate
//! triggers) and read [`SessionSnapshot`]s back. A generation is split into
//! [`SessionController::begin_generation`] and
//! [`SessionController::complete_generation`] so a caller can keep handling
//! events while the remote call is in flight; the guard in `begin_generation`
//! ensures at most one request per session.

use crate::error::{PassportError, Result};
use crate::image::{ImageFormat, ResultImage, UploadedImage};
use crate::invoker::{Invoker, ProcessingOutcome};
use crate::options::{ConfigChange, EditingConfiguration, OptionCatalog};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default product name used in download file names.
pub const DEFAULT_PRODUCT_NAME: &str = "Passport_Photo";

/// Language of user-facing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    /// English (`en`).
    #[default]
    #[serde(rename = "en")]
    English,
    /// Bengali (`bn`).
    #[serde(rename = "bn")]
    Bengali,
}

impl Locale {
    /// Parses a language tag such as `en`, `bn` or `bn-BD`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" | "english" => Some(Self::English),
            "bn" | "bengali" | "bangla" => Some(Self::Bengali),
            _ => None,
        }
    }

    /// Message shown when a generation attempt fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::English => "Processing failed. Please try again.",
            Self::Bengali => "প্রসেসিং ব্যর্থ হয়েছে। দয়া করে আবার চেষ্টা করুন।",
        }
    }
}

/// Observable phase of the session, derived from its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No image selected.
    Idle,
    /// Image selected, nothing generated yet.
    Ready,
    /// A generation is in flight.
    Processing,
    /// A result is available.
    Done,
    /// The last generation failed.
    Failed,
}

/// The aggregate owned by the controller.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Source photo.
    pub original_image: Option<UploadedImage>,
    /// Latest result.
    pub processed_image: Option<ResultImage>,
    /// True while a generation is in flight.
    pub is_processing: bool,
    /// Localized failure message of the last attempt.
    pub error: Option<String>,
    /// Current editing intent.
    pub config: EditingConfiguration,
}

/// Everything a generation task needs, detached from the session.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    /// Identifies the attempt when its outcome comes back.
    pub id: u64,
    /// Source photo at trigger time.
    pub image: UploadedImage,
    /// Configuration at trigger time.
    pub config: EditingConfiguration,
}

impl GenerationJob {
    /// Runs the job against an invoker.
    pub async fn run(&self, invoker: &Invoker) -> ProcessingOutcome {
        invoker.generate(&self.image, &self.config).await
    }
}

/// A client-side save of the current result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// `<product>_<millis>.png`.
    pub file_name: String,
    /// Always `image/png`.
    pub mime_type: &'static str,
    /// Image bytes.
    pub data: Vec<u8>,
}

impl Download {
    /// Writes the file into `dir` and returns its path.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.data)?;
        Ok(path)
    }
}

/// Serializable view of the session for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// True while a generation is in flight.
    pub is_processing: bool,
    /// True once a source photo is selected.
    pub has_original: bool,
    /// MIME type of the source photo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_mime_type: Option<String>,
    /// Result as a `data:image/png;base64,...` URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_image: Option<String>,
    /// Localized failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Current editing intent.
    pub config: EditingConfiguration,
}

/// Owns and mutates the editor state.
#[derive(Debug, Clone)]
pub struct SessionController {
    state: SessionState,
    catalog: OptionCatalog,
    locale: Locale,
    product_name: String,
    generation: u64,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(OptionCatalog::default())
    }
}

impl SessionController {
    /// Creates an idle session offering the given options.
    pub fn new(catalog: OptionCatalog) -> Self {
        Self {
            state: SessionState::default(),
            catalog,
            locale: Locale::default(),
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            generation: 0,
        }
    }

    /// Sets the language of failure messages.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Sets the prefix of download file names.
    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = name.into();
        self
    }

    /// Read-only access to the state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The options this session offers.
    pub fn catalog(&self) -> &OptionCatalog {
        &self.catalog
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        let state = &self.state;
        if state.is_processing {
            SessionPhase::Processing
        } else if state.error.is_some() {
            SessionPhase::Failed
        } else if state.processed_image.is_some() {
            SessionPhase::Done
        } else if state.original_image.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Idle
        }
    }

    /// Replaces the source photo, discarding any result or error.
    pub fn select_image(&mut self, image: UploadedImage) -> Result<()> {
        if self.state.is_processing {
            return Err(PassportError::Busy);
        }
        tracing::debug!(mime_type = image.mime_type(), "image selected");
        self.state.original_image = Some(image);
        self.state.processed_image = None;
        self.state.error = None;
        Ok(())
    }

    /// Applies a configuration change.
    pub fn apply(&mut self, change: ConfigChange) -> Result<()> {
        if self.state.is_processing {
            return Err(PassportError::Busy);
        }
        self.catalog.validate(&change)?;
        tracing::debug!(?change, "configuration changed");
        self.state.config.apply(change);
        Ok(())
    }

    /// Enters `Processing` and hands out the job to run.
    ///
    /// Returns `None` without touching the state when no image is selected or
    /// a generation is already in flight.
    pub fn begin_generation(&mut self) -> Option<GenerationJob> {
        if self.state.is_processing {
            tracing::debug!("generate ignored: already processing");
            return None;
        }
        let image = match &self.state.original_image {
            Some(image) => image.clone(),
            None => {
                tracing::debug!("generate ignored: no image selected");
                return None;
            }
        };

        self.generation += 1;
        self.state.is_processing = true;
        self.state.error = None;
        self.state.processed_image = None;

        Some(GenerationJob {
            id: self.generation,
            image,
            config: self.state.config.clone(),
        })
    }

    /// Records the outcome of job `id`. Returns false if the outcome does not
    /// belong to the in-flight generation and was ignored.
    pub fn complete_generation(&mut self, id: u64, outcome: ProcessingOutcome) -> bool {
        if !self.state.is_processing || id != self.generation {
            tracing::warn!(id, current = self.generation, "dropping stale generation outcome");
            return false;
        }

        self.state.is_processing = false;
        match outcome {
            ProcessingOutcome::Success(image) => {
                self.state.processed_image = Some(image);
                self.state.error = None;
            }
            ProcessingOutcome::Failure(reason) => {
                tracing::warn!(kind = reason.kind, "generation {id} failed: {}", reason.message);
                self.state.processed_image = None;
                self.state.error = Some(self.locale.failure_message().to_string());
            }
        }
        true
    }

    /// Runs one generation to completion. Returns false if the trigger was
    /// ignored.
    pub async fn generate(&mut self, invoker: &Invoker) -> bool {
        let Some(job) = self.begin_generation() else {
            return false;
        };
        let outcome = job.run(invoker).await;
        self.complete_generation(job.id, outcome)
    }

    /// Prepares a download of the current result, if any.
    pub fn download(&self) -> Option<Download> {
        self.download_at(chrono::Utc::now().timestamp_millis())
    }

    /// Like [`SessionController::download`] with an explicit timestamp.
    pub fn download_at(&self, timestamp_millis: i64) -> Option<Download> {
        let image = self.state.processed_image.as_ref()?;
        Some(Download {
            file_name: format!(
                "{}_{}.{}",
                self.product_name,
                timestamp_millis,
                ImageFormat::Png.extension()
            ),
            mime_type: ImageFormat::Png.mime_type(),
            data: image.data().to_vec(),
        })
    }

    /// Serializable view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = &self.state;
        SessionSnapshot {
            phase: self.phase(),
            is_processing: state.is_processing,
            has_original: state.original_image.is_some(),
            original_mime_type: state
                .original_image
                .as_ref()
                .map(|i| i.mime_type().to_string()),
            processed_image: state.processed_image.as_ref().map(|i| i.to_data_url()),
            error: state.error.clone(),
            config: state.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::FailureReason;
    use crate::options::{AttireSelection, HexColor, LightingMode};

    fn upload() -> UploadedImage {
        UploadedImage::from_data_uri("data:image/jpeg;base64,/9j/4AAQSkZJRg==").unwrap()
    }

    fn success() -> ProcessingOutcome {
        ProcessingOutcome::Success(ResultImage::from_base64("iVBORw0KGgo=").unwrap())
    }

    fn failure() -> ProcessingOutcome {
        ProcessingOutcome::Failure(FailureReason {
            kind: "network",
            message: "connection reset".into(),
        })
    }

    #[test]
    fn test_starts_idle() {
        let session = SessionController::default();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.state().config, EditingConfiguration::default());
    }

    #[test]
    fn test_generate_without_image_is_noop() {
        let mut session = SessionController::default();
        assert!(session.begin_generation().is_none());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.state().is_processing);
    }

    #[test]
    fn test_second_trigger_while_processing_is_noop() {
        let mut session = SessionController::default();
        session.select_image(upload()).unwrap();
        let job = session.begin_generation().unwrap();
        assert_eq!(session.phase(), SessionPhase::Processing);

        assert!(session.begin_generation().is_none());
        assert!(session.complete_generation(job.id, success()));
        assert_eq!(session.phase(), SessionPhase::Done);
    }

    #[test]
    fn test_success_sets_result_and_clears_error() {
        let mut session = SessionController::default();
        session.select_image(upload()).unwrap();

        let job = session.begin_generation().unwrap();
        session.complete_generation(job.id, failure());
        assert_eq!(session.phase(), SessionPhase::Failed);

        let job = session.begin_generation().unwrap();
        assert!(session.state().error.is_none());
        session.complete_generation(job.id, success());

        assert_eq!(session.phase(), SessionPhase::Done);
        assert!(session.state().error.is_none());
        assert_eq!(
            session.snapshot().processed_image.as_deref(),
            Some("data:image/png;base64,iVBORw0KGgo=")
        );
    }

    #[test]
    fn test_failure_never_leaves_stale_result() {
        let mut session = SessionController::default().with_locale(Locale::Bengali);
        session.select_image(upload()).unwrap();

        let job = session.begin_generation().unwrap();
        session.complete_generation(job.id, success());
        assert!(session.state().processed_image.is_some());

        let job = session.begin_generation().unwrap();
        assert!(session.state().processed_image.is_none());
        session.complete_generation(job.id, failure());

        assert_eq!(session.phase(), SessionPhase::Failed);
        assert!(session.state().processed_image.is_none());
        assert!(!session.state().is_processing);
        assert_eq!(
            session.state().error.as_deref(),
            Some(Locale::Bengali.failure_message())
        );
    }

    #[test]
    fn test_reselect_returns_to_ready() {
        let mut session = SessionController::default();
        session.select_image(upload()).unwrap();
        let job = session.begin_generation().unwrap();
        session.complete_generation(job.id, failure());
        assert_eq!(session.phase(), SessionPhase::Failed);

        session.select_image(upload()).unwrap();
        assert_eq!(session.phase(), SessionPhase::Ready);

        let job = session.begin_generation().unwrap();
        session.complete_generation(job.id, success());
        session.select_image(upload()).unwrap();
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert!(session.state().processed_image.is_none());
    }

    #[test]
    fn test_events_rejected_while_processing() {
        let mut session = SessionController::default();
        session.select_image(upload()).unwrap();
        let job = session.begin_generation().unwrap();

        assert!(matches!(
            session.apply(ConfigChange::EnhanceFace(false)),
            Err(PassportError::Busy)
        ));
        assert!(matches!(
            session.select_image(upload()),
            Err(PassportError::Busy)
        ));
        assert!(session.state().config.enhance_face);
        assert_eq!(job.config, EditingConfiguration::default());
    }

    #[test]
    fn test_config_changes_are_pure_mutation() {
        let mut session = SessionController::default();
        session
            .apply(ConfigChange::BackgroundColor(HexColor::parse("#bae6fd").unwrap()))
            .unwrap();
        session
            .apply(ConfigChange::Attire(AttireSelection::FormalSuit))
            .unwrap();
        session
            .apply(ConfigChange::Lighting(LightingMode::Bright))
            .unwrap();

        assert_eq!(session.phase(), SessionPhase::Idle);
        let config = &session.state().config;
        assert_eq!(config.background_color.as_str(), "#BAE6FD");
        assert_eq!(config.attire, AttireSelection::FormalSuit);
        assert_eq!(config.lighting, LightingMode::Bright);
    }

    #[test]
    fn test_catalog_restricts_options() {
        let mut session = SessionController::new(OptionCatalog::core());
        assert!(matches!(
            session.apply(ConfigChange::Lighting(LightingMode::AutoFix)),
            Err(PassportError::UnsupportedOption(_))
        ));
        assert_eq!(session.state().config.lighting, LightingMode::Studio);
    }

    #[test]
    fn test_stale_outcome_is_ignored() {
        let mut session = SessionController::default();
        session.select_image(upload()).unwrap();
        let first = session.begin_generation().unwrap();
        assert!(session.complete_generation(first.id, failure()));

        let second = session.begin_generation().unwrap();
        assert!(!session.complete_generation(first.id, success()));
        assert_eq!(session.phase(), SessionPhase::Processing);
        assert!(session.complete_generation(second.id, success()));
    }

    #[test]
    fn test_download_requires_result() {
        let mut session = SessionController::default().with_product_name("BD_Passport");
        assert!(session.download().is_none());

        session.select_image(upload()).unwrap();
        let job = session.begin_generation().unwrap();
        session.complete_generation(job.id, success());

        let download = session.download_at(1_700_000_000_000).unwrap();
        assert_eq!(download.file_name, "BD_Passport_1700000000000.png");
        assert_eq!(download.mime_type, "image/png");
        assert_eq!(download.data.len(), 8);

        let dir = tempfile::tempdir().unwrap();
        let path = download.save_in(dir.path()).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), download.data);
        assert_eq!(session.phase(), SessionPhase::Done);
    }

    #[test]
    fn test_locale_tags() {
        assert_eq!(Locale::from_tag("bn-BD"), Some(Locale::Bengali));
        assert_eq!(Locale::from_tag("EN"), Some(Locale::English));
        assert_eq!(Locale::from_tag("fr"), None);
    }
}
