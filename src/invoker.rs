//! Sends one edit request per generation attempt and folds the result into a
//! [`ProcessingOutcome`].

use crate::error::{PassportError, Result};
use crate::image::{AspectRatio, EditRequest, ImageEditor, InlineImage, ResultImage, UploadedImage};
use crate::instruction::InstructionBuilder;
use crate::options::EditingConfiguration;
use std::sync::Arc;
use std::time::Instant;

/// Why a generation attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    /// Machine-readable error kind (see [`PassportError::kind`]).
    pub kind: &'static str,
    /// Diagnostic message for logs and operators.
    pub message: String,
}

impl From<&PassportError> for FailureReason {
    fn from(err: &PassportError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// The single result of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The model returned an image.
    Success(ResultImage),
    /// The attempt failed; nothing was applied.
    Failure(FailureReason),
}

impl ProcessingOutcome {
    /// Returns true for [`ProcessingOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Builds instructions and calls the remote editor.
#[derive(Clone)]
pub struct Invoker {
    editor: Arc<dyn ImageEditor>,
    instructions: InstructionBuilder,
    aspect_ratio: AspectRatio,
}

impl Invoker {
    /// Creates an invoker around an editor, using the default template and a
    /// 3:4 output.
    pub fn new(editor: Arc<dyn ImageEditor>) -> Self {
        Self {
            editor,
            instructions: InstructionBuilder::default(),
            aspect_ratio: AspectRatio::Passport,
        }
    }

    /// Replaces the instruction template.
    pub fn with_instruction_builder(mut self, instructions: InstructionBuilder) -> Self {
        self.instructions = instructions;
        self
    }

    /// Returns the editor's display name.
    pub fn editor_name(&self) -> &str {
        self.editor.name()
    }

    /// Assembles the request that [`Invoker::generate`] would send.
    pub fn request_for(&self, image: &UploadedImage, config: &EditingConfiguration) -> EditRequest {
        EditRequest {
            instruction: self.instructions.build(config).text,
            image: InlineImage::from(image),
            aspect_ratio: self.aspect_ratio,
        }
    }

    /// Sends one request and decodes the returned image.
    pub async fn try_generate(
        &self,
        image: &UploadedImage,
        config: &EditingConfiguration,
    ) -> Result<ResultImage> {
        let request = self.request_for(image, config);
        let edited = self.editor.edit(&request).await?;
        ResultImage::from_base64(&edited.data)
    }

    /// Sends one request; every failure becomes [`ProcessingOutcome::Failure`].
    pub async fn generate(
        &self,
        image: &UploadedImage,
        config: &EditingConfiguration,
    ) -> ProcessingOutcome {
        let start = Instant::now();
        match self.try_generate(image, config).await {
            Ok(result) => {
                tracing::info!(
                    editor = self.editor.name(),
                    size_bytes = result.size(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "generation succeeded"
                );
                ProcessingOutcome::Success(result)
            }
            Err(e) => {
                tracing::error!(
                    editor = self.editor.name(),
                    kind = e.kind(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "generation failed: {e}"
                );
                ProcessingOutcome::Failure(FailureReason::from(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::EditedImage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingEditor {
        response: std::result::Result<&'static str, &'static str>,
        requests: Mutex<Vec<EditRequest>>,
    }

    #[async_trait]
    impl ImageEditor for RecordingEditor {
        async fn edit(&self, request: &EditRequest) -> Result<EditedImage> {
            self.requests.lock().unwrap().push(request.clone());
            match self.response {
                Ok(data) => Ok(EditedImage {
                    data: data.into(),
                    mime_type: Some("image/png".into()),
                }),
                Err(msg) => Err(PassportError::UnexpectedResponse(msg.into())),
            }
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn upload() -> UploadedImage {
        UploadedImage::from_data_uri("data:image/jpeg;base64,/9j/4AAQSkZJRg==").unwrap()
    }

    #[tokio::test]
    async fn test_request_strips_data_uri_prefix() {
        let editor = Arc::new(RecordingEditor {
            response: Ok("iVBORw0KGgo="),
            requests: Mutex::new(Vec::new()),
        });
        let invoker = Invoker::new(editor.clone());

        let outcome = invoker
            .generate(&upload(), &EditingConfiguration::default())
            .await;
        assert!(outcome.is_success());

        let requests = editor.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].image.data, "/9j/4AAQSkZJRg==");
        assert_eq!(requests[0].image.mime_type, "image/jpeg");
        assert_eq!(requests[0].aspect_ratio, AspectRatio::Passport);
        assert!(requests[0].instruction.contains("solid #FFFFFF"));
    }

    #[tokio::test]
    async fn test_success_wraps_png_data_url() {
        let invoker = Invoker::new(Arc::new(RecordingEditor {
            response: Ok("iVBORw0KGgo="),
            requests: Mutex::new(Vec::new()),
        }));
        match invoker
            .generate(&upload(), &EditingConfiguration::default())
            .await
        {
            ProcessingOutcome::Success(image) => {
                assert_eq!(image.to_data_url(), "data:image/png;base64,iVBORw0KGgo=")
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_editor_error_becomes_failure() {
        let invoker = Invoker::new(Arc::new(RecordingEditor {
            response: Err("AI did not return an image"),
            requests: Mutex::new(Vec::new()),
        }));
        match invoker
            .generate(&upload(), &EditingConfiguration::default())
            .await
        {
            ProcessingOutcome::Failure(reason) => {
                assert_eq!(reason.kind, "unexpected_response");
                assert!(reason.message.contains("AI did not return an image"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_failure() {
        let invoker = Invoker::new(Arc::new(RecordingEditor {
            response: Ok("%%%"),
            requests: Mutex::new(Vec::new()),
        }));
        let outcome = invoker
            .generate(&upload(), &EditingConfiguration::default())
            .await;
        assert!(matches!(
            outcome,
            ProcessingOutcome::Failure(FailureReason { kind: "decode", .. })
        ));
    }
}
