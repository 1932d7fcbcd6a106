//! Line-delimited JSON-RPC 2.0 session server.
//!
//! A presentation layer (webview, TUI, script) drives one editor session over
//! stdio. Requests map onto [`SessionController`] events; generations run in a
//! background task and their completion is pushed back as a `session/changed`
//! notification carrying the new [`SessionSnapshot`](crate::SessionSnapshot).

use crate::error::PassportError;
use crate::image::UploadedImage;
use crate::invoker::{FailureReason, Invoker, ProcessingOutcome};
use crate::options::ConfigChange;
use crate::session::SessionController;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
/// The session refused the event in its current phase.
const SESSION_REJECTED: i32 = -32000;

/// Validates that a download directory is safe to write to.
///
/// Rejects paths containing directory traversal (`..`) components.
fn validate_output_dir(path: &str) -> std::result::Result<(), String> {
    let path = Path::new(path);
    for component in path.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err("Path must not contain '..' components".into());
        }
    }
    Ok(())
}

fn error_code(err: &PassportError) -> i32 {
    match err {
        PassportError::Busy => SESSION_REJECTED,
        PassportError::InvalidRequest(_)
        | PassportError::InvalidImage(_)
        | PassportError::UnsupportedOption(_)
        | PassportError::Decode(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    }
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

/// JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification {
    jsonrpc: &'static str,
    method: &'static str,
    params: Value,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    fn from_error(id: Value, err: &PassportError) -> Self {
        Self::error(id, error_code(err), err.to_string())
    }
}

/// `image/select` parameters: exactly one source.
#[derive(Debug, Deserialize)]
struct SelectImageParams {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    data_uri: Option<String>,
}

/// `download` parameters.
#[derive(Debug, Default, Deserialize)]
struct DownloadParams {
    #[serde(default)]
    dir: Option<String>,
}

/// Serves one editor session over a line-delimited JSON-RPC channel.
pub struct SessionServer {
    session: SessionController,
    invoker: Invoker,
    download_dir: PathBuf,
    initialized: bool,
    outcome_tx: mpsc::UnboundedSender<(u64, ProcessingOutcome)>,
    outcome_rx: mpsc::UnboundedReceiver<(u64, ProcessingOutcome)>,
}

impl SessionServer {
    /// Creates a server around a session. Downloads go to the current
    /// directory unless a request names another.
    pub fn new(session: SessionController, invoker: Invoker) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            session,
            invoker,
            download_dir: PathBuf::from("."),
            initialized: false,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Sets the default download directory.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Read-only access to the served session.
    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Runs on stdin/stdout until stdin closes.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run_with(stdin, stdout).await
    }

    /// Runs on arbitrary streams until input closes and no generation is in
    /// flight.
    pub async fn run_with<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                line = lines.next_line(), if input_open => {
                    match line? {
                        Some(line) if line.trim().is_empty() => {}
                        Some(line) => {
                            if let Some(resp) = self.handle_message(&line) {
                                write_json(&mut writer, &resp).await?;
                            }
                        }
                        None => input_open = false,
                    }
                }
                Some((id, outcome)) = self.outcome_rx.recv() => {
                    if let Some(notification) = self.apply_outcome(id, outcome) {
                        write_json(&mut writer, &notification).await?;
                    }
                }
            }

            if !input_open && !self.session.state().is_processing {
                break;
            }
        }

        Ok(())
    }

    /// Waits for the next generation outcome and applies it.
    pub async fn next_outcome(&mut self) -> Option<JsonRpcNotification> {
        let (id, outcome) = self.outcome_rx.recv().await?;
        self.apply_outcome(id, outcome)
    }

    fn apply_outcome(&mut self, id: u64, outcome: ProcessingOutcome) -> Option<JsonRpcNotification> {
        if !self.session.complete_generation(id, outcome) {
            return None;
        }
        Some(self.changed_notification())
    }

    fn changed_notification(&self) -> JsonRpcNotification {
        JsonRpcNotification {
            jsonrpc: "2.0",
            method: "session/changed",
            params: self.snapshot_value(),
        }
    }

    fn snapshot_value(&self) -> Value {
        serde_json::to_value(self.session.snapshot()).unwrap_or(Value::Null)
    }

    /// Handles one request line. Notifications yield `None`.
    pub fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "Invalid JSON-RPC version",
            ));
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        tracing::debug!(method = %request.method, "session request");

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(id)),
            "initialized" => None,
            "ping" => Some(JsonRpcResponse::success(id, json!({}))),
            "catalog" => Some(self.handle_catalog(id)),
            "session/state" => Some(JsonRpcResponse::success(id, self.snapshot_value())),
            "image/select" => Some(self.handle_select_image(id, request.params)),
            "config/update" => Some(self.handle_config_update(id, request.params)),
            "generate" => Some(self.handle_generate(id)),
            "download" => Some(self.handle_download(id, request.params)),
            _ => Some(JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        }
    }

    fn handle_initialize(&mut self, id: Value) -> JsonRpcResponse {
        self.initialized = true;
        JsonRpcResponse::success(
            id,
            json!({
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                },
                "editor": self.invoker.editor_name(),
                "catalog": self.session.catalog(),
                "state": self.snapshot_value(),
            }),
        )
    }

    fn handle_catalog(&self, id: Value) -> JsonRpcResponse {
        match serde_json::to_value(self.session.catalog()) {
            Ok(catalog) => JsonRpcResponse::success(id, catalog),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    fn handle_select_image(&mut self, id: Value, params: Value) -> JsonRpcResponse {
        let params: SelectImageParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid parameters: {}", e));
            }
        };

        let image = match (params.path, params.data_uri) {
            (Some(path), None) => UploadedImage::from_path(&path),
            (None, Some(uri)) => UploadedImage::from_data_uri(&uri),
            _ => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    "Provide exactly one of 'path' or 'data_uri'",
                );
            }
        };

        match image.and_then(|image| self.session.select_image(image)) {
            Ok(()) => JsonRpcResponse::success(id, self.snapshot_value()),
            Err(e) => JsonRpcResponse::from_error(id, &e),
        }
    }

    fn handle_config_update(&mut self, id: Value, params: Value) -> JsonRpcResponse {
        let change: ConfigChange = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid parameters: {}", e));
            }
        };

        match self.session.apply(change) {
            Ok(()) => JsonRpcResponse::success(id, self.snapshot_value()),
            Err(e) => JsonRpcResponse::from_error(id, &e),
        }
    }

    fn handle_generate(&mut self, id: Value) -> JsonRpcResponse {
        let accepted = match self.session.begin_generation() {
            Some(job) => {
                let invoker = self.invoker.clone();
                let tx = self.outcome_tx.clone();
                tokio::spawn(async move {
                    let id = job.id;
                    let task = tokio::spawn(async move { job.run(&invoker).await });
                    // A panicking editor still has to release the session
                    let outcome = task.await.unwrap_or_else(|e| {
                        tracing::error!(error = %e, "generation task aborted");
                        ProcessingOutcome::Failure(FailureReason {
                            kind: "internal",
                            message: e.to_string(),
                        })
                    });
                    // Receiver lives as long as the server
                    let _ = tx.send((id, outcome));
                });
                true
            }
            None => false,
        };

        JsonRpcResponse::success(
            id,
            json!({
                "accepted": accepted,
                "state": self.snapshot_value(),
            }),
        )
    }

    fn handle_download(&mut self, id: Value, params: Value) -> JsonRpcResponse {
        let params: DownloadParams = if params.is_null() {
            DownloadParams::default()
        } else {
            match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid parameters: {}", e),
                    );
                }
            }
        };

        let dir = match params.dir {
            Some(dir) => {
                if let Err(msg) = validate_output_dir(&dir) {
                    return JsonRpcResponse::error(id, INVALID_PARAMS, msg);
                }
                PathBuf::from(dir)
            }
            None => self.download_dir.clone(),
        };

        let Some(download) = self.session.download() else {
            return JsonRpcResponse::error(id, SESSION_REJECTED, "No result to download");
        };

        match download.save_in(&dir) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "result downloaded");
                JsonRpcResponse::success(
                    id,
                    json!({
                        "path": path.display().to_string(),
                        "file_name": download.file_name,
                        "mime_type": download.mime_type,
                        "size_bytes": download.data.len(),
                    }),
                )
            }
            Err(e) => JsonRpcResponse::from_error(id, &e),
        }
    }
}

async fn write_json<W, T>(writer: &mut W, value: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(value).unwrap_or_else(|e| {
        json!({"jsonrpc": "2.0", "id": null, "error": {"code": INTERNAL_ERROR, "message": e.to_string()}}).to_string()
    });
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
