//! Per-file upload state machine.
//!
//! Each task runs as its own future with an abort handle:
//!
//! ```text
//! Queued → Validating → Uploading → Completed
//!                ↓           ↓
//!              Failed     Failed | Canceled ──retry──→ Uploading
//! ```
//!
//! Consumers observe the pipeline by polling [`UploadPipeline::snapshot`] and
//! [`UploadPipeline::drain_events`].

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::rc::Rc;

use chrono::Utc;
use futures_util::future::{AbortHandle, Abortable, Aborted, LocalBoxFuture};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{TransferMode, UploadConfig, upload as wire};
use crate::core::error::{UploadError, UploadErrorKind};
use crate::models::{
    Metadata, SignedUploadRecord, TaskId, UploadFile, UploadResult, UploadState, UploadTask,
};
use crate::utils::format::{file_extension, format_size};

// =============================================================================
// Validation
// =============================================================================

/// Answer of a pre-upload check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl ValidationOutcome {
    pub fn accept() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Externally supplied pre-upload check.
///
/// Plain closures `Fn(&UploadFile, &Metadata) -> ValidationOutcome` are
/// validators too.
pub trait UploadValidator {
    fn check<'a>(
        &'a self,
        file: &'a UploadFile,
        metadata: &'a Metadata,
    ) -> LocalBoxFuture<'a, ValidationOutcome>;
}

impl<F> UploadValidator for F
where
    F: Fn(&UploadFile, &Metadata) -> ValidationOutcome,
{
    fn check<'a>(
        &'a self,
        file: &'a UploadFile,
        metadata: &'a Metadata,
    ) -> LocalBoxFuture<'a, ValidationOutcome> {
        Box::pin(futures_util::future::ready(self(file, metadata)))
    }
}

// =============================================================================
// Transport
// =============================================================================

/// HTTP method of a transfer request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// Payload of a transfer request.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferBody {
    /// Form fields followed by the file part
    Multipart { fields: Metadata, file: UploadFile },
    /// Raw file bytes
    Raw(UploadFile),
}

/// A file transfer handed to the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: TransferBody,
}

/// Response received from the server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn into_error(self, kind: UploadErrorKind, message: &str) -> UploadError {
        UploadError::new(kind, message).with_response(self.status, self.status_text, self.body)
    }
}

/// Bytes sent so far and total bytes.
pub type ProgressFn = Rc<dyn Fn(u64, u64)>;

/// Network side of the pipeline.
///
/// Errors are reserved for requests that produced no response; HTTP error
/// statuses come back as ordinary responses.
pub trait UploadTransport {
    /// `POST` a JSON body.
    fn request_json(
        &self,
        url: &str,
        body: &Value,
    ) -> impl Future<Output = Result<HttpResponse, UploadError>>;

    /// Send a file, reporting progress while bytes go out.
    ///
    /// Dropping the returned future must abort the request.
    fn send(
        &self,
        request: TransferRequest,
        progress: ProgressFn,
    ) -> impl Future<Output = Result<HttpResponse, UploadError>>;
}

// =============================================================================
// Pipeline
// =============================================================================

/// Reported when a task reaches a terminal state.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadEvent {
    Completed {
        id: TaskId,
        result: UploadResult,
        destination: String,
    },
    Failed {
        id: TaskId,
        error: UploadError,
    },
    /// Carries an error of kind [`UploadErrorKind::Canceled`]
    Canceled {
        id: TaskId,
        error: UploadError,
    },
}

impl UploadEvent {
    pub fn id(&self) -> TaskId {
        match self {
            Self::Completed { id, .. } | Self::Failed { id, .. } | Self::Canceled { id, .. } => {
                *id
            }
        }
    }
}

struct TaskSlot {
    task: UploadTask,
    /// Bumped whenever a run starts or is canceled; stale runs compare unequal
    attempt: u64,
    abort: Option<AbortHandle>,
}

#[derive(Default)]
struct PipelineState {
    next_id: u64,
    slots: Vec<TaskSlot>,
    events: VecDeque<UploadEvent>,
}

/// Queue of upload tasks sharing one configuration and transport.
///
/// Cloning is cheap and yields a handle to the same task table.
pub struct UploadPipeline<T> {
    config: Rc<UploadConfig>,
    transport: Rc<T>,
    state: Rc<RefCell<PipelineState>>,
}

impl<T> Clone for UploadPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            config: Rc::clone(&self.config),
            transport: Rc::clone(&self.transport),
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: UploadTransport> UploadPipeline<T> {
    pub fn new(config: UploadConfig, transport: T) -> Self {
        Self {
            config: Rc::new(config),
            transport: Rc::new(transport),
            state: Rc::new(RefCell::new(PipelineState::default())),
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Run `f` on the slot of `id`. The borrow ends before this returns.
    fn with_slot<R>(&self, id: TaskId, f: impl FnOnce(&mut TaskSlot) -> R) -> Option<R> {
        let mut state = self.state.borrow_mut();
        state.slots.iter_mut().find(|s| s.task.id == id).map(f)
    }

    fn push_event(&self, event: UploadEvent) {
        self.state.borrow_mut().events.push_back(event);
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Queue `file` for upload into `destination`.
    pub fn enqueue(
        &self,
        file: UploadFile,
        metadata: Metadata,
        destination: impl Into<String>,
    ) -> TaskId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = TaskId(state.next_id);
        log::debug!("Queued upload {} ({})", id, file.name);
        state.slots.push(TaskSlot {
            task: UploadTask {
                id,
                file,
                metadata,
                destination: destination.into(),
                progress: 0,
                state: UploadState::Queued,
                error: None,
                validated: false,
            },
            attempt: 0,
            abort: None,
        });
        id
    }

    pub fn task(&self, id: TaskId) -> Option<UploadTask> {
        self.with_slot(id, |slot| slot.task.clone())
    }

    /// All tasks in queue order.
    pub fn snapshot(&self) -> Vec<UploadTask> {
        self.state
            .borrow()
            .slots
            .iter()
            .map(|slot| slot.task.clone())
            .collect()
    }

    /// True while any task is validating or uploading.
    pub fn is_uploading(&self) -> bool {
        self.state
            .borrow()
            .slots
            .iter()
            .any(|slot| slot.task.state.is_active())
    }

    /// Take all terminal events reported since the last call.
    pub fn drain_events(&self) -> Vec<UploadEvent> {
        self.state.borrow_mut().events.drain(..).collect()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Drive a queued task to a terminal state.
    pub async fn run(&self, id: TaskId) {
        if let Some(attempt) = self.begin(id, |state| state == UploadState::Queued) {
            self.drive(id, attempt).await;
        }
    }

    /// Retry a failed or canceled task.
    ///
    /// Progress and error are reset. Validation is skipped once it has
    /// passed.
    pub async fn retry(&self, id: TaskId) {
        if let Some(attempt) = self.begin(id, UploadState::can_retry) {
            self.drive(id, attempt).await;
        }
    }

    /// Abort an active task. Returns `false` if it was not active.
    pub fn cancel(&self, id: TaskId) -> bool {
        let canceled = self
            .with_slot(id, |slot| {
                if !slot.task.state.is_active() {
                    return false;
                }
                slot.attempt += 1;
                if let Some(handle) = slot.abort.take() {
                    handle.abort();
                }
                slot.task.state = UploadState::Canceled;
                slot.task.progress = 0;
                slot.task.error = Some(UploadError::canceled());
                true
            })
            .unwrap_or(false);

        if canceled {
            log::debug!("Canceled upload {}", id);
            self.push_event(UploadEvent::Canceled {
                id,
                error: UploadError::canceled(),
            });
        }
        canceled
    }

    /// Remove a task, aborting it first if it is in flight.
    pub fn remove(&self, id: TaskId) -> Option<UploadTask> {
        let mut state = self.state.borrow_mut();
        let idx = state.slots.iter().position(|s| s.task.id == id)?;
        let slot = state.slots.remove(idx);
        if let Some(handle) = slot.abort {
            handle.abort();
        }
        log::debug!("Removed upload {}", id);
        Some(slot.task)
    }

    /// Start a new attempt if `runnable` accepts the task's state.
    fn begin(&self, id: TaskId, runnable: impl FnOnce(UploadState) -> bool) -> Option<u64> {
        self.with_slot(id, |slot| {
            if !runnable(slot.task.state) {
                log::debug!("Upload {} is {:?}; not starting", id, slot.task.state);
                return None;
            }
            slot.attempt += 1;
            slot.task.progress = 0;
            slot.task.error = None;
            slot.task.state = if slot.task.validated {
                UploadState::Uploading
            } else {
                UploadState::Validating
            };
            Some(slot.attempt)
        })
        .flatten()
    }

    async fn drive(&self, id: TaskId, attempt: u64) {
        let Some((file, metadata, validated)) = self.with_slot(id, |slot| {
            (
                slot.task.file.clone(),
                slot.task.metadata.clone(),
                slot.task.validated,
            )
        }) else {
            return;
        };

        if !validated {
            if let Err(err) = self.validate(&file, &metadata).await {
                self.fail(id, attempt, err);
                return;
            }
            let current = self.with_slot(id, |slot| {
                if slot.attempt != attempt {
                    return false;
                }
                slot.task.validated = true;
                slot.task.state = UploadState::Uploading;
                true
            });
            if current != Some(true) {
                return;
            }
        }

        let (handle, registration) = AbortHandle::new_pair();
        let armed = self.with_slot(id, |slot| {
            if slot.attempt != attempt {
                return false;
            }
            slot.abort = Some(handle);
            true
        });
        if armed != Some(true) {
            return;
        }

        let progress = self.progress_reporter(id, attempt);
        match Abortable::new(self.transfer(&file, &metadata, progress), registration).await {
            Err(Aborted) => log::debug!("Upload {} aborted", id),
            Ok(Ok(result)) => self.complete(id, attempt, result),
            Ok(Err(err)) => self.fail(id, attempt, err),
        }
    }

    fn progress_reporter(&self, id: TaskId, attempt: u64) -> ProgressFn {
        let state = Rc::downgrade(&self.state);
        Rc::new(move |loaded, total| {
            if total == 0 {
                return;
            }
            let Some(state) = state.upgrade() else {
                return;
            };
            let percent = ((loaded as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0) as u8;
            let mut state = state.borrow_mut();
            if let Some(slot) = state
                .slots
                .iter_mut()
                .find(|s| s.task.id == id && s.attempt == attempt)
                && slot.task.state == UploadState::Uploading
            {
                slot.task.progress = percent;
            }
        })
    }

    fn complete(&self, id: TaskId, attempt: u64, result: UploadResult) {
        let destination = self.with_slot(id, |slot| {
            if slot.attempt != attempt {
                return None;
            }
            slot.abort = None;
            slot.task.state = UploadState::Completed;
            slot.task.progress = 100;
            Some(slot.task.destination.clone())
        });

        match destination.flatten() {
            Some(destination) => {
                log::debug!("Upload {} completed", id);
                self.push_event(UploadEvent::Completed {
                    id,
                    result,
                    destination,
                });
            }
            None => log::warn!("Discarding stale completion of upload {}", id),
        }
    }

    fn fail(&self, id: TaskId, attempt: u64, error: UploadError) {
        let current = self.with_slot(id, |slot| {
            if slot.attempt != attempt {
                return false;
            }
            slot.abort = None;
            slot.task.state = UploadState::Failed;
            slot.task.progress = 0;
            slot.task.error = Some(error.clone());
            true
        });

        if current == Some(true) {
            log::debug!("Upload {} failed: {}", id, error);
            self.push_event(UploadEvent::Failed { id, error });
        } else {
            log::warn!("Discarding stale failure of upload {}", id);
        }
    }

    // =========================================================================
    // Steps
    // =========================================================================

    async fn validate(&self, file: &UploadFile, metadata: &Metadata) -> Result<(), UploadError> {
        if let Some(max) = self.config.max_file_size
            && file.size() > max
        {
            return Err(UploadError::validation(format!(
                "File size exceeds the {} limit.",
                format_size(Some(max), false)
            )));
        }

        let accepted = self.config.accepted_extensions();
        if !accepted.is_empty() && !accepted.contains(&file_extension(&file.name)) {
            return Err(UploadError::validation("File type is not allowed."));
        }

        if let Some(validator) = &self.config.can_upload {
            let outcome = validator.check(file, metadata).await;
            if !outcome.success {
                let message = outcome
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| wire::DEFAULT_ERROR.to_string());
                return Err(UploadError::validation(message));
            }
        }

        Ok(())
    }

    async fn transfer(
        &self,
        file: &UploadFile,
        metadata: &Metadata,
        progress: ProgressFn,
    ) -> Result<UploadResult, UploadError> {
        match self.config.mode() {
            None => Err(UploadError::new(
                UploadErrorKind::TransferFailed,
                "No upload endpoint configured",
            )),
            Some(TransferMode::Direct { url }) => {
                let request = TransferRequest {
                    method: Method::Post,
                    url,
                    headers: self.config.headers.clone(),
                    body: TransferBody::Multipart {
                        fields: metadata.clone(),
                        file: file.clone(),
                    },
                };
                let response = self.transport.send(request, progress).await?;
                if !response.is_success() {
                    return Err(response.into_error(UploadErrorKind::TransferFailed, wire::DEFAULT_ERROR));
                }
                Ok(UploadResult::Direct(response.body))
            }
            Some(TransferMode::SignedUrl { endpoint }) => {
                let url = self.signed_url(&endpoint, file, metadata).await?;

                let mut headers = BTreeMap::new();
                headers.insert(
                    "Content-Type".to_string(),
                    file.content_type_or_default().to_string(),
                );
                headers.extend(self.config.headers.clone());

                let request = TransferRequest {
                    method: Method::Put,
                    url,
                    headers,
                    body: TransferBody::Raw(file.clone()),
                };
                let response = self.transport.send(request, progress).await?;
                if !response.is_success() {
                    return Err(response.into_error(UploadErrorKind::TransferFailed, wire::DEFAULT_ERROR));
                }
                Ok(UploadResult::Signed(SignedUploadRecord {
                    name: file.name.clone(),
                    size: file.size(),
                    content_type: file.content_type.clone(),
                    metadata: metadata.clone(),
                    updated_at: Utc::now(),
                }))
            }
        }
    }

    /// Ask `endpoint` for a short-lived upload URL.
    async fn signed_url(
        &self,
        endpoint: &str,
        file: &UploadFile,
        metadata: &Metadata,
    ) -> Result<String, UploadError> {
        let mut body = Map::new();
        body.insert("fileName".to_string(), Value::from(file.name.as_str()));
        body.insert(
            "contentType".to_string(),
            Value::from(file.content_type.as_str()),
        );
        for (key, value) in metadata {
            body.insert(key.clone(), Value::from(value.as_str()));
        }

        let response = self
            .transport
            .request_json(endpoint, &Value::Object(body))
            .await
            .map_err(|err| UploadError {
                kind: UploadErrorKind::SignedUrlFailed,
                ..err
            })?;
        if !response.is_success() {
            return Err(response.into_error(UploadErrorKind::SignedUrlFailed, wire::SIGNED_URL_ERROR));
        }

        serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|json| json.get(wire::SIGNED_URL_KEY)?.as_str().map(str::to_string))
            .ok_or_else(|| {
                response.into_error(UploadErrorKind::SignedUrlFailed, wire::SIGNED_URL_ERROR)
            })
    }
}

#[cfg(target_arch = "wasm32")]
impl<T: UploadTransport + 'static> UploadPipeline<T> {
    /// Run a queued task on the browser event loop.
    pub fn spawn(&self, id: TaskId) {
        let pipeline = self.clone();
        wasm_bindgen_futures::spawn_local(async move { pipeline.run(id).await });
    }

    /// Retry a task on the browser event loop.
    pub fn spawn_retry(&self, id: TaskId) {
        let pipeline = self.clone();
        wasm_bindgen_futures::spawn_local(async move { pipeline.retry(id).await });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use std::cell::Cell;

    fn file(name: &str, size: usize) -> UploadFile {
        UploadFile::new(name, "text/plain", vec![b'x'; size])
    }

    fn direct_pipeline(transport: MockTransport) -> UploadPipeline<MockTransport> {
        UploadPipeline::new(UploadConfig::direct("https://api.test/upload"), transport)
    }

    // =========================================================================
    // Direct
    // =========================================================================

    #[tokio::test]
    async fn test_direct_upload_completes() {
        let transport = MockTransport::new().respond(200, r#"{"name":"a.txt"}"#);
        let pipeline = direct_pipeline(transport.clone());
        let mut metadata = Metadata::new();
        metadata.insert("folder".to_string(), "/docs".to_string());

        let id = pipeline.enqueue(file("a.txt", 10), metadata, "/docs");
        pipeline.run(id).await;

        let task = pipeline.task(id).unwrap();
        assert_eq!(task.state, UploadState::Completed);
        assert_eq!(task.progress, 100);

        let sent = transport.sent();
        assert_eq!(sent[0].method, Method::Post);
        assert!(matches!(&sent[0].body, TransferBody::Multipart { fields, .. } if fields["folder"] == "/docs"));

        let events = pipeline.drain_events();
        assert_eq!(
            events,
            vec![UploadEvent::Completed {
                id,
                result: UploadResult::Direct(r#"{"name":"a.txt"}"#.to_string()),
                destination: "/docs".to_string(),
            }]
        );
        assert!(pipeline.drain_events().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_fails_with_response() {
        let transport = MockTransport::new().respond(500, "boom");
        let pipeline = direct_pipeline(transport);
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");
        pipeline.run(id).await;

        let task = pipeline.task(id).unwrap();
        assert_eq!(task.state, UploadState::Failed);
        let error = task.error.unwrap();
        assert_eq!(error.kind, UploadErrorKind::TransferFailed);
        assert_eq!(error.status, Some(500));
        assert_eq!(error.body.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_progress_is_rounded_percentage() {
        let transport = MockTransport::new().with_progress(vec![(2, 3)]).pending();
        let pipeline = direct_pipeline(transport);
        let id = pipeline.enqueue(file("a.txt", 3), Metadata::new(), "");

        let run = pipeline.run(id);
        let check = async {
            tokio::task::yield_now().await;
            assert_eq!(pipeline.task(id).unwrap().progress, 67);
            assert!(pipeline.cancel(id));
        };
        futures_util::future::join(run, check).await;
        assert_eq!(pipeline.task(id).unwrap().progress, 0);
    }

    // =========================================================================
    // Signed URL
    // =========================================================================

    #[tokio::test]
    async fn test_signed_upload() {
        let transport = MockTransport::new()
            .respond_json(200, r#"{"signedUrl":"https://bucket.test/put"}"#)
            .respond(200, "");
        let config = UploadConfig::signed("https://api.test/sign").with_header("X-Key", "k");
        let pipeline = UploadPipeline::new(config, transport.clone());
        let mut metadata = Metadata::new();
        metadata.insert("owner".to_string(), "me".to_string());

        let id = pipeline.enqueue(UploadFile::new("a.bin", "", vec![1, 2]), metadata, "/in");
        pipeline.run(id).await;

        let requested = transport.json_requests();
        assert_eq!(requested[0].0, "https://api.test/sign");
        assert_eq!(requested[0].1["fileName"], "a.bin");
        assert_eq!(requested[0].1["owner"], "me");

        let sent = transport.sent();
        assert_eq!(sent[0].method, Method::Put);
        assert_eq!(sent[0].url, "https://bucket.test/put");
        assert_eq!(sent[0].headers["Content-Type"], "application/octet-stream");
        assert_eq!(sent[0].headers["X-Key"], "k");

        match pipeline.drain_events().remove(0) {
            UploadEvent::Completed {
                result: UploadResult::Signed(record),
                ..
            } => {
                assert_eq!(record.name, "a.bin");
                assert_eq!(record.size, 2);
                assert_eq!(record.metadata["owner"], "me");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_signed_url_missing_fails() {
        let transport = MockTransport::new().respond_json(200, r#"{"url":"nope"}"#);
        let pipeline = UploadPipeline::new(UploadConfig::signed("https://api.test/sign"), transport.clone());
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");
        pipeline.run(id).await;

        let error = pipeline.task(id).unwrap().error.unwrap();
        assert_eq!(error.kind, UploadErrorKind::SignedUrlFailed);
        assert!(transport.sent().is_empty());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[tokio::test]
    async fn test_validator_rejection_skips_network() {
        let transport = MockTransport::new().respond(200, "{}");
        let config = UploadConfig::direct("https://api.test/upload")
            .with_validator(|_: &UploadFile, _: &Metadata| ValidationOutcome::reject("Quota exceeded"));
        let pipeline = UploadPipeline::new(config, transport.clone());
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");
        pipeline.run(id).await;

        let task = pipeline.task(id).unwrap();
        assert_eq!(task.state, UploadState::Failed);
        let error = task.error.unwrap();
        assert_eq!(error.kind, UploadErrorKind::ValidationFailed);
        assert_eq!(error.message, "Quota exceeded");
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_validator_default_message() {
        let config = UploadConfig::direct("https://api.test/upload")
            .with_validator(|_: &UploadFile, _: &Metadata| ValidationOutcome::default());
        let pipeline = UploadPipeline::new(config, MockTransport::new());
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");
        pipeline.run(id).await;
        assert_eq!(pipeline.task(id).unwrap().error.unwrap().message, "Upload failed.");
    }

    #[tokio::test]
    async fn test_builtin_limits() {
        let mut config = UploadConfig::direct("https://api.test/upload");
        config.max_file_size = Some(5);
        config.accepted_file_types = Some(".txt".to_string());
        let pipeline = UploadPipeline::new(config, MockTransport::new().respond(200, "{}"));

        let big = pipeline.enqueue(file("big.txt", 6), Metadata::new(), "");
        let wrong = pipeline.enqueue(file("img.png", 1), Metadata::new(), "");
        let fine = pipeline.enqueue(file("ok.TXT", 1), Metadata::new(), "");
        pipeline.run(big).await;
        pipeline.run(wrong).await;
        pipeline.run(fine).await;

        assert_eq!(pipeline.task(big).unwrap().state, UploadState::Failed);
        assert_eq!(pipeline.task(wrong).unwrap().state, UploadState::Failed);
        assert_eq!(pipeline.task(fine).unwrap().state, UploadState::Completed);
    }

    // =========================================================================
    // Cancel, Retry, Remove
    // =========================================================================

    #[tokio::test]
    async fn test_cancel_then_retry_skips_validation() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let transport = MockTransport::new().pending().respond(200, "{}");
        let config = UploadConfig::direct("https://api.test/upload").with_validator(
            move |_: &UploadFile, _: &Metadata| {
                counter.set(counter.get() + 1);
                ValidationOutcome::accept()
            },
        );
        let pipeline = UploadPipeline::new(config, transport);
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");

        let run = pipeline.run(id);
        let cancel = async {
            tokio::task::yield_now().await;
            assert_eq!(pipeline.task(id).unwrap().state, UploadState::Uploading);
            assert!(pipeline.cancel(id));
        };
        futures_util::future::join(run, cancel).await;

        let task = pipeline.task(id).unwrap();
        assert_eq!(task.state, UploadState::Canceled);
        assert_eq!(task.progress, 0);
        assert_eq!(task.error.as_ref().map(|e| e.kind), Some(UploadErrorKind::Canceled));
        assert_eq!(
            pipeline.drain_events(),
            vec![UploadEvent::Canceled {
                id,
                error: UploadError::canceled(),
            }]
        );

        pipeline.retry(id).await;
        let task = pipeline.task(id).unwrap();
        assert_eq!(task.state, UploadState::Completed);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_cancel_leaves_concurrent_upload_running() {
        let transport = MockTransport::new().pending().respond(200, "{}");
        let pipeline = direct_pipeline(transport.clone());
        let a = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");
        let b = pipeline.enqueue(file("b.txt", 1), Metadata::new(), "");

        let cancel = async {
            tokio::task::yield_now().await;
            assert_eq!(pipeline.task(a).unwrap().state, UploadState::Uploading);
            assert!(pipeline.cancel(a));
            assert!(!pipeline.cancel(a));
        };
        futures_util::future::join3(pipeline.run(a), pipeline.run(b), cancel).await;

        assert_eq!(pipeline.task(a).unwrap().state, UploadState::Canceled);
        assert_eq!(pipeline.task(b).unwrap().state, UploadState::Completed);
        assert!(pipeline.task(b).unwrap().error.is_none());
        assert_eq!(transport.sent().len(), 2);

        let events = pipeline.drain_events();
        assert_eq!(events.len(), 2);
        let canceled: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, UploadEvent::Canceled { .. }))
            .map(UploadEvent::id)
            .collect();
        assert_eq!(canceled, vec![a]);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, UploadEvent::Completed { id, .. } if *id == b))
        );
    }

    #[tokio::test]
    async fn test_retry_after_failure_clears_error() {
        let transport = MockTransport::new().respond(503, "busy").respond(201, "{}");
        let pipeline = direct_pipeline(transport);
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");
        pipeline.run(id).await;
        assert!(pipeline.task(id).unwrap().error.is_some());

        pipeline.retry(id).await;
        let task = pipeline.task(id).unwrap();
        assert_eq!(task.state, UploadState::Completed);
        assert!(task.error.is_none());
    }

    #[tokio::test]
    async fn test_run_and_retry_respect_state() {
        let pipeline = direct_pipeline(MockTransport::new().respond(200, "{}"));
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");
        pipeline.retry(id).await;
        assert_eq!(pipeline.task(id).unwrap().state, UploadState::Queued);

        pipeline.run(id).await;
        pipeline.run(id).await;
        assert_eq!(pipeline.drain_events().len(), 1);
        assert!(!pipeline.cancel(id));
    }

    #[tokio::test]
    async fn test_remove_in_flight_aborts() {
        let transport = MockTransport::new().pending();
        let pipeline = direct_pipeline(transport);
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");

        let run = pipeline.run(id);
        let remove = async {
            tokio::task::yield_now().await;
            assert!(pipeline.is_uploading());
            assert!(pipeline.remove(id).is_some());
        };
        futures_util::future::join(run, remove).await;

        assert!(pipeline.snapshot().is_empty());
        assert!(pipeline.drain_events().is_empty());
    }

    #[tokio::test]
    async fn test_remove_failed_is_local() {
        let pipeline = direct_pipeline(MockTransport::new().respond(400, "bad"));
        let id = pipeline.enqueue(file("a.txt", 1), Metadata::new(), "");
        pipeline.run(id).await;
        assert_eq!(pipeline.remove(id).unwrap().state, UploadState::Failed);
        assert!(pipeline.remove(id).is_none());
    }
}
