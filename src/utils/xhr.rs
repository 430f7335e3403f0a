//! Browser upload transport.
//!
//! JSON requests go through `gloo-net`; file transfers use `XMLHttpRequest`
//! because the Fetch API reports no upload progress.

use js_sys::{Array, Promise, Uint8Array};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, FormData, ProgressEvent, XmlHttpRequest};

use crate::config::upload::{DEFAULT_ERROR, FILE_FIELD};
use crate::core::error::{UploadError, UploadErrorKind};
use crate::core::upload::{
    HttpResponse, ProgressFn, TransferBody, TransferRequest, UploadTransport,
};
use crate::models::{Metadata, UploadFile};

/// Transport backed by the browser's networking stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct XhrTransport;

impl XhrTransport {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn transfer_error(message: impl Into<String>) -> UploadError {
    UploadError::new(UploadErrorKind::TransferFailed, message)
}

#[inline]
fn js_error(_: JsValue) -> UploadError {
    transfer_error(DEFAULT_ERROR)
}

// =============================================================================
// Request Body
// =============================================================================

fn to_blob(file: &UploadFile) -> Result<Blob, UploadError> {
    let bytes = Uint8Array::from(&file.data[..]);
    let parts = Array::of1(&bytes);
    let options = BlobPropertyBag::new();
    options.set_type(file.content_type_or_default());
    Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(js_error)
}

fn to_form(fields: &Metadata, file: &UploadFile) -> Result<FormData, UploadError> {
    let form = FormData::new().map_err(js_error)?;
    for (name, value) in fields {
        form.append_with_str(name, value).map_err(js_error)?;
    }
    form.append_with_blob_and_filename(FILE_FIELD, &to_blob(file)?, &file.name)
        .map_err(js_error)?;
    Ok(form)
}

// =============================================================================
// In-flight Request
// =============================================================================

/// Keeps the progress callback alive and aborts the request when dropped
/// before it settled.
struct InFlight {
    xhr: XmlHttpRequest,
    _progress: Closure<dyn FnMut(ProgressEvent)>,
    settled: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.settled {
            log::debug!("Aborting in-flight upload");
            let _ = self.xhr.abort();
        }
    }
}

fn read_response(xhr: &XmlHttpRequest) -> HttpResponse {
    HttpResponse {
        status: xhr.status().unwrap_or(0),
        status_text: xhr.status_text().unwrap_or_default(),
        body: xhr.response_text().ok().flatten().unwrap_or_default(),
    }
}

// =============================================================================
// Transport
// =============================================================================

impl UploadTransport for XhrTransport {
    async fn request_json(&self, url: &str, body: &Value) -> Result<HttpResponse, UploadError> {
        let response = gloo_net::http::Request::post(url)
            .json(body)
            .map_err(|e| transfer_error(e.to_string()))?
            .send()
            .await
            .map_err(|e| transfer_error(e.to_string()))?;

        Ok(HttpResponse {
            status: response.status(),
            status_text: response.status_text(),
            body: response.text().await.unwrap_or_default(),
        })
    }

    async fn send(
        &self,
        request: TransferRequest,
        progress: ProgressFn,
    ) -> Result<HttpResponse, UploadError> {
        let xhr = XmlHttpRequest::new().map_err(js_error)?;
        xhr.open_with_async(request.method.as_str(), &request.url, true)
            .map_err(js_error)?;
        for (name, value) in &request.headers {
            xhr.set_request_header(name, value).map_err(js_error)?;
        }

        let on_progress = Closure::<dyn FnMut(ProgressEvent)>::new(move |event: ProgressEvent| {
            if event.length_computable() {
                progress(event.loaded() as u64, event.total() as u64);
            }
        });
        xhr.upload()
            .map_err(js_error)?
            .set_onprogress(Some(on_progress.as_ref().unchecked_ref()));

        let settled = Promise::new(&mut |resolve, reject| {
            xhr.set_onload(Some(&resolve));
            xhr.set_onerror(Some(&reject));
            xhr.set_onabort(Some(&reject));
        });

        let mut guard = InFlight {
            xhr: xhr.clone(),
            _progress: on_progress,
            settled: false,
        };

        match &request.body {
            TransferBody::Multipart { fields, file } => {
                let form = to_form(fields, file)?;
                xhr.send_with_opt_form_data(Some(&form)).map_err(js_error)?;
            }
            TransferBody::Raw(file) => {
                let blob = to_blob(file)?;
                xhr.send_with_opt_blob(Some(&blob)).map_err(js_error)?;
            }
        }

        let outcome = JsFuture::from(settled).await;
        guard.settled = true;

        match outcome {
            Ok(_) => Ok(read_response(&xhr)),
            Err(_) => {
                log::warn!("Network error uploading to {}", request.url);
                Err(transfer_error(DEFAULT_ERROR))
            }
        }
    }
}
