use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    multipart, StatusCode,
};

use crate::{OutgoingRequest, RequestBody, TransportError};

/// Raw response as produced by a [`Transport`], before classification.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header, silently skipping names or values that are not valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Returns a header as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// Capability that performs one HTTP exchange.
///
/// Implementations must not retry; the executor owns retry and backoff.
/// `request.timeout` should be honored where the underlying client supports
/// it. On native targets the executor also enforces it.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutgoingRequest) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest` (Fetch API on `wasm32`).
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a preconfigured `reqwest` client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<RawResponse, TransportError> {
        // On WASM, reqwest uses AbortController for timeout; the
        // `.timeout()` method is available on both targets.
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => {
                let mut part = multipart::Part::bytes(form.file.bytes.clone())
                    .file_name(form.file.file_name.clone());
                if let Some(mime_type) = &form.file.mime_type {
                    part = part.mime_str(mime_type).map_err(map_reqwest_error)?;
                }
                let mut multipart_form = multipart::Form::new().part("file", part);
                for (name, value) in &form.fields {
                    multipart_form = multipart_form.text(name.clone(), value.clone());
                }
                builder.multipart(multipart_form)
            }
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::timeout();
    }
    // is_connect() is not available on wasm32 targets (no TCP)
    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return TransportError::connect(err.to_string());
    }
    TransportError::other(err.to_string())
}
