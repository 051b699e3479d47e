//! `resilient-api-client` is an async API client that adds retry, timeout and
//! rate-limit handling to calls against a JSON backend.
//!
//! - [`ApiClient`] exposes `get`, `post`, `put`, `patch`, `delete`,
//!   `upload_file` and `batch`, and manages the bearer credential.
//! - [`RequestExecutor`] runs one request's attempts with linear backoff.
//! - [`RetryPolicy`] and [`classify()`] are pure and usable on their own.
//! - [`MetricsApi`] and [`ContentApi`] are domain helpers over [`ApiClient`].
//!
//! The network call itself goes through the [`Transport`] trait;
//! [`ReqwestTransport`] is the default on native and `wasm32` targets.

mod classify;
mod client;
mod credentials;
mod domain;
mod error;
mod executor;
mod options;
mod request;
mod retry;
mod transport;
mod types;
mod wire;

pub use classify::{classify, classify_response, classify_transport_error, Outcome};
pub use client::ApiClient;
#[cfg(target_arch = "wasm32")]
pub use credentials::{BrowserLocalStorage, LocalStorageCredentialStore};
pub use credentials::{
    CredentialStore, KeyValueStorage, MemoryCredentialStore, StorageCredentialStore,
    AUTH_TOKEN_KEY,
};
pub use domain::{ContentApi, MetricsApi};
pub use error::{ApiError, TransportError, TransportErrorKind};
pub use executor::{Attempt, RequestExecutor};
pub use options::ClientOptions;
pub use request::{
    BatchRequest, FilePart, LogicalRequest, MultipartForm, OutgoingRequest, RequestBody,
};
pub use retry::{RetryDecision, RetryPolicy};
pub use transport::{RawResponse, ReqwestTransport, Transport};
pub use types::{ClientResult, RateLimitWarning};

pub use reqwest::Method;

pub type Result<T> = std::result::Result<T, ApiError>;
