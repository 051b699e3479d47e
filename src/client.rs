use std::{fmt, future::Future, sync::Arc};

use futures_util::future;
use reqwest::Method;
use serde::Serialize;

use crate::{
    ApiError, BatchRequest, ClientOptions, ClientResult, CredentialStore, FilePart,
    LogicalRequest, MultipartForm, RequestBody, RequestExecutor,
    ReqwestTransport, Result, Transport,
};

/// Caller-facing API client.
///
/// Each verb builds a [`LogicalRequest`] against `base_url + path`, attaches
/// the current credential and hands it to the [`RequestExecutor`]. Failed
/// calls come back as a [`ClientResult`] with `success == false`; only
/// request construction problems are returned as `Err`.
#[derive(Clone)]
pub struct ApiClient {
    executor: RequestExecutor,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("executor", &self.executor)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client using [`ReqwestTransport`].
    ///
    /// The token lives in memory on native targets and in `localStorage`
    /// under `authToken` on `wasm32`, where it survives a page reload.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, Arc::new(ReqwestTransport::new()))
    }

    /// Creates a client over any [`Transport`].
    pub fn with_transport(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            executor: RequestExecutor::new(transport),
            base_url: base_url.into(),
            credentials: default_credential_store(),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `API_BASE_URL`: base URL every path is appended to
    /// - `API_AUTH_TOKEN`: optional bearer token (prefix optional)
    ///
    /// **Not available on `wasm32` targets**, since environment variables do not
    /// exist in browser runtimes.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("API_BASE_URL")
            .map_err(|_| "missing API_BASE_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("API_BASE_URL is set but empty".to_owned());
        }
        let client = Self::new(base_url.trim());
        if let Ok(token) = std::env::var("API_AUTH_TOKEN") {
            client.set_auth_token(token);
        }
        Ok(client)
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.executor = self.executor.with_options(opts);
        self
    }

    /// Replaces the credential store, e.g. with a
    /// [`StorageCredentialStore`](crate::StorageCredentialStore) over custom storage.
    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = store;
        self
    }

    /// Returns a client rooted at `base_url + segment` that shares this
    /// client's transport, options and credential store.
    pub fn scoped(&self, segment: &str) -> Self {
        Self {
            executor: self.executor.clone(),
            base_url: format!("{}{}", self.base_url, segment),
            credentials: Arc::clone(&self.credentials),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Stores the token for subsequent requests. A blank token clears it.
    pub fn set_auth_token(&self, token: impl AsRef<str>) {
        let token = token.as_ref();
        if token.trim().is_empty() {
            self.credentials.clear();
        } else {
            self.credentials.set(token);
        }
    }

    pub fn clear_auth_token(&self) {
        self.credentials.clear();
    }

    pub fn auth_token(&self) -> Option<String> {
        self.credentials.get()
    }

    /// Starts a request for `path` carrying the current credential.
    pub fn request(&self, method: Method, path: &str) -> Result<LogicalRequest> {
        let token = self.credentials.get();
        LogicalRequest::new(method, self.url_for(path)).with_credential(token.as_deref())
    }

    /// Executes a prepared request.
    pub async fn send(&self, request: LogicalRequest) -> ClientResult {
        self.executor.execute(request).await
    }

    /// Executes a prepared request, abandoning it when `cancel` resolves.
    pub async fn send_until<C>(&self, request: LogicalRequest, cancel: C) -> ClientResult
    where
        C: Future<Output = ()>,
    {
        self.executor.execute_until(request, cancel).await
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ClientResult> {
        let request = self
            .request(Method::GET, path)?
            .with_query(query.iter().copied());
        Ok(self.send(request).await)
    }

    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ClientResult> {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ClientResult> {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ClientResult> {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<ClientResult> {
        let request = self.request(Method::DELETE, path)?;
        Ok(self.send(request).await)
    }

    /// Uploads `file` as multipart form data under the `file` field, with
    /// `fields` appended as additional text parts.
    pub async fn upload_file<I, K, V>(
        &self,
        path: &str,
        file: FilePart,
        fields: I,
    ) -> Result<ClientResult>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let form = MultipartForm {
            file,
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        };
        let request = self
            .request(Method::POST, path)?
            .with_body(RequestBody::Multipart(form));
        Ok(self.send(request).await)
    }

    /// Runs all requests concurrently.
    ///
    /// Every entry resolves on its own: a construction error or exhausted
    /// retries in one entry never affects the others. Results keep the
    /// input order.
    pub async fn batch<I>(&self, requests: I) -> Vec<Result<ClientResult>>
    where
        I: IntoIterator<Item = BatchRequest>,
    {
        let calls = requests.into_iter().map(|entry| async move {
            let request = self.batch_request(entry)?;
            Ok::<_, ApiError>(self.send(request).await)
        });
        future::join_all(calls).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Result<ClientResult> {
        let request = self.request(method, path)?.with_json(body)?;
        Ok(self.send(request).await)
    }

    fn batch_request(&self, entry: BatchRequest) -> Result<LogicalRequest> {
        let BatchRequest {
            method,
            endpoint,
            data,
        } = entry;
        let request = self.request(method.clone(), &endpoint)?;

        if method == Method::GET {
            return Ok(request.with_query(query_pairs(&endpoint, data)?));
        }
        if method == Method::DELETE {
            return Ok(request);
        }
        let body = data.unwrap_or_else(|| serde_json::Value::Object(Default::default()));
        Ok(request.with_body(RequestBody::Json(body)))
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_credential_store() -> Arc<dyn CredentialStore> {
    Arc::new(crate::MemoryCredentialStore::new())
}

#[cfg(target_arch = "wasm32")]
fn default_credential_store() -> Arc<dyn CredentialStore> {
    Arc::new(crate::LocalStorageCredentialStore::new(
        crate::BrowserLocalStorage,
    ))
}

/// Flattens a JSON object into query pairs. Strings are passed through,
/// other scalars use their JSON text.
fn query_pairs(endpoint: &str, data: Option<serde_json::Value>) -> Result<Vec<(String, String)>> {
    match data {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Object(map)) => Ok(map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()),
        Some(other) => Err(ApiError::InvalidRequest(format!(
            "query data for GET {endpoint} must be an object, got {other}"
        ))),
    }
}
