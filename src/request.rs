use std::{borrow::Cow, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};

use crate::{ApiError, Result};

/// Payload attached to a request.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// File part of a multipart upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Multipart form: one `file` part plus additional text fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartForm {
    pub file: FilePart,
    pub fields: Vec<(String, String)>,
}

/// One logical call, independent of how many attempts it takes.
///
/// Built once by [`ApiClient`](crate::ApiClient) (or by hand) and consumed by
/// [`RequestExecutor::execute`](crate::RequestExecutor::execute).
#[derive(Clone, Debug)]
pub struct LogicalRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: RequestBody,
    pub(crate) headers: HeaderMap,
    pub(crate) authorization: Option<HeaderValue>,
    pub(crate) timeout: Option<Duration>,
}

impl LogicalRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
            authorization: None,
            timeout: None,
        }
    }

    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Serializes `payload` as the JSON body.
    pub fn with_json<T: serde::Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        let value = serde_json::to_value(payload)?;
        Ok(self.with_body(RequestBody::Json(value)))
    }

    /// Adds a header that overrides any default the executor would set.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| ApiError::InvalidHeader {
                name: name.to_owned(),
                reason: err.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| ApiError::InvalidHeader {
            name: name.to_owned(),
            reason: err.to_string(),
        })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Bearer credential attached as `Authorization`. The `Bearer` scheme is
    /// added unless the token already carries it. `None` or a blank token
    /// sends no header.
    pub fn with_credential(mut self, token: Option<&str>) -> Result<Self> {
        self.authorization = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(authorization_value)
            .transpose()?;
        Ok(self)
    }

    /// Overrides the client-wide per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn has_credential(&self) -> bool {
        self.authorization.is_some()
    }
}

fn authorization_value(token: &str) -> Result<HeaderValue> {
    let has_scheme = token
        .split_once(' ')
        .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"));
    let credential = if has_scheme {
        Cow::Borrowed(token)
    } else {
        Cow::Owned(format!("Bearer {token}"))
    };

    let mut value = HeaderValue::from_str(&credential).map_err(|err| ApiError::InvalidHeader {
        name: "authorization".to_owned(),
        reason: err.to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Fully prepared attempt handed to a [`Transport`](crate::Transport).
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Duration,
}

/// Entry of [`ApiClient::batch`](crate::ApiClient::batch).
///
/// For `GET` the `data` object becomes query parameters, `DELETE` ignores
/// it, every other method sends it as the JSON body (`{}` when absent).
#[derive(Clone, Debug, PartialEq)]
pub struct BatchRequest {
    pub method: Method,
    pub endpoint: String,
    pub data: Option<serde_json::Value>,
}

impl BatchRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            data: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, data: serde_json::Value) -> Self {
        Self::new(Method::POST, endpoint).with_data(data)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use crate::{ApiError, LogicalRequest, RequestBody};

    #[test]
    fn with_json_serializes_payload() {
        let request = LogicalRequest::new(Method::POST, "/items")
            .with_json(&serde_json::json!({"name": "kit"}))
            .expect("must serialize");
        assert_eq!(
            request.body(),
            &RequestBody::Json(serde_json::json!({"name": "kit"}))
        );
    }

    #[test]
    fn with_header_rejects_invalid_name() {
        let err = LogicalRequest::new(Method::GET, "/items")
            .with_header("bad header", "x")
            .expect_err("must reject");
        assert!(matches!(err, ApiError::InvalidHeader { .. }));
    }

    #[test]
    fn blank_credential_is_dropped() {
        let request = LogicalRequest::new(Method::GET, "/items")
            .with_credential(Some("  "))
            .expect("blank token is accepted");
        assert!(!request.has_credential());
    }

    #[test]
    fn credential_gains_bearer_scheme() {
        let request = LogicalRequest::new(Method::GET, "/items")
            .with_credential(Some(" tok-42 "))
            .expect("valid token");
        let value = request.authorization.expect("header must be set");
        assert_eq!(value.as_bytes(), b"Bearer tok-42");
        assert!(value.is_sensitive());
    }

    #[test]
    fn credential_keeps_scheme_in_any_case() {
        let request = LogicalRequest::new(Method::GET, "/items")
            .with_credential(Some("bEaReR tok-42"))
            .expect("valid token");
        let value = request.authorization.expect("header must be set");
        assert_eq!(value.as_bytes(), b"bEaReR tok-42");
    }

    #[test]
    fn credential_word_starting_with_bearer_is_not_a_scheme() {
        let request = LogicalRequest::new(Method::GET, "/items")
            .with_credential(Some("bearertoken"))
            .expect("valid token");
        let value = request.authorization.expect("header must be set");
        assert_eq!(value.as_bytes(), b"Bearer bearertoken");
    }

    #[test]
    fn credential_with_control_characters_is_rejected() {
        let err = LogicalRequest::new(Method::GET, "/items")
            .with_credential(Some("abc\ndef"))
            .expect_err("must reject");
        assert!(matches!(err, ApiError::InvalidHeader { .. }));
    }
}
