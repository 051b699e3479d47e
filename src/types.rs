use reqwest::header::HeaderMap;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    wire::{RATE_LIMIT_REMAINING, RATE_LIMIT_RESET},
    ApiError, Outcome,
};

/// Low remaining quota reported by a successful response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RateLimitWarning {
    pub remaining: u64,
    /// Raw `X-RateLimit-Reset` value, if the server sent one.
    pub reset: Option<String>,
}

impl RateLimitWarning {
    /// Returns a warning when `X-RateLimit-Remaining` is below `threshold`.
    pub fn from_headers(headers: &HeaderMap, threshold: u64) -> Option<Self> {
        let remaining = headers
            .get(RATE_LIMIT_REMAINING)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()?;
        if remaining >= threshold {
            return None;
        }
        let reset = headers
            .get(RATE_LIMIT_RESET)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        Some(Self { remaining, reset })
    }
}

/// Terminal result of a logical request.
///
/// Serializes as `{ success, data?, error?, status }`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClientResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: u16,
    /// Number of attempts made, including the first.
    #[serde(skip)]
    pub attempts: usize,
    #[serde(skip)]
    pub rate_limit_warning: Option<RateLimitWarning>,
}

impl ClientResult {
    pub(crate) fn success(status: u16, data: serde_json::Value, attempts: usize) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status,
            attempts,
            rate_limit_warning: None,
        }
    }

    pub(crate) fn failure(status: u16, message: impl Into<String>, attempts: usize) -> Self {
        let message = message.into();
        let error = if message.trim().is_empty() {
            "Unknown error occurred".to_owned()
        } else {
            message
        };
        Self {
            success: false,
            data: None,
            error: Some(error),
            status,
            attempts,
            rate_limit_warning: None,
        }
    }

    pub(crate) fn from_outcome(outcome: &Outcome, attempts: usize) -> Self {
        match outcome {
            Outcome::Success { status, body } => Self::success(*status, body.clone(), attempts),
            other => Self::failure(other.status(), other.message(), attempts),
        }
    }

    pub(crate) fn with_rate_limit_warning(mut self, warning: Option<RateLimitWarning>) -> Self {
        self.rate_limit_warning = warning;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Deserializes the payload of a successful result.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let data = self
            .data
            .clone()
            .ok_or_else(|| ApiError::Decode("result carries no data".to_owned()))?;
        serde_json::from_value(data)
            .map_err(|err| ApiError::Decode(format!("unexpected payload shape: {err}")))
    }

    /// Converts into the payload, or an [`ApiError::Request`] on failure.
    pub fn into_result(self) -> Result<serde_json::Value, ApiError> {
        if self.success {
            Ok(self.data.unwrap_or(serde_json::Value::Null))
        } else {
            Err(ApiError::Request {
                status: self.status,
                message: self
                    .error
                    .unwrap_or_else(|| "Unknown error occurred".to_owned()),
            })
        }
    }
}
