//! Normalizes raw responses and transport failures into an [`Outcome`].

use reqwest::{header, StatusCode};

use crate::{wire::ErrorBody, RawResponse, TransportError};

/// Normalized result of a single attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// 2xx with a parsed JSON payload.
    Success { status: u16, body: serde_json::Value },
    /// 4xx other than a well-formed 429. Never retried.
    ClientError { status: u16, message: String },
    /// 5xx, malformed 2xx payloads, bare 429s and unexpected statuses.
    ServerError { status: u16, message: String },
    /// 429 carrying a usable `Retry-After` value.
    RateLimited { retry_after_seconds: u64 },
    /// Timeout or connection-level failure.
    NetworkFailure { reason: String },
}

impl Outcome {
    /// Status code reported to callers; `0` when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            Self::Success { status, .. }
            | Self::ClientError { status, .. }
            | Self::ServerError { status, .. } => *status,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS.as_u16(),
            Self::NetworkFailure { .. } => 0,
        }
    }

    /// Human-readable description; empty only for `Success`.
    pub fn message(&self) -> String {
        match self {
            Self::Success { .. } => String::new(),
            Self::ClientError { message, .. } | Self::ServerError { message, .. } => {
                message.clone()
            }
            Self::RateLimited {
                retry_after_seconds,
            } => format!("Rate limited. Retry after {retry_after_seconds} seconds"),
            Self::NetworkFailure { reason } => reason.clone(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServerError { .. } | Self::RateLimited { .. } | Self::NetworkFailure { .. }
        )
    }
}

/// Classifies either side of a transport call.
pub fn classify(result: &Result<RawResponse, TransportError>) -> Outcome {
    match result {
        Ok(response) => classify_response(response),
        Err(err) => classify_transport_error(err),
    }
}

pub fn classify_response(response: &RawResponse) -> Outcome {
    let status = response.status;
    let code = status.as_u16();

    if status.is_success() {
        return match parse_payload(&response.body) {
            Ok(body) => Outcome::Success { status: code, body },
            Err(err) => Outcome::ServerError {
                status: code,
                message: format!("Malformed response: {err}"),
            },
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        if let Some(retry_after_seconds) = retry_after_seconds(response) {
            return Outcome::RateLimited {
                retry_after_seconds,
            };
        }
    }

    let message = error_message(status, &response.body);
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        Outcome::ClientError {
            status: code,
            message,
        }
    } else {
        Outcome::ServerError {
            status: code,
            message,
        }
    }
}

pub fn classify_transport_error(err: &TransportError) -> Outcome {
    let reason = if err.message.trim().is_empty() {
        err.to_string()
    } else {
        err.message.clone()
    };
    Outcome::NetworkFailure { reason }
}

fn parse_payload(body: &str) -> Result<serde_json::Value, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(body)
}

/// Delay-seconds form only; HTTP-date values are treated as absent.
fn retry_after_seconds(response: &RawResponse) -> Option<u64> {
    response
        .header(header::RETRY_AFTER.as_str())?
        .trim()
        .parse::<u64>()
        .ok()
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody {
        message: Some(message),
    }) = serde_json::from_str::<ErrorBody>(body)
    {
        if !message.trim().is_empty() {
            return message;
        }
    }
    match status.canonical_reason() {
        Some(reason) => reason.to_owned(),
        None => format!("HTTP error! status: {}", status.as_u16()),
    }
}
