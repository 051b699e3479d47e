use serde::Deserialize;

pub(crate) const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub(crate) const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Structured error payload returned by the backend, e.g. `{"message": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
