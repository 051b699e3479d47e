/// Configures timeout, retry and rate-limit behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (linear strategy).
    pub retry_backoff_ms: u64,
    /// A successful response reporting fewer remaining requests than this
    /// carries a [`RateLimitWarning`](crate::RateLimitWarning).
    pub rate_limit_warning_threshold: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            retry_backoff_ms: 1_000,
            rate_limit_warning_threshold: 10,
        }
    }
}
