use std::{
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use futures_util::future::{self, Either};
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::{
    classify::classify, ClientOptions, ClientResult, LogicalRequest, Outcome, OutgoingRequest,
    RateLimitWarning, RawResponse, RequestBody, RetryPolicy, Transport, TransportError,
};

/// Record of one try of a logical request.
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt {
    /// 0 for the initial attempt.
    pub sequence: usize,
    pub elapsed: Duration,
    pub outcome: Outcome,
    pub rate_limit_warning: Option<RateLimitWarning>,
}

/// Runs the attempt sequence of a single logical request.
///
/// Attempts are strictly sequential. A failed attempt is classified, the
/// [`RetryPolicy`] picks the next step, and the loop either sleeps and tries
/// again or returns. `execute` never fails: every terminal state is a
/// [`ClientResult`].
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    options: ClientOptions,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("policy", &self.policy)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let options = ClientOptions::default();
        Self {
            transport,
            policy: RetryPolicy::from(&options),
            options,
        }
    }

    /// Applies timeout, retry and rate-limit options.
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.policy = RetryPolicy::from(&options);
        self.options = options;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn execute(&self, request: LogicalRequest) -> ClientResult {
        let attempts = AtomicUsize::new(0);
        self.run(request, &attempts).await
    }

    /// Like [`execute`](Self::execute), but gives up as soon as `cancel`
    /// resolves. The in-flight attempt is dropped and the result reports
    /// status `0` with `"Request cancelled"`.
    pub async fn execute_until<C>(&self, request: LogicalRequest, cancel: C) -> ClientResult
    where
        C: Future<Output = ()>,
    {
        let attempts = AtomicUsize::new(0);
        let run = self.run(request, &attempts);
        futures_util::pin_mut!(run);
        futures_util::pin_mut!(cancel);

        match future::select(run, cancel).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("request cancelled by caller");

                ClientResult::failure(0, "Request cancelled", attempts.load(Ordering::SeqCst))
            }
        }
    }

    async fn run(&self, request: LogicalRequest, attempts: &AtomicUsize) -> ClientResult {
        let outgoing = self.prepare(request);
        let mut attempt = 0usize;

        loop {
            attempts.store(attempt + 1, Ordering::SeqCst);
            let record = self.run_attempt(attempt, &outgoing).await;

            match &record.outcome {
                Outcome::Success { .. } => {
                    #[cfg(feature = "tracing")]
                    if let Some(warning) = &record.rate_limit_warning {
                        tracing::warn!(
                            remaining = warning.remaining,
                            "rate limit warning: {} requests remaining",
                            warning.remaining
                        );
                    }

                    return ClientResult::from_outcome(&record.outcome, attempt + 1)
                        .with_rate_limit_warning(record.rate_limit_warning);
                }
                Outcome::ClientError { .. } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        status = record.outcome.status(),
                        "{} {} rejected, not retrying",
                        outgoing.method,
                        outgoing.url
                    );

                    return ClientResult::from_outcome(&record.outcome, attempt + 1);
                }
                _ => {}
            }

            let decision = self.policy.decide(attempt, &record.outcome);
            if !decision.should_retry {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    status = record.outcome.status(),
                    "{} {} failed after {} attempt(s): {}",
                    outgoing.method,
                    outgoing.url,
                    attempt + 1,
                    record.outcome.message()
                );

                return ClientResult::from_outcome(&record.outcome, attempt + 1);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt = record.sequence,
                "retrying {} {} after {} ms: {}",
                outgoing.method,
                outgoing.url,
                decision.delay.as_millis(),
                record.outcome.message()
            );

            wait_before_retry(decision.delay).await;
            attempt += 1;
        }
    }

    async fn run_attempt(&self, sequence: usize, request: &OutgoingRequest) -> Attempt {
        let started = Stopwatch::start();
        let result = self.send_with_timeout(request).await;

        let outcome = classify(&result);
        let rate_limit_warning = match (&outcome, &result) {
            (Outcome::Success { .. }, Ok(response)) => RateLimitWarning::from_headers(
                &response.headers,
                self.options.rate_limit_warning_threshold,
            ),
            _ => None,
        };

        Attempt {
            sequence,
            elapsed: started.elapsed(),
            outcome,
            rate_limit_warning,
        }
    }

    /// Races the transport against the attempt deadline. The executor owns
    /// the limit, so a transport that ignores `request.timeout` still fails
    /// over to a retry.
    async fn send_with_timeout(
        &self,
        request: &OutgoingRequest,
    ) -> Result<RawResponse, TransportError> {
        let send = self.transport.send(request);
        let deadline = sleep(request.timeout);
        futures_util::pin_mut!(send);
        futures_util::pin_mut!(deadline);

        match future::select(send, deadline).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(TransportError::timeout()),
        }
    }

    fn prepare(&self, request: LogicalRequest) -> OutgoingRequest {
        let mut headers = HeaderMap::new();
        if matches!(request.body, RequestBody::Json(_)) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        if let Some(authorization) = request.authorization {
            headers.insert(header::AUTHORIZATION, authorization);
        }
        for name in request.headers.keys() {
            headers.remove(name);
        }
        headers.extend(request.headers);

        OutgoingRequest {
            method: request.method,
            url: request.url,
            query: request.query,
            headers,
            body: request.body,
            timeout: request
                .timeout
                .unwrap_or_else(|| Duration::from_millis(self.options.timeout_ms)),
        }
    }
}

async fn wait_before_retry(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Sleeps through the global `setTimeout`, available in windows and workers.
#[cfg(target_arch = "wasm32")]
async fn sleep(duration: Duration) {
    use wasm_bindgen::{JsCast, JsValue};

    let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let set_timeout = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("setTimeout"))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
        match set_timeout {
            Some(set_timeout) => {
                let _ = set_timeout.call2(&JsValue::NULL, &resolve, &JsValue::from(millis));
            }
            None => {
                let _ = resolve.call0(&JsValue::NULL);
            }
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

#[cfg(not(target_arch = "wasm32"))]
struct Stopwatch(tokio::time::Instant);

#[cfg(not(target_arch = "wasm32"))]
impl Stopwatch {
    fn start() -> Self {
        Self(tokio::time::Instant::now())
    }

    fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

// std::time::Instant panics on wasm32-unknown-unknown.
#[cfg(target_arch = "wasm32")]
struct Stopwatch(f64);

#[cfg(target_arch = "wasm32")]
impl Stopwatch {
    fn start() -> Self {
        Self(js_sys::Date::now())
    }

    fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(((js_sys::Date::now() - self.0) / 1_000.0).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use reqwest::{header, Method, StatusCode};

    use super::RequestExecutor;
    use crate::{
        ClientOptions, LogicalRequest, Outcome, OutgoingRequest, RawResponse, RequestBody,
        Transport, TransportError,
    };

    struct NoopTransport;

    #[async_trait]
    impl Transport for NoopTransport {
        async fn send(&self, _request: &OutgoingRequest) -> Result<RawResponse, TransportError> {
            Ok(RawResponse::new(StatusCode::OK, "{}"))
        }
    }

    /// Never answers and never looks at `request.timeout`.
    struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn send(&self, _request: &OutgoingRequest) -> Result<RawResponse, TransportError> {
            std::future::pending().await
        }
    }

    fn executor() -> RequestExecutor {
        RequestExecutor::new(Arc::new(NoopTransport))
    }

    #[test]
    fn prepare_sets_json_content_type_and_bearer() {
        let request = LogicalRequest::new(Method::POST, "https://api/items")
            .with_json(&serde_json::json!({"a": 1}))
            .expect("must serialize")
            .with_credential(Some("abc"))
            .expect("valid token");
        let outgoing = executor().prepare(request);

        assert_eq!(
            outgoing.headers.get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"application/json"[..])
        );
        assert_eq!(
            outgoing.headers.get(header::AUTHORIZATION).map(|v| v.as_bytes()),
            Some(&b"Bearer abc"[..])
        );
        assert_eq!(outgoing.timeout, std::time::Duration::from_millis(10_000));
    }

    #[test]
    fn prepare_lets_caller_headers_override_defaults() {
        let request = LogicalRequest::new(Method::POST, "https://api/items")
            .with_body(RequestBody::Json(serde_json::Value::Null))
            .with_header("Content-Type", "application/vnd.api+json")
            .expect("valid header");
        let outgoing = executor().prepare(request);

        let values: Vec<_> = outgoing
            .headers
            .get_all(header::CONTENT_TYPE)
            .iter()
            .collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].as_bytes(), b"application/vnd.api+json");
    }

    #[test]
    fn prepare_omits_content_type_without_json_body() {
        let outgoing = executor().prepare(LogicalRequest::new(Method::GET, "https://api/items"));
        assert!(outgoing.headers.get(header::CONTENT_TYPE).is_none());
        assert!(outgoing.headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn per_request_timeout_wins() {
        let request = LogicalRequest::new(Method::GET, "https://api/items")
            .with_timeout(std::time::Duration::from_millis(250));
        let outgoing = executor().prepare(request);
        assert_eq!(outgoing.timeout, std::time::Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_transport_is_cut_off_at_the_deadline() {
        let executor = RequestExecutor::new(Arc::new(StalledTransport)).with_options(ClientOptions {
            max_retries: 0,
            ..ClientOptions::default()
        });
        let outgoing = executor.prepare(
            LogicalRequest::new(Method::GET, "https://api/items")
                .with_timeout(std::time::Duration::from_millis(750)),
        );

        let started = tokio::time::Instant::now();
        let attempt = executor.run_attempt(0, &outgoing).await;

        assert_eq!(started.elapsed(), std::time::Duration::from_millis(750));
        assert_eq!(
            attempt.outcome,
            Outcome::NetworkFailure {
                reason: "Request timeout".to_owned()
            }
        );

        let result = executor
            .execute(LogicalRequest::new(Method::GET, "https://api/items"))
            .await;
        assert_eq!(result.status, 0);
        assert_eq!(result.attempts, 1);
    }
}
