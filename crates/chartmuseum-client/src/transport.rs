//! Authenticated dispatch with bounded retries

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::auth::Auth;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::redact::sanitize_url;
use crate::request::{ApiRequest, RequestBody};
use crate::retry::{self, Outcome, RetryPolicy, RetryStrategy};

/// Sends [`ApiRequest`]s over a pooled HTTP client
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    auth: Auth,
    strategy: Arc<dyn RetryStrategy>,
    default_timeout: Option<Duration>,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            auth: config.auth.resolve()?,
            strategy: Arc::new(RetryPolicy::new(config.retry.clone())),
            default_timeout: config.timeout,
        })
    }

    /// Same pool, different credentials
    pub fn with_auth(&self, auth: Auth) -> Self {
        Self {
            auth,
            ..self.clone()
        }
    }

    pub fn with_strategy(&self, strategy: Arc<dyn RetryStrategy>) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Run a whole call under the request's deadline and cancellation token
    ///
    /// `call` covers dispatch, retries and reading the body, so a stalled
    /// body stops the call just like a stalled connect does.
    pub async fn bounded<T, F>(&self, request: &ApiRequest, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = request.timeout.or(self.default_timeout);

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| ClientError::Timeout {
                        method: request.method.to_string(),
                        url: sanitize_url(&request.url),
                    })?,
                None => call.await,
            }
        };

        match &request.cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(ClientError::Cancelled);
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ClientError::Cancelled),
                    result = deadline => result,
                }
            }
            None => deadline.await,
        }
    }

    /// Dispatch a request, retrying per the configured strategy
    ///
    /// Returns the last response received, whatever its status, once its
    /// headers arrive. Wrap in [`Transport::bounded`] to apply cancellation and
    /// timeouts.
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response> {
        let method = request.method.as_str();
        let url = sanitize_url(&request.url);
        let max_retries = self.strategy.max_retries();
        let mut attempt: u32 = 0;

        loop {
            if request.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                return Err(ClientError::Cancelled);
            }

            debug!(method, url = %url, attempt, "Sending request");
            let result = self.materialize(request).await?.send().await;

            let delay = match &result {
                Ok(response) => {
                    if let Some(limit) = retry::rate_limit(response.headers()) {
                        debug!(limit, "Server advertised rate limit");
                    }
                    let outcome = Outcome::Response {
                        status: response.status(),
                        headers: response.headers(),
                    };
                    self.retry_delay(attempt, max_retries, &outcome)
                }
                Err(e) => {
                    let outcome = Outcome::TransportError {
                        transient: e.is_connect() || e.is_timeout() || e.is_request(),
                    };
                    self.retry_delay(attempt, max_retries, &outcome)
                }
            };

            let Some(delay) = delay else {
                return result.map_err(|e| transport_error(method, &url, e));
            };

            match &result {
                Ok(response) => warn!(
                    method,
                    url = %url,
                    status = response.status().as_u16(),
                    attempt = attempt + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying request"
                ),
                Err(e) => warn!(
                    method,
                    url = %url,
                    error = error_kind(e),
                    attempt = attempt + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying request after network error"
                ),
            }
            drop(result);

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn retry_delay(&self, attempt: u32, max_retries: u32, outcome: &Outcome<'_>) -> Option<Duration> {
        (attempt < max_retries && self.strategy.should_retry(outcome))
            .then(|| self.strategy.backoff(attempt, outcome))
    }

    /// Build a fresh `reqwest` request for one attempt
    async fn materialize(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder> {
        let mut headers = request.headers.clone();
        self.auth.apply(&mut headers);

        let builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers);

        let builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
            RequestBody::File { path, len } => {
                debug!(path = %path.display(), bytes = *len, "Streaming file body");
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| ClientError::UnreadableFile {
                        path: path.display().to_string(),
                        source,
                    })?;
                builder.body(reqwest::Body::from(file))
            }
        };

        Ok(builder)
    }
}

fn error_kind(error: &reqwest::Error) -> &'static str {
    if error.is_connect() {
        "connect"
    } else if error.is_timeout() {
        "timeout"
    } else if error.is_request() {
        "request"
    } else {
        "other"
    }
}

fn transport_error(method: &str, url: &str, error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        return ClientError::Timeout {
            method: method.to_string(),
            url: url.to_string(),
        };
    }
    ClientError::Network {
        method: method.to_string(),
        url: url.to_string(),
        message: error.without_url().to_string(),
    }
}
