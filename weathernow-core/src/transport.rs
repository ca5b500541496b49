//! Fetch-with-retry HTTP transport.
//!
//! Retries are bounded and classified by status:
//! - 429 backs off `rate_limit_step × attempt`
//! - 5xx and transport failures back off `server_error_step × attempt`
//! - 401, 404 and any other non-2xx fail on the spot
//!
//! Backoff is linear, not exponential. Nothing is cached between calls.

use std::time::Duration;

use reqwest::{
    Client, StatusCode, Url,
    header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA},
};
use serde_json::Value;

use crate::error::WeatherError;

pub const USER_AGENT: &str = "WeatherNow/1.0";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Linear backoff steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub rate_limit_step: Duration,
    pub server_error_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rate_limit_step: Duration::from_millis(1000),
            server_error_step: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy, handy for tests against a local server.
    pub fn immediate() -> Self {
        Self {
            rate_limit_step: Duration::ZERO,
            server_error_step: Duration::ZERO,
        }
    }

    /// `attempt` is 1-based.
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.rate_limit_step.saturating_mul(attempt)
    }

    /// `attempt` is 1-based. Also used for transport-level failures.
    pub fn server_error_delay(&self, attempt: u32) -> Duration {
        self.server_error_step.saturating_mul(attempt)
    }
}

/// What to do with a response status on a given attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Accept,
    Retry(Duration),
    Unauthorized,
    NotFound,
    Fail,
}

/// Decide how to handle `status` on 1-based `attempt` out of `max_attempts`.
pub fn classify_status(
    status: StatusCode,
    attempt: u32,
    max_attempts: u32,
    policy: &RetryPolicy,
) -> StatusAction {
    if status.is_success() {
        return StatusAction::Accept;
    }

    match status {
        StatusCode::UNAUTHORIZED => StatusAction::Unauthorized,
        StatusCode::NOT_FOUND => StatusAction::NotFound,
        StatusCode::TOO_MANY_REQUESTS => StatusAction::Retry(policy.rate_limit_delay(attempt)),
        s if s.is_server_error() && attempt < max_attempts => {
            StatusAction::Retry(policy.server_error_delay(attempt))
        }
        _ => StatusAction::Fail,
    }
}

#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    policy: RetryPolicy,
}

impl Transport {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self, WeatherError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and parse the body as JSON, retrying transient failures.
    pub async fn fetch_json(&self, url: &Url, max_attempts: u32) -> Result<Value, WeatherError> {
        let target = redact(url);

        for attempt in 1..=max_attempts {
            tracing::debug!("GET {} (attempt {}/{})", target, attempt, max_attempts);

            let res = match self.http.get(url.clone()).send().await {
                Ok(res) => res,
                Err(e) => {
                    if attempt == max_attempts {
                        tracing::error!("GET {} failed after {} attempts: {}", target, attempt, e);
                        return Err(WeatherError::Network(e));
                    }
                    let delay = self.policy.server_error_delay(attempt);
                    tracing::warn!("GET {} failed: {}, retrying in {:?}", target, e, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = res.status();
            match classify_status(status, attempt, max_attempts, &self.policy) {
                StatusAction::Accept => {
                    let body = res.text().await.map_err(WeatherError::Network)?;
                    return serde_json::from_str(&body).map_err(|e| {
                        WeatherError::InvalidData(format!("response body is not valid JSON: {e}"))
                    });
                }
                StatusAction::Retry(delay) => {
                    if attempt < max_attempts {
                        tracing::warn!("GET {} returned {}, retrying in {:?}", target, status, delay);
                        tokio::time::sleep(delay).await;
                    }
                }
                StatusAction::Unauthorized => return Err(WeatherError::invalid_api_key()),
                StatusAction::NotFound => return Err(WeatherError::NotFound),
                StatusAction::Fail => {
                    let body = res.text().await.unwrap_or_default();
                    return Err(WeatherError::Api {
                        status,
                        message: api_error_message(status, &body),
                    });
                }
            }
        }

        tracing::error!("GET {} exhausted {} attempts", target, max_attempts);
        Err(WeatherError::RetryExhausted)
    }
}

/// Prefer the provider's own `message`, else a status-line message.
fn api_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(|m| format!("API Error: {m}"))
        .unwrap_or_else(|| format!("API request failed: {status}"))
}

/// Drop the query string so the API key never reaches the logs.
fn redact(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(statuses: &[u16], max_attempts: u32) -> (Vec<StatusAction>, Vec<Duration>) {
        let policy = RetryPolicy::default();
        let mut actions = Vec::new();
        let mut sleeps = Vec::new();

        for (i, code) in statuses.iter().enumerate() {
            let attempt = i as u32 + 1;
            let action = classify_status(
                StatusCode::from_u16(*code).expect("valid status"),
                attempt,
                max_attempts,
                &policy,
            );
            actions.push(action);
            match action {
                StatusAction::Retry(delay) if attempt < max_attempts => sleeps.push(delay),
                StatusAction::Retry(_) => {}
                _ => break,
            }
        }

        (actions, sleeps)
    }

    #[test]
    fn rate_limits_back_off_linearly_then_succeed() {
        let (actions, sleeps) = run(&[429, 429, 200], 3);

        assert_eq!(actions.last(), Some(&StatusAction::Accept));
        assert_eq!(
            sleeps,
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[test]
    fn server_errors_retry_until_the_last_attempt() {
        let (actions, sleeps) = run(&[500, 503, 500], 3);

        assert_eq!(
            actions,
            vec![
                StatusAction::Retry(Duration::from_millis(500)),
                StatusAction::Retry(Duration::from_millis(1000)),
                StatusAction::Fail,
            ]
        );
        assert_eq!(sleeps.len(), 2);
    }

    #[test]
    fn unauthorized_and_not_found_fail_immediately() {
        let (actions, sleeps) = run(&[401, 200], 3);
        assert_eq!(actions, vec![StatusAction::Unauthorized]);
        assert!(sleeps.is_empty());

        let (actions, _) = run(&[404], 3);
        assert_eq!(actions, vec![StatusAction::NotFound]);
    }

    #[test]
    fn other_client_errors_are_not_retried() {
        for code in [400u16, 403, 408, 418] {
            let (actions, _) = run(&[code], 3);
            assert_eq!(actions, vec![StatusAction::Fail], "status {code}");
        }
    }

    #[test]
    fn single_attempt_never_retries_server_errors() {
        let (actions, sleeps) = run(&[502], 1);
        assert_eq!(actions, vec![StatusAction::Fail]);
        assert!(sleeps.is_empty());
    }

    #[test]
    fn api_error_message_prefers_provider_text() {
        let msg = api_error_message(StatusCode::BAD_REQUEST, r#"{"cod":"400","message":"wrong latitude"}"#);
        assert_eq!(msg, "API Error: wrong latitude");

        let msg = api_error_message(StatusCode::FORBIDDEN, "<html>nope</html>");
        assert_eq!(msg, "API request failed: 403 Forbidden");
    }

    #[test]
    fn redact_strips_query() {
        let url = Url::parse("https://api.example.com/data/2.5/weather?q=Oslo&appid=SECRET")
            .expect("url");
        assert_eq!(redact(&url), "https://api.example.com/data/2.5/weather");
    }
}
