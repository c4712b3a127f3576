//! Backoff for gateway evaluations.
//!
//! A query is re-sent when the gateway could not be reached, the request
//! timed out, or the gateway answered `503 Service Unavailable`. Anything
//! else (a rejected request, a request that could not even be built, a
//! contract error) goes straight back to the caller.
//!
//! Submissions never go through here: replaying a transaction whose commit
//! status is unknown could apply it twice.

use std::future::Future;

use reqwest::StatusCode;

use crate::config::RetryPolicy;

/// Whether a transport failure is worth another attempt.
pub(crate) fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Send a query, re-sending on transient failures per `policy`.
///
/// `send` is called at most `policy.max_retries + 1` times. On exhaustion
/// the last outcome is returned as-is, so a final 503 still reaches the
/// caller as a response.
pub(crate) async fn evaluate_with_backoff<F, Fut>(
    policy: &RetryPolicy,
    endpoint: &str,
    send: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let outcome = send().await;
        let retryable = match &outcome {
            Ok(resp) => resp.status() == StatusCode::SERVICE_UNAVAILABLE,
            Err(e) => is_transient(e),
        };
        if !retryable || attempt >= policy.max_retries {
            return outcome;
        }

        let delay = policy.delay(attempt);
        attempt += 1;
        match &outcome {
            Ok(resp) => tracing::warn!(
                endpoint,
                attempt,
                status = resp.status().as_u16(),
                ?delay,
                "gateway unavailable, retrying query"
            ),
            Err(e) => tracing::warn!(
                endpoint,
                attempt,
                error = %e,
                ?delay,
                "gateway unreachable, retrying query"
            ),
        }
        tokio::time::sleep(delay).await;
    }
}
