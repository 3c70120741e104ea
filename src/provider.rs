//! Shared plumbing for outbound provider calls

use std::future::Future;
use std::time::Duration;

/// Default bound on any single provider call
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of an outbound provider call.
///
/// These never escape the resolver or the dispatcher: they are logged and
/// converted into fallback values or failure counts.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} credentials are not configured")]
    NotConfigured(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Provider call timed out")]
    Timeout,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Build an HTTP client whose requests are bounded by `timeout`
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Run a provider call, converting an elapsed deadline into `ProviderError::Timeout`
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ProviderError::Timeout)?
}

/// Turn a non-success response into `ProviderError::Status`
pub async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status { status, body })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), ProviderError> = bounded(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Timeout)));
    }

    #[tokio::test]
    async fn test_client_timeout_maps_to_timeout() {
        let router = axum::Router::new().route(
            "/slow",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = testing::serve(router).await;
        let client = http_client(Duration::from_millis(50)).unwrap();

        let error = client
            .get(format!("{}/slow", base))
            .send()
            .await
            .map_err(ProviderError::from)
            .unwrap_err();

        assert!(matches!(error, ProviderError::Timeout));
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let result = bounded(Duration::from_secs(1), async { Ok::<_, ProviderError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
