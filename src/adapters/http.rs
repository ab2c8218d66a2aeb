use crate::domain::ports::Fetcher;
use crate::utils::error::{Result, ScrapeError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("icd-scrape/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed fetcher. One attempt per request; timeouts, transport
/// failures and non-success statuses all become [`ScrapeError::Fetch`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ScrapeError::ConfigValidation {
                field: "source".to_string(),
                message: format!("cannot build HTTP client: {}", e),
            })?;
        Ok(Self { client, timeout })
    }

    fn describe(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs())
        } else if error.is_connect() {
            format!("connection failed: {}", error)
        } else {
            error.to_string()
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::fetch(url, None, self.describe(&e)))?;

        let status = response.status();
        tracing::debug!("Response status for {}: {}", url, status);
        if !status.is_success() {
            return Err(ScrapeError::fetch(
                url,
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ScrapeError::fetch(url, Some(status.as_u16()), self.describe(&e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fetcher(timeout_secs: u64) -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(timeout_secs), DEFAULT_USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn test_get_text_success_sends_user_agent() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/browse10/2019/en")
                    .header("user-agent", DEFAULT_USER_AGENT);
                then.status(200).body("<html>ok</html>");
            })
            .await;

        let body = fetcher(5)
            .get_text(&server.url("/browse10/2019/en"))
            .await
            .unwrap();

        page.assert_async().await;
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error_with_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;

        let err = fetcher(5)
            .get_text(&server.url("/missing"))
            .await
            .unwrap_err();

        match err {
            ScrapeError::Fetch { status, .. } => assert_eq!(status, Some(404)),
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_fetch_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200)
                    .body("late")
                    .delay(Duration::from_millis(2500));
            })
            .await;

        let err = fetcher(1).get_text(&server.url("/slow")).await.unwrap_err();

        match err {
            ScrapeError::Fetch {
                status, message, ..
            } => {
                assert_eq!(status, None);
                assert!(message.contains("timed out"), "{}", message);
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
    }
}
