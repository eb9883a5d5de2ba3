use crate::config::ScraperConfig;
use crate::error::FetchFailure;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// Thin reqwest wrapper. One request per call: no retry, no cache.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { inner })
    }

    /// Body of a 200 response; anything else is a `FetchFailure`.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchFailure> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            warn!("Received status code {} for URL: {}", status, url);
            return Err(FetchFailure::Status {
                status: status.as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|e| FetchFailure::Transport(format!("failed to read body: {}", e.without_url())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;

    #[tokio::test]
    async fn test_transport_failure_omits_url() {
        let client = HttpClient::new(&ScraperConfig::default()).unwrap();
        let url = "http://127.0.0.1:1/boxscores/202403150BOS.html";

        let err = client.get_text(url).await.unwrap_err();

        let FetchFailure::Transport(reason) = &err else {
            panic!("expected a transport failure, got {err:?}");
        };
        assert!(!reason.contains("202403150BOS"), "{reason}");
        assert!(!CrawlError::from(err).is_block_suspected());
    }
}
