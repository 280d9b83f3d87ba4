//! HTTP access to the upstream open-data documents.
//!
//! The build only ever needs two documents: the authority listing and one
//! raw dataset per authority. Both are plain JSON fetched with a GET.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

use crate::types::AuthorityListing;
use crate::{Error, Result};

/// Source of remote documents.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the body of `url` as text.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// HTTP client for upstream documents.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(60))
    }

    /// Fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hygiene-site/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            if status == StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!("no document at '{url}'")));
            }
            return Err(Error::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content = response.text().await?;
        info!("Fetched {} bytes from {}", content.len(), url);
        Ok(content)
    }
}

/// Fetch and parse the authority listing.
pub async fn fetch_authority_listing(
    fetcher: &dyn DocumentFetcher,
    url: &str,
) -> Result<AuthorityListing> {
    let body = fetcher.fetch_text(url).await?;
    let listing = AuthorityListing::from_json(&body)?;
    debug!(count = listing.authorities.len(), "parsed authority listing");
    Ok(listing)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Region;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = r#"{
        "authorities": [
            {
                "LocalAuthorityIdCode": 760,
                "Name": "Aberdeen City",
                "FriendlyName": "aberdeen-city",
                "RegionName": "Scotland",
                "FileName": "http://example.org/OpenDataFiles/FHRS760en-GB.json"
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_fetch_authority_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorities"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(5)).unwrap();
        let listing = fetch_authority_listing(&fetcher, &format!("{}/authorities", server.uri()))
            .await
            .unwrap();

        assert_eq!(listing.authorities.len(), 1);
        assert_eq!(listing.authorities[0].code, "760");
        assert_eq!(listing.authorities[0].region, Region::Scotland);
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(5)).unwrap();
        let err = fetcher
            .fetch_text(&format!("{}/FHRS1en-GB.json", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_server_error_is_recoverable_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch_text(&server.uri()).await.unwrap_err();

        assert!(matches!(err, Error::FetchStatus { status: 503, .. }), "got {err:?}");
        assert!(err.is_recoverable());
    }
}
