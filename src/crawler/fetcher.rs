//! HTTP fetcher implementation
//!
//! This module handles all page-level HTTP requests, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch documentation pages
//! - HEAD probes used by the search strategies
//! - Error classification into [`CallError`]
//!
//! Retries, timeouts and backoff are not handled here; callers wrap every
//! request in the [`ResilientCaller`](crate::resilience::ResilientCaller).

use crate::config::UserAgentConfig;
use crate::resilience::CallError;
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for a single request
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// Page body content
    pub body: String,
}

/// Page fetching and existence probing
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches an HTML page
    ///
    /// Non-HTML responses are reported as `CallError::Rejected`.
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, CallError>;

    /// Checks that `url` answers a HEAD request with a success status
    async fn probe(&self, url: &str) -> Result<(), CallError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use doc_harvest::config::UserAgentConfig;
/// use doc_harvest::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "DocHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`Fetcher`]
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, CallError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CallError::from_status(status.as_u16(), url.as_str()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_html_content_type(&content_type) {
            return Err(CallError::Rejected(format!(
                "unsupported content type '{}' at {}",
                content_type, url
            )));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::Transient(format!("failed to read body: {}", e)))?;

        Ok(FetchedPage { final_url, body })
    }

    async fn probe(&self, url: &str) -> Result<(), CallError> {
        tracing::debug!("HEAD {}", url);

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CallError::from_status(status.as_u16(), url))
        }
    }
}

/// A missing Content-Type is given the benefit of the doubt
fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "0.1".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&user_agent()).unwrap()
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(is_html_content_type(""));
        assert!(!is_html_content_type("application/pdf"));
        assert!(!is_html_content_type("application/json"));
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><title>Docs</title></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/docs/", server.uri())).unwrap();
        let page = fetcher().fetch_page(&url).await.unwrap();

        assert_eq!(page.final_url, url);
        assert!(page.body.contains("<title>Docs</title>"));
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("location", format!("{}/docs/new", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/new"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("new", "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let page = fetcher().fetch_page(&url).await.unwrap();
        assert_eq!(page.final_url.path(), "/docs/new");
    }

    #[tokio::test]
    async fn test_fetch_classifies_status() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(path("/slow-down"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let fetcher = fetcher();
        let get = |p: &str| Url::parse(&format!("{}{}", server.uri(), p)).unwrap();

        assert!(matches!(
            fetcher.fetch_page(&get("/missing")).await,
            Err(CallError::Rejected(_))
        ));
        assert!(matches!(
            fetcher.fetch_page(&get("/busy")).await,
            Err(CallError::Transient(_))
        ));
        assert!(matches!(
            fetcher.fetch_page(&get("/slow-down")).await,
            Err(CallError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_html() {
        let server = MockServer::start().await;
        Mock::given(path("/docs/guide.pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0u8; 16], "application/pdf"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/docs/guide.pdf", server.uri())).unwrap();
        assert!(matches!(
            fetcher().fetch_page(&url).await,
            Err(CallError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_probe() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/react/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let fetcher = fetcher();
        assert!(fetcher
            .probe(&format!("{}/react/", server.uri()))
            .await
            .is_ok());
        // Unmatched requests get wiremock's default 404
        assert!(matches!(
            fetcher.probe(&format!("{}/nothing/", server.uri())).await,
            Err(CallError::Rejected(_))
        ));
    }
}
