use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; Linkcard/0.1; +https://github.com/trapdoorsec/linkcard)";

/// Raw response handed back by a [`Fetcher`]. Non-2xx statuses are not errors.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network collaborator used by the extractor and the enrichment pipeline.
///
/// Implementations only fail on transport problems; the caller inspects the status.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        method: Method,
        headers: &[(&str, &str)],
    ) -> Result<FetchResponse>;
}

/// reqwest-backed fetcher with pooled connections and a bounded redirect policy.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(15)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ScanError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        method: Method,
        headers: &[(&str, &str)],
    ) -> Result<FetchResponse> {
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[tokio::test]
    async fn test_non_success_status_is_not_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let response = fetcher
            .fetch(&format!("{}/missing", mock_server.uri()), Method::GET, &[])
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.body, "nope");
    }

    #[tokio::test]
    async fn test_custom_headers_are_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/img.png"))
            .and(header("x-probe", "1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let response = fetcher
            .fetch(
                &format!("{}/img.png", mock_server.uri()),
                Method::HEAD,
                &[("x-probe", "1")],
            )
            .await
            .unwrap();

        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let fetcher = HttpFetcher::with_timeout(2).unwrap();
        let result = fetcher
            .fetch("http://127.0.0.1:9/", Method::GET, &[])
            .await;
        assert!(matches!(result, Err(ScanError::HttpError(_))));
    }
}
