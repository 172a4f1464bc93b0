//! Authenticated HTTP client for the Confluence REST API.
//!
//! Two endpoints are used: single-page fetch with the storage-format body
//! expanded, and paginated child-page listing. Every request is a single
//! attempt; failures are logged by callers and degrade to partial results.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use incidesk_shared::{IncideskError, PageRef, Result};

/// User-Agent string for document-API requests.
const USER_AGENT: &str = concat!("Incidesk/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Connection options for [`ConfluenceClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// REST API base URL, e.g. `https://acme.atlassian.net/wiki/rest/api`.
    pub base_url: Url,
    /// Account email for basic auth.
    pub email: String,
    /// API token paired with the email.
    pub api_token: String,
    /// Child-listing page size.
    pub page_limit: u32,
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    body: Option<PageBody>,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    storage: Option<StorageBody>,
}

#[derive(Debug, Deserialize)]
struct StorageBody {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ChildListing {
    #[serde(default)]
    results: Vec<ChildEntry>,
}

#[derive(Debug, Deserialize)]
struct ChildEntry {
    id: String,
    title: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the document source API.
pub struct ConfluenceClient {
    client: Client,
    options: ClientOptions,
}

impl ConfluenceClient {
    /// Create a new client with the given options.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IncideskError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, options })
    }

    /// Build an endpoint URL under the configured base.
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.options.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    /// Fetch a page's raw storage-format body.
    ///
    /// A non-200 response is an error: no retry, no backoff. Callers decide
    /// whether to degrade or abort.
    pub async fn fetch_page_body(&self, page_id: &str) -> Result<String> {
        let url = self.endpoint(&format!("content/{page_id}"));
        debug!(page_id, "fetching page body");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.options.email, Some(&self.options.api_token))
            .query(&[("expand", "body.storage")])
            .send()
            .await
            .map_err(|e| IncideskError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IncideskError::Network(format!(
                "content/{page_id}: HTTP {status}"
            )));
        }

        let page: PageResponse = response
            .json()
            .await
            .map_err(|e| IncideskError::parse(format!("content/{page_id}: {e}")))?;

        page.body
            .and_then(|b| b.storage)
            .map(|s| s.value)
            .ok_or_else(|| {
                IncideskError::parse(format!("content/{page_id}: no storage body in response"))
            })
    }

    /// List all direct children of a page, following offset/limit pagination
    /// until a short page is returned.
    ///
    /// A non-200 response mid-pagination stops the listing and returns
    /// whatever was collected so far.
    pub async fn fetch_children(&self, parent_id: &str) -> Result<Vec<PageRef>> {
        let url = self.endpoint(&format!("content/{parent_id}/child/page"));
        let limit = self.options.page_limit;

        let mut all_pages = Vec::new();
        let mut start: u32 = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .basic_auth(&self.options.email, Some(&self.options.api_token))
                .query(&[("start", start), ("limit", limit)])
                .send()
                .await
                .map_err(|e| IncideskError::Network(format!("{url}: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                warn!(
                    parent_id,
                    %status,
                    collected = all_pages.len(),
                    "child listing failed, returning partial results"
                );
                break;
            }

            let listing: ChildListing = response
                .json()
                .await
                .map_err(|e| IncideskError::parse(format!("{url}: {e}")))?;

            let page_count = listing.results.len();
            all_pages.extend(
                listing
                    .results
                    .into_iter()
                    .map(|c| PageRef {
                        id: c.id,
                        title: c.title,
                    }),
            );

            if page_count < limit as usize {
                break;
            }
            start += limit;
        }

        debug!(parent_id, children = all_pages.len(), "child listing done");
        Ok(all_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_options(base: &str) -> ClientOptions {
        ClientOptions {
            base_url: Url::parse(base).expect("base url"),
            email: "ops@acme.example".into(),
            api_token: "token".into(),
            page_limit: 500,
        }
    }

    fn child_body(range: std::ops::Range<usize>) -> serde_json::Value {
        let results: Vec<_> = range
            .map(|i| serde_json::json!({"id": format!("{i}"), "title": format!("Page {i}")}))
            .collect();
        serde_json::json!({ "results": results })
    }

    #[tokio::test]
    async fn fetch_page_body_extracts_storage_value() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/content/42"))
            .and(query_param("expand", "body.storage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "body": { "storage": { "value": "<p>disk full</p>" } }
            })))
            .mount(&server)
            .await;

        let client = ConfluenceClient::new(test_options(&server.uri())).unwrap();
        let body = client.fetch_page_body("42").await.unwrap();
        assert_eq!(body, "<p>disk full</p>");
    }

    #[tokio::test]
    async fn fetch_page_body_non_200_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/content/42"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ConfluenceClient::new(test_options(&server.uri())).unwrap();
        let err = client.fetch_page_body("42").await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn fetch_children_concatenates_pages_until_short_page() {
        let server = MockServer::start().await;

        // Three pages of 500/500/17 results: 1017 children total.
        Mock::given(method("GET"))
            .and(path("/content/1/child/page"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(child_body(0..500)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/content/1/child/page"))
            .and(query_param("start", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(child_body(500..1000)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/content/1/child/page"))
            .and(query_param("start", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(child_body(1000..1017)))
            .mount(&server)
            .await;

        let client = ConfluenceClient::new(test_options(&server.uri())).unwrap();
        let children = client.fetch_children("1").await.unwrap();
        assert_eq!(children.len(), 1017);
        assert_eq!(children[0].id, "0");
        assert_eq!(children[1016].title, "Page 1016");
    }

    #[tokio::test]
    async fn fetch_children_returns_partial_on_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/content/1/child/page"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(child_body(0..500)))
            .mount(&server)
            .await;

        // Second page fails: the first 500 results still come back.
        Mock::given(method("GET"))
            .and(path("/content/1/child/page"))
            .and(query_param("start", "500"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ConfluenceClient::new(test_options(&server.uri())).unwrap();
        let children = client.fetch_children("1").await.unwrap();
        assert_eq!(children.len(), 500);
    }

    #[tokio::test]
    async fn fetch_children_empty_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/content/7/child/page"))
            .respond_with(ResponseTemplate::new(200).set_body_json(child_body(0..0)))
            .mount(&server)
            .await;

        let client = ConfluenceClient::new(test_options(&server.uri())).unwrap();
        let children = client.fetch_children("7").await.unwrap();
        assert!(children.is_empty());
    }
}
