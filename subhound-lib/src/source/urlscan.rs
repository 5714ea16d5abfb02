use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{Source, SourceKind, get_json, host_of};
use crate::Result;

static ENDPOINT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://urlscan.io/api/v1/search/").unwrap());

/// Public scans submitted to urlscan.io
#[derive(Debug, Clone)]
pub(crate) struct Urlscan {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ScanResult>,
}

#[derive(Debug, Deserialize)]
struct ScanResult {
    task: Option<Location>,
    page: Option<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    url: Option<String>,
}

impl Urlscan {
    pub(crate) fn new(client: Client) -> Self {
        Self::with_endpoint(client, ENDPOINT.clone())
    }

    pub(crate) const fn with_endpoint(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Source for Urlscan {
    fn name(&self) -> &'static str {
        SourceKind::Urlscan.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("domain:{domain}"));

        let response: SearchResponse = get_json(&self.client, url).await?;
        // The submitted URL (task) and the final URL after redirects (page)
        // may point to different hosts
        Ok(response
            .results
            .into_iter()
            .flat_map(|result| [result.task, result.page])
            .flatten()
            .filter_map(|location| location.url)
            .filter_map(|url| host_of(&url))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_fetch_reads_task_and_page_urls() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "domain:example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"results": [
                    {"task": {"url": "https://example.com/"}, "page": {"url": "https://www.example.com/"}},
                    {"task": {"url": "http://shop.example.com/cart"}},
                    {"page": {}}
                ], "total": 3}"#,
                "application/json",
            ))
            .mount(&mock_server)
            .await;

        let source = Urlscan::with_endpoint(Client::new(), mock_server.uri().parse().unwrap());
        assert_eq!(
            source.fetch("example.com").await.unwrap(),
            vec!["example.com", "www.example.com", "shop.example.com"]
        );
    }
}
