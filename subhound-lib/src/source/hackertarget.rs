use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{Source, SourceKind, get_text};
use crate::Result;

static ENDPOINT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://api.hackertarget.com/hostsearch/").unwrap());

/// Host search of hackertarget.com
#[derive(Debug, Clone)]
pub(crate) struct HackerTarget {
    client: Client,
    endpoint: Url,
}

impl HackerTarget {
    pub(crate) fn new(client: Client) -> Self {
        Self::with_endpoint(client, ENDPOINT.clone())
    }

    pub(crate) const fn with_endpoint(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

/// The API answers with `host,ip` lines.
/// Lines without a comma are status messages such as quota warnings.
fn parse_hosts(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.split_once(','))
        .map(|(host, _ip)| host.trim().to_string())
        .filter(|host| !host.is_empty())
        .collect()
}

#[async_trait]
impl Source for HackerTarget {
    fn name(&self) -> &'static str {
        SourceKind::HackerTarget.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("q", domain);

        let body = get_text(&self.client, url).await?;
        Ok(parse_hosts(&body))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_parse_hosts_skips_status_lines() {
        let body = "www.example.com,93.184.216.34\n\
                    API count exceeded - Increase Quota with Membership\n\
                    mail.example.com,93.184.216.35\n";
        assert_eq!(parse_hosts(body), vec!["www.example.com", "mail.example.com"]);
    }

    #[tokio::test]
    async fn test_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "example.com"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("dev.example.com,10.0.0.1"),
            )
            .mount(&mock_server)
            .await;

        let source = HackerTarget::with_endpoint(Client::new(), mock_server.uri().parse().unwrap());
        assert_eq!(source.fetch("example.com").await.unwrap(), vec!["dev.example.com"]);
    }
}
