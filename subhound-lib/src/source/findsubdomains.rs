use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{Source, SourceKind, get_json};
use crate::{ErrorKind, Result};

static ENDPOINT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://api.spyse.com/v1/subdomains").unwrap());

/// Subdomain search of Spyse, the successor of findsubdomains.com;
/// needs an API token
#[derive(Debug, Clone)]
pub(crate) struct FindSubDomains {
    client: Client,
    endpoint: Url,
    api_token: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    records: Vec<SubdomainRecord>,
}

#[derive(Debug, Deserialize)]
struct SubdomainRecord {
    domain: String,
}

impl FindSubDomains {
    pub(crate) fn new(client: Client, api_token: Option<SecretString>) -> Self {
        Self::with_endpoint(client, ENDPOINT.clone(), api_token)
    }

    pub(crate) const fn with_endpoint(
        client: Client,
        endpoint: Url,
        api_token: Option<SecretString>,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_token,
        }
    }
}

#[async_trait]
impl Source for FindSubDomains {
    fn name(&self) -> &'static str {
        SourceKind::FindSubDomains.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let api_token = self
            .api_token
            .as_ref()
            .ok_or(ErrorKind::MissingCredential {
                name: self.name(),
                variable: "SPYSE_API_TOKEN",
            })?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("domain", domain)
            .append_pair("api_token", api_token.expose_secret());

        let response: Response = get_json(&self.client, url).await?;
        Ok(response
            .records
            .into_iter()
            .map(|record| record.domain)
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
    async fn test_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("domain", "example.com"))
            .and(query_param("api_token", "token"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"records": [{"domain": "x.example.com", "ip": "1.2.3.4"}], "count": 1}"#,
                "application/json",
            ))
            .mount(&mock_server)
            .await;

        let source = FindSubDomains::with_endpoint(
            Client::new(),
            mock_server.uri().parse().unwrap(),
            Some(SecretString::from(String::from("token"))),
        );
        assert_eq!(source.fetch("example.com").await.unwrap(), vec!["x.example.com"]);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let source = FindSubDomains::new(Client::new(), None);
        assert!(matches!(
            source.fetch("example.com").await,
            Err(ErrorKind::MissingCredential { .. })
        ));
    }
}
