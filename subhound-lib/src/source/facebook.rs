use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use log::trace;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{Source, SourceKind, get_json};
use crate::{ErrorKind, Result};

static GRAPH_API: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://graph.facebook.com/").unwrap());

/// Certificate transparency search of Facebook's Graph API.
///
/// Needs an app id and secret, which are exchanged for an app access token
/// on every search.
#[derive(Debug, Clone)]
pub(crate) struct Facebook {
    client: Client,
    graph_api: Url,
    app_id: Option<SecretString>,
    app_secret: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CertificatePage {
    #[serde(default)]
    data: Vec<Certificate>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Certificate {
    #[serde(default)]
    domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<String>,
}

impl Facebook {
    pub(crate) fn new(
        client: Client,
        app_id: Option<SecretString>,
        app_secret: Option<SecretString>,
    ) -> Self {
        Self::with_endpoint(client, GRAPH_API.clone(), app_id, app_secret)
    }

    pub(crate) const fn with_endpoint(
        client: Client,
        graph_api: Url,
        app_id: Option<SecretString>,
        app_secret: Option<SecretString>,
    ) -> Self {
        Self {
            client,
            graph_api,
            app_id,
            app_secret,
        }
    }

    async fn access_token(&self) -> Result<String> {
        let (Some(app_id), Some(app_secret)) = (&self.app_id, &self.app_secret) else {
            return Err(ErrorKind::MissingCredential {
                name: self.name(),
                variable: "FB_APP_ID and FB_APP_SECRET",
            });
        };

        let mut url = self.graph_api.join("oauth/access_token")?;
        url.query_pairs_mut()
            .append_pair("client_id", app_id.expose_secret())
            .append_pair("client_secret", app_secret.expose_secret())
            .append_pair("grant_type", "client_credentials");

        let token: AccessToken = get_json(&self.client, url).await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl Source for Facebook {
    fn name(&self) -> &'static str {
        SourceKind::Facebook.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let token = self.access_token().await?;

        let mut url = self.graph_api.join("certificates")?;
        url.query_pairs_mut()
            .append_pair("fields", "domains")
            .append_pair("access_token", &token)
            .append_pair("query", &format!("*.{domain}"));

        let mut names = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                break;
            }
            let page: CertificatePage = get_json(&self.client, url).await?;
            names.extend(page.data.into_iter().flat_map(|cert| cert.domains));

            next = match page.paging.and_then(|paging| paging.next) {
                Some(next) => Some(Url::parse(&next)?),
                None => None,
            };
            trace!("Facebook: {} names so far for {domain}", names.len());
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn credentials() -> (Option<SecretString>, Option<SecretString>) {
        (
            Some(SecretString::from(String::from("app-id"))),
            Some(SecretString::from(String::from("app-secret"))),
        )
    }

    #[tokio::test]
    async fn test_fetch_follows_pagination() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/access_token"))
            .and(query_param("client_id", "app-id"))
            .and(query_param("client_secret", "app-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"access_token": "tok", "token_type": "bearer"}"#,
                "application/json",
            ))
            .mount(&mock_server)
            .await;

        let second_page = format!("{}/page2", mock_server.uri());
        Mock::given(method("GET"))
            .and(path("/certificates"))
            .and(query_param("access_token", "tok"))
            .and(query_param("query", "*.example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!(
                    r#"{{"data": [{{"domains": ["a.example.com"], "id": "1"}}],
                        "paging": {{"next": "{second_page}"}}}}"#
                ),
                "application/json",
            ))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"data": [{"domains": ["b.example.com", "*.example.com"], "id": "2"}]}"#,
                "application/json",
            ))
            .mount(&mock_server)
            .await;

        let (app_id, app_secret) = credentials();
        let graph_api = format!("{}/", mock_server.uri()).parse().unwrap();
        let source = Facebook::with_endpoint(Client::new(), graph_api, app_id, app_secret);
        assert_eq!(
            source.fetch("example.com").await.unwrap(),
            vec!["a.example.com", "b.example.com", "*.example.com"]
        );
    }

    #[tokio::test]
    async fn test_missing_secret() {
        let (app_id, _) = credentials();
        let source = Facebook::new(Client::new(), app_id, None);
        assert!(matches!(
            source.fetch("example.com").await,
            Err(ErrorKind::MissingCredential { .. })
        ));
    }
}
