use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{Source, SourceKind, get_json};
use crate::{ErrorKind, Result};

static ENDPOINT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://www.virustotal.com/vtapi/v2/domain/report").unwrap());

/// Domain reports of VirusTotal; needs an API key
#[derive(Debug, Clone)]
pub(crate) struct VirusTotal {
    client: Client,
    endpoint: Url,
    api_key: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    subdomains: Vec<String>,
}

impl VirusTotal {
    pub(crate) fn new(client: Client, api_key: Option<SecretString>) -> Self {
        Self::with_endpoint(client, ENDPOINT.clone(), api_key)
    }

    pub(crate) const fn with_endpoint(
        client: Client,
        endpoint: Url,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl Source for VirusTotal {
    fn name(&self) -> &'static str {
        SourceKind::VirusTotal.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let api_key = self.api_key.as_ref().ok_or(ErrorKind::MissingCredential {
            name: self.name(),
            variable: "VT_API_KEY",
        })?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("domain", domain)
            .append_pair("apikey", api_key.expose_secret());

        let report: Report = get_json(&self.client, url).await?;
        Ok(report.subdomains)
    }
}
