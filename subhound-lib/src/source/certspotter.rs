use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{Source, SourceKind, get_json};
use crate::Result;

static ENDPOINT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://api.certspotter.com/v1/issuances").unwrap());

/// Certificate issuances indexed by SSLMate's Cert Spotter
#[derive(Debug, Clone)]
pub(crate) struct CertSpotter {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct Issuance {
    #[serde(default)]
    dns_names: Vec<String>,
}

impl CertSpotter {
    pub(crate) fn new(client: Client) -> Self {
        Self::with_endpoint(client, ENDPOINT.clone())
    }

    pub(crate) const fn with_endpoint(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Source for CertSpotter {
    fn name(&self) -> &'static str {
        SourceKind::CertSpotter.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("domain", domain)
            .append_pair("include_subdomains", "true")
            .append_pair("expand", "dns_names");

        let issuances: Vec<Issuance> = get_json(&self.client, url).await?;
        Ok(issuances
            .into_iter()
            .flat_map(|issuance| issuance.dns_names)
            .collect())
    }
}
