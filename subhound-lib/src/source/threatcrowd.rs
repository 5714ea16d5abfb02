use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{Source, SourceKind, get_json};
use crate::Result;

static ENDPOINT: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://www.threatcrowd.org/searchApi/v2/domain/report/").unwrap()
});

/// Domain reports of ThreatCrowd
#[derive(Debug, Clone)]
pub(crate) struct ThreatCrowd {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    subdomains: Vec<String>,
}

impl ThreatCrowd {
    pub(crate) fn new(client: Client) -> Self {
        Self::with_endpoint(client, ENDPOINT.clone())
    }

    pub(crate) const fn with_endpoint(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Source for ThreatCrowd {
    fn name(&self) -> &'static str {
        SourceKind::ThreatCrowd.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("domain", domain);

        let report: Report = get_json(&self.client, url).await?;
        Ok(report.subdomains)
    }
}
