use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{Source, SourceKind, get_json, host_of};
use crate::Result;

static CDX_API: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://web.archive.org/cdx/search/cdx").unwrap());

/// Hosts of URLs archived by the Wayback Machine
#[derive(Debug, Clone)]
pub(crate) struct Wayback {
    client: Client,
    endpoint: Url,
}

impl Wayback {
    pub(crate) fn new(client: Client) -> Self {
        Self::with_endpoint(client, CDX_API.clone())
    }

    pub(crate) const fn with_endpoint(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Source for Wayback {
    fn name(&self) -> &'static str {
        SourceKind::Wayback.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("url", &format!("*.{domain}/*"))
            .append_pair("output", "json")
            .append_pair("fl", "original")
            .append_pair("collapse", "urlkey");

        // The first row is the header (`["original"]`)
        let rows: Vec<Vec<String>> = get_json(&self.client, url).await?;

        // Every archived URL repeats its host, so identical hosts are
        // collapsed here rather than sent through the pipeline thousands
        // of times.
        let mut seen = HashSet::new();
        Ok(rows
            .iter()
            .skip(1)
            .filter_map(|row| row.first())
            .filter_map(|original| host_of(original))
            .filter(|host| seen.insert(host.clone()))
            .collect())
    }
}
