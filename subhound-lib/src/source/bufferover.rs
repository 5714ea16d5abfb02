use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{Source, SourceKind, get_json};
use crate::Result;

static ENDPOINT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://dns.bufferover.run/dns").unwrap());

/// Forward and reverse DNS datasets served by bufferover.run
#[derive(Debug, Clone)]
pub(crate) struct BufferOverrun {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(rename = "FDNS_A", default)]
    forward: Option<Vec<String>>,
    #[serde(rename = "RDNS", default)]
    reverse: Option<Vec<String>>,
}

impl BufferOverrun {
    pub(crate) fn new(client: Client) -> Self {
        Self::with_endpoint(client, ENDPOINT.clone())
    }

    pub(crate) const fn with_endpoint(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Source for BufferOverrun {
    fn name(&self) -> &'static str {
        SourceKind::BufferOverrun.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("q", &format!(".{domain}"));

        let response: Response = get_json(&self.client, url).await?;
        // Entries look like `ip,hostname`
        Ok(response
            .forward
            .into_iter()
            .chain(response.reverse)
            .flatten()
            .filter_map(|entry| {
                entry
                    .split_once(',')
                    .map(|(_ip, host)| host.to_string())
            })
            .collect())
    }
}
