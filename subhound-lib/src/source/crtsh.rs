use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{Source, SourceKind, get_json};
use crate::Result;

static ENDPOINT: LazyLock<Url> = LazyLock::new(|| Url::parse("https://crt.sh/").unwrap());

/// Certificate transparency logs, searched through crt.sh
#[derive(Debug, Clone)]
pub(crate) struct CrtSh {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct Entry {
    name_value: String,
}

impl CrtSh {
    pub(crate) fn new(client: Client) -> Self {
        Self::with_endpoint(client, ENDPOINT.clone())
    }

    pub(crate) const fn with_endpoint(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Source for CrtSh {
    fn name(&self) -> &'static str {
        SourceKind::CrtSh.name()
    }

    async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("%.{domain}"))
            .append_pair("output", "json");

        let entries: Vec<Entry> = get_json(&self.client, url).await?;
        // `name_value` may hold several names joined by line breaks;
        // splitting is left to the dispatcher.
        Ok(entries.into_iter().map(|entry| entry.name_value).collect())
    }
}
