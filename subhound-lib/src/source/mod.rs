//! Passive data sources which report hostnames for a domain.
//!
//! Every source implements [`Source`]. The set of built-in sources is
//! registered statically through [`SourceKind`]; each kind carries the
//! stable name that ends up in the `source` field of every record.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use strum::{EnumIter, EnumString, IntoEnumIterator, VariantNames};
use url::Url;

use crate::{ErrorKind, Result};

mod bufferover;
mod certspotter;
mod crtsh;
mod facebook;
mod findsubdomains;
mod hackertarget;
mod threatcrowd;
mod urlscan;
mod virustotal;
mod wayback;

pub(crate) use bufferover::BufferOverrun;
pub(crate) use certspotter::CertSpotter;
pub(crate) use crtsh::CrtSh;
pub(crate) use facebook::Facebook;
pub(crate) use findsubdomains::FindSubDomains;
pub(crate) use hackertarget::HackerTarget;
pub(crate) use threatcrowd::ThreatCrowd;
pub(crate) use urlscan::Urlscan;
pub(crate) use virustotal::VirusTotal;
pub(crate) use wayback::Wayback;

/// A data source which can be asked for the hostnames of a domain.
///
/// Implementations return raw names exactly as the upstream service reports
/// them. Normalization, filtering, and deduplication happen in the
/// dispatcher and merger.
#[async_trait]
pub trait Source: Send + Sync + Debug {
    /// Stable name of this source, used as rate-limit key and as the
    /// `source` field of records.
    ///
    /// Names must be unique: two sources with the same name would share one
    /// rate-limit slot and one output label. [`crate::Dispatcher::new`] keeps
    /// the first source registered under a name and ignores the rest.
    fn name(&self) -> &'static str;

    /// Query the source for hostnames belonging to `domain`.
    ///
    /// A result may be empty. A single entry may contain several names
    /// separated by line breaks.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be queried or its answer
    /// cannot be understood.
    async fn fetch(&self, domain: &str) -> Result<Vec<String>>;
}

/// The built-in sources
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    strum::Display,
    EnumIter,
    EnumString,
    VariantNames,
)]
#[non_exhaustive]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Certificate transparency search by SSLMate
    CertSpotter,
    /// Host search of hackertarget.com
    HackerTarget,
    /// ThreatCrowd domain reports
    ThreatCrowd,
    /// Certificate transparency logs via crt.sh
    CrtSh,
    /// Facebook's certificate transparency Graph API
    Facebook,
    /// URLs archived by the Wayback Machine
    Wayback,
    /// VirusTotal domain reports
    VirusTotal,
    /// Spyse subdomain search (formerly findsubdomains.com)
    FindSubDomains,
    /// Scans submitted to urlscan.io
    Urlscan,
    /// Forward and reverse DNS data from bufferover.run
    BufferOverrun,
}

impl SourceKind {
    /// The stable name reported in the `source` field of records
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SourceKind::CertSpotter => "CertSpotter",
            SourceKind::HackerTarget => "HackerTarget",
            SourceKind::ThreatCrowd => "ThreatCrowd",
            SourceKind::CrtSh => "CrtSh",
            SourceKind::Facebook => "Facebook",
            SourceKind::Wayback => "Wayback",
            SourceKind::VirusTotal => "VirusTotal",
            SourceKind::FindSubDomains => "FindSubDomains",
            SourceKind::Urlscan => "Urlscan",
            SourceKind::BufferOverrun => "BufferOverrun",
        }
    }

    /// All built-in sources in registration order
    pub fn all() -> impl Iterator<Item = SourceKind> {
        SourceKind::iter()
    }

    /// Instantiate the source, sharing `client` for all requests
    #[must_use]
    pub fn source(self, client: &Client, credentials: &Credentials) -> Arc<dyn Source> {
        let client = client.clone();
        match self {
            SourceKind::CertSpotter => Arc::new(CertSpotter::new(client)),
            SourceKind::HackerTarget => Arc::new(HackerTarget::new(client)),
            SourceKind::ThreatCrowd => Arc::new(ThreatCrowd::new(client)),
            SourceKind::CrtSh => Arc::new(CrtSh::new(client)),
            SourceKind::Facebook => Arc::new(Facebook::new(
                client,
                credentials.facebook_app_id.clone(),
                credentials.facebook_app_secret.clone(),
            )),
            SourceKind::Wayback => Arc::new(Wayback::new(client)),
            SourceKind::VirusTotal => Arc::new(VirusTotal::new(
                client,
                credentials.virustotal_api_key.clone(),
            )),
            SourceKind::FindSubDomains => Arc::new(FindSubDomains::new(
                client,
                credentials.spyse_api_token.clone(),
            )),
            SourceKind::Urlscan => Arc::new(Urlscan::new(client)),
            SourceKind::BufferOverrun => Arc::new(BufferOverrun::new(client)),
        }
    }
}

/// API credentials for the sources which require them.
///
/// Sources whose credential is missing fail without sending a request.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// VirusTotal API key
    pub virustotal_api_key: Option<SecretString>,
    /// Facebook app id used to obtain a Graph API token
    pub facebook_app_id: Option<SecretString>,
    /// Facebook app secret used to obtain a Graph API token
    pub facebook_app_secret: Option<SecretString>,
    /// Spyse API token
    pub spyse_api_token: Option<SecretString>,
}

/// Send a GET request and fail on non-success status codes
async fn get(client: &Client, url: Url) -> Result<Response> {
    client
        .get(url)
        .send()
        .await
        .and_then(Response::error_for_status)
        .map_err(ErrorKind::NetworkRequest)
}

/// GET `url` and return the response body as text
async fn get_text(client: &Client, url: Url) -> Result<String> {
    get(client, url)
        .await?
        .text()
        .await
        .map_err(ErrorKind::ReadResponseBody)
}

/// GET `url` and parse the response body as JSON
async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T> {
    let body = get_text(client, url).await?;
    serde_json::from_str(&body).map_err(ErrorKind::ParseJson)
}

/// Extract the host of a URL reported by a source.
/// Some sources omit the scheme, so a bare `host/path` is accepted as well.
fn host_of(raw: &str) -> Option<String> {
    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{raw}")).ok()?,
        Err(_) => return None,
    };
    parsed.host_str().map(ToString::to_string)
}
