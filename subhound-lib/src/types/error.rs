use serde::{Serialize, Serializer};
use thiserror::Error;

/// Possible errors when interacting with `subhound_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network error while sending a request to a source
    #[error("Network error while querying a source endpoint")]
    NetworkRequest(#[source] reqwest::Error),

    /// Error while reading the response body of a source
    #[error("Error reading response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The source answered with something that isn't the expected JSON
    #[error("Cannot parse source response as JSON")]
    ParseJson(#[source] serde_json::Error),

    /// A source endpoint or a URL returned by a source could not be parsed
    #[error("Cannot parse URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A source needs a credential which wasn't configured
    #[error("{name} requires a credential; set `{variable}` to enable it")]
    MissingCredential {
        /// Name of the source which needs the credential
        name: &'static str,
        /// Environment variable (or CLI flag) that provides it
        variable: &'static str,
    },

    /// The HTTP client shared by all sources could not be created
    #[error("Failed to create request client: {0}")]
    BuildClient(#[source] reqwest::Error),

    /// The configured user agent isn't a valid header value
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// A record could not be serialized for output
    #[error("Cannot serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ErrorKind {
    /// Return `true` if the error was caused by the remote side
    /// (network, status code, or body), as opposed to local configuration.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::NetworkRequest(_) | Self::ReadResponseBody(_) | Self::ParseJson(_)
        )
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
