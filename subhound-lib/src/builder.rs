//! Configuration of a [`Dispatcher`] with the built-in sources.
#![allow(clippy::module_name_repetitions)]
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use typed_builder::TypedBuilder;

use crate::ratelimit::DEFAULT_INTERVAL;
use crate::source::{Credentials, Source, SourceKind};
use crate::{Dispatcher, ErrorKind, Result};

/// Default timeout in seconds before a source request is abandoned, 20.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Default user agent, `subhound/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("subhound/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Dispatcher`].
///
/// ```
/// use std::time::Duration;
/// use subhound_lib::{DispatcherBuilder, SourceKind};
///
/// # fn main() -> subhound_lib::Result<()> {
/// let dispatcher = DispatcherBuilder::builder()
///     .sources(vec![SourceKind::CrtSh, SourceKind::CertSpotter])
///     .interval(Duration::from_secs(2))
///     .subdomains_only(true)
///     .build()
///     .dispatcher()?;
/// assert_eq!(dispatcher.source_names().count(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `DispatcherBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `DispatcherBuilder`.
"))]
pub struct DispatcherBuilder {
    /// User-agent sent with every source request.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
    /// Timeout for a single source request, including reading the body.
    ///
    /// `None` waits forever, in which case a hanging source keeps the
    /// whole run from finishing.
    #[builder(default = Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))]
    timeout: Option<Duration>,
    /// Minimum interval between two requests to the same source.
    #[builder(default = DEFAULT_INTERVAL)]
    interval: Duration,
    /// Only report hosts which end with the queried domain.
    subdomains_only: bool,
    /// Maximum number of source queries in flight. Unbounded if `None`.
    max_concurrency: Option<usize>,
    /// Sources to query. All built-in sources if empty.
    sources: Vec<SourceKind>,
    /// API credentials for the sources which require them.
    credentials: Credentials,
}

impl Default for DispatcherBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DispatcherBuilder {
    /// Instantiates a [`Dispatcher`] with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn dispatcher(self) -> Result<Dispatcher> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&self.user_agent).map_err(ErrorKind::InvalidHeader)?,
        );

        let builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers);

        let client = (match self.timeout {
            Some(t) => builder.timeout(t),
            None => builder,
        })
        .build()
        .map_err(ErrorKind::BuildClient)?;

        let mut kinds = if self.sources.is_empty() {
            SourceKind::all().collect()
        } else {
            self.sources
        };
        let mut seen = HashSet::new();
        kinds.retain(|kind| seen.insert(*kind));
        let sources: Vec<Arc<dyn Source>> = kinds
            .into_iter()
            .map(|kind| kind.source(&client, &self.credentials))
            .collect();

        let dispatcher = Dispatcher::new(sources, self.interval, self.subdomains_only);
        Ok(match self.max_concurrency {
            Some(max) => dispatcher.with_max_concurrency(max),
            None => dispatcher,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_registers_all_sources() {
        let dispatcher = DispatcherBuilder::default().dispatcher().unwrap();
        let names: Vec<_> = dispatcher.source_names().collect();
        let expected: Vec<_> = SourceKind::all().map(SourceKind::name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_selected_sources() {
        let dispatcher = DispatcherBuilder::builder()
            .sources(vec![SourceKind::Wayback, SourceKind::CrtSh])
            .build()
            .dispatcher()
            .unwrap();
        assert_eq!(
            dispatcher.source_names().collect::<Vec<_>>(),
            vec!["Wayback", "CrtSh"]
        );
    }

    #[test]
    fn test_repeated_sources_are_registered_once() {
        let dispatcher = DispatcherBuilder::builder()
            .sources(vec![SourceKind::CrtSh, SourceKind::Wayback, SourceKind::CrtSh])
            .build()
            .dispatcher()
            .unwrap();
        assert_eq!(
            dispatcher.source_names().collect::<Vec<_>>(),
            vec!["CrtSh", "Wayback"]
        );
    }

    #[test]
    fn test_invalid_user_agent() {
        let result = DispatcherBuilder::builder()
            .user_agent("bad\nagent")
            .build()
            .dispatcher();
        assert!(matches!(result, Err(ErrorKind::InvalidHeader(_))));
    }
}
