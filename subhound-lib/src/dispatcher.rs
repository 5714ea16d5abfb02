//! Fan-out of every input domain to every registered source.
//!
//! [`Dispatcher::run`] spawns one task per (domain, source) pair. Each task
//! waits for its source's rate-limit slot, queries the source, and forwards
//! normalized [`Finding`]s into a channel. The returned stream ends once the
//! input is exhausted and every task has finished.
use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use log::{debug, error, warn};
use tokio::sync::{Semaphore, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::normalize::normalize;
use crate::ratelimit::{RateLimiter, SourceKey};
use crate::{Finding, Record, Source};

/// Number of findings buffered between the source tasks and the consumer
const CHANNEL_BUFFER: usize = 128;

/// Queries all registered sources for every domain it is given.
///
/// Cloning is cheap; clones share the sources, the rate limiter, and the
/// concurrency bound.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sources: Arc<[(SourceKey, Arc<dyn Source>)]>,
    limiter: Arc<RateLimiter>,
    subdomains_only: bool,
    permits: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    /// Create a dispatcher for the given sources.
    ///
    /// Each source is rate limited by its [`Source::name`], so that two calls
    /// to the same source start at least `interval` apart. With
    /// `subdomains_only`, hosts which don't end with the queried domain are
    /// dropped.
    ///
    /// Names identify sources: a source whose name is already registered is
    /// skipped with a warning, so every source is queried once per domain.
    #[must_use]
    pub fn new<I>(sources: I, interval: Duration, subdomains_only: bool) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        let mut registered = HashSet::new();
        let sources = sources
            .into_iter()
            .filter_map(|source| {
                let key = SourceKey::from(source.name());
                if registered.insert(key) {
                    Some((key, source))
                } else {
                    warn!("Source {key} is registered more than once, ignoring duplicate");
                    None
                }
            })
            .collect();
        Self {
            sources,
            limiter: Arc::new(RateLimiter::new(interval)),
            subdomains_only,
            permits: None,
        }
    }

    /// Bound the number of source queries in flight at the same time
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.permits = Some(Arc::new(Semaphore::new(max_concurrency.max(1))));
        self
    }

    /// Names of the registered sources in registration order
    pub fn source_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sources.iter().map(|(key, _)| key.as_str())
    }

    /// Query every registered source for every domain of `domains`.
    ///
    /// Domains are trimmed and lowercased, blank ones are skipped.
    /// Sources which fail are skipped silently, so the stream may be
    /// shorter than expected but never ends early. Findings arrive in no
    /// particular order and may contain duplicates; see
    /// [`Merger`](crate::Merger).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run<S>(&self, domains: S) -> impl Stream<Item = Finding> + use<S>
    where
        S: Stream<Item = String> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        let dispatcher = self.clone();

        tokio::spawn(async move {
            let mut domains = pin!(domains);
            while let Some(line) = domains.next().await {
                let domain = line.trim().to_lowercase();
                if domain.is_empty() {
                    continue;
                }
                debug!("Dispatching {domain} to {} sources", dispatcher.sources.len());

                for (key, source) in dispatcher.sources.iter() {
                    tokio::spawn(dispatcher.clone().query(
                        *key,
                        Arc::clone(source),
                        domain.clone(),
                        tx.clone(),
                    ));
                }
            }
            // The last sender is owned by the running tasks now; the
            // stream ends when the final one finishes.
        });

        ReceiverStream::new(rx)
    }

    /// Query one source for one domain and send its findings to `tx`
    async fn query(
        self,
        key: SourceKey,
        source: Arc<dyn Source>,
        domain: String,
        tx: mpsc::Sender<Finding>,
    ) {
        let _permit = match &self.permits {
            Some(permits) => match Arc::clone(permits).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => return,
            },
            None => None,
        };

        self.limiter.block(&key).await;

        let names = match source.fetch(&domain).await {
            Ok(names) => names,
            Err(e) => {
                debug!("{key}: skipping {domain}: {e}");
                return;
            }
        };
        debug!("{key}: {} raw names for {domain}", names.len());

        for host in names.iter().flat_map(|raw| split_names(raw)).map(normalize) {
            if self.subdomains_only && !host.ends_with(&domain) {
                continue;
            }

            let finding = match Finding::new(Record::new(host, domain.as_str(), key.as_str())) {
                Ok(finding) => finding,
                Err(e) => {
                    error!("{key}: giving up on {domain}: {e}");
                    return;
                }
            };

            if tx.send(finding).await.is_err() {
                // Receiver is gone, nobody is listening anymore
                return;
            }
        }
    }
}

/// Split a raw entry that may hold several names separated by line breaks
fn split_names(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('\n')
        .map(|name| name.trim_end_matches('\r'))
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    use super::*;
    use crate::{ErrorKind, Result};

    const INTERVAL: Duration = Duration::from_secs(1);

    #[derive(Debug)]
    struct Fixed {
        name: &'static str,
        names: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, names: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                name,
                names: names.to_vec(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Source for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _domain: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.names.iter().map(ToString::to_string).collect())
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl Source for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        async fn fetch(&self, _domain: &str) -> Result<Vec<String>> {
            Err(ErrorKind::MissingCredential {
                name: "Failing",
                variable: "FAILING_KEY",
            })
        }
    }

    fn domains(domains: &[&str]) -> impl Stream<Item = String> + Send + use<> {
        futures::stream::iter(domains.iter().map(ToString::to_string).collect::<Vec<_>>())
    }

    async fn collect(dispatcher: &Dispatcher, input: &[&str]) -> HashSet<Record> {
        dispatcher
            .run(domains(input))
            .map(Finding::into_record)
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_wildcards_and_line_breaks() {
        let source = Fixed::new("X", &["*.Example.com", "sub1.example.com\nsub2.example.com"]);
        let dispatcher = Dispatcher::new([source as Arc<dyn Source>], INTERVAL, false);

        let records = collect(&dispatcher, &["Example.COM"]).await;
        let expected: HashSet<_> = [
            Record::new("example.com", "example.com", "X"),
            Record::new("sub1.example.com", "example.com", "X"),
            Record::new("sub2.example.com", "example.com", "X"),
        ]
        .into_iter()
        .collect();
        assert_eq!(records, expected);
    }

    #[tokio::test]
    async fn test_subdomains_only_filters_foreign_hosts() {
        let source = Fixed::new("X", &["evil.com", "www.example.com"]);
        let dispatcher = Dispatcher::new([source as Arc<dyn Source>], INTERVAL, true);

        let records = collect(&dispatcher, &["example.com"]).await;
        assert_eq!(
            records,
            HashSet::from([Record::new("www.example.com", "example.com", "X")])
        );
    }

    #[tokio::test]
    async fn test_without_filter_foreign_hosts_pass() {
        let source = Fixed::new("X", &["evil.com"]);
        let dispatcher = Dispatcher::new([source as Arc<dyn Source>], INTERVAL, false);

        let records = collect(&dispatcher, &["example.com"]).await;
        assert_eq!(
            records,
            HashSet::from([Record::new("evil.com", "example.com", "X")])
        );
    }

    #[tokio::test]
    async fn test_failing_source_does_not_affect_others() {
        let good = Fixed::new("Good", &["a.example.com"]);
        let dispatcher = Dispatcher::new(
            [Arc::new(Failing) as Arc<dyn Source>, good as Arc<dyn Source>],
            INTERVAL,
            false,
        );

        let records = collect(&dispatcher, &["example.com"]).await;
        assert_eq!(
            records,
            HashSet::from([Record::new("a.example.com", "example.com", "Good")])
        );
    }

    #[tokio::test]
    async fn test_only_failing_sources_yield_empty_stream() {
        let dispatcher = Dispatcher::new([Arc::new(Failing) as Arc<dyn Source>], INTERVAL, false);
        assert!(collect(&dispatcher, &["example.com"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_closes_stream() {
        let source = Fixed::new("X", &["a.example.com"]);
        let dispatcher = Dispatcher::new([source.clone() as Arc<dyn Source>], INTERVAL, false);

        assert!(collect(&dispatcher, &[]).await.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_domains_are_skipped() {
        let source = Fixed::new("X", &["a.example.com"]);
        let dispatcher = Dispatcher::new([source.clone() as Arc<dyn Source>], INTERVAL, false);

        let records = collect(&dispatcher, &["", "   ", " Example.com "]).await;
        assert_eq!(
            records,
            HashSet::from([Record::new("a.example.com", "example.com", "X")])
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_source_queried_once_per_domain() {
        let first = Fixed::new("First", &["www.example.com"]);
        let second = Fixed::new("Second", &["www.example.com"]);
        let dispatcher = Dispatcher::new(
            [first.clone() as Arc<dyn Source>, second.clone() as Arc<dyn Source>],
            INTERVAL,
            false,
        );

        let start = Instant::now();
        let records = collect(&dispatcher, &["example.com", "example.org", "example.net"]).await;

        assert_eq!(first.calls.load(Ordering::SeqCst), 3);
        assert_eq!(second.calls.load(Ordering::SeqCst), 3);
        // Same host from two sources is two distinct records
        assert_eq!(records.len(), 6);
        // Three calls per source need at least two full intervals
        assert!(start.elapsed() >= INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_concurrency_still_completes() {
        let sources: Vec<Arc<dyn Source>> = ["A", "B", "C", "D"]
            .into_iter()
            .map(|name| Fixed::new(name, &["x.example.com"]) as Arc<dyn Source>)
            .collect();
        let dispatcher = Dispatcher::new(sources, INTERVAL, false).with_max_concurrency(1);

        let records = collect(&dispatcher, &["example.com", "example.org"]).await;
        assert_eq!(records.len(), 8);
    }

    #[tokio::test]
    async fn test_duplicate_source_is_queried_once() {
        let source = Fixed::new("X", &["a.example.com"]);
        let twin = Fixed::new("X", &["b.example.com"]);
        let dispatcher = Dispatcher::new(
            [
                source.clone() as Arc<dyn Source>,
                source.clone() as Arc<dyn Source>,
                twin.clone() as Arc<dyn Source>,
            ],
            INTERVAL,
            false,
        );
        assert_eq!(dispatcher.source_names().collect::<Vec<_>>(), vec!["X"]);

        let records = collect(&dispatcher, &["example.com", "example.org"]).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(twin.calls.load(Ordering::SeqCst), 0);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_source_names_keep_registration_order() {
        let dispatcher = Dispatcher::new(
            [
                Fixed::new("B", &[]) as Arc<dyn Source>,
                Fixed::new("A", &[]) as Arc<dyn Source>,
            ],
            INTERVAL,
            false,
        );
        assert_eq!(dispatcher.source_names().collect::<Vec<_>>(), vec!["B", "A"]);
    }

    #[test]
    fn test_split_names() {
        assert_eq!(
            split_names("a.example.com\r\nb.example.com\n\nc.example.com\n").collect::<Vec<_>>(),
            vec!["a.example.com", "b.example.com", "c.example.com"]
        );
        assert_eq!(split_names("").count(), 0);
    }
}
