use std::collections::HashSet;

use futures::{Stream, StreamExt, future};

use crate::Finding;

/// Remembers every finding it has seen, by serialized form.
///
/// Two findings are duplicates if their JSON lines are identical, which is
/// the case exactly when host, input and source are equal. The set grows
/// for the lifetime of the merger.
#[derive(Debug, Default, Clone)]
pub struct Merger {
    seen: HashSet<String>,
}

impl Merger {
    /// Create an empty merger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `finding` as seen.
    /// Returns `true` if it wasn't seen before.
    pub fn insert(&mut self, finding: &Finding) -> bool {
        if self.seen.contains(finding.json()) {
            return false;
        }
        self.seen.insert(finding.json().to_string())
    }

    /// Number of unique findings seen so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no finding has been seen yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Drop every finding of `findings` that was seen before.
    ///
    /// First occurrences are passed through as soon as they arrive; the
    /// resulting stream ends when `findings` ends.
    pub fn merge<S>(mut self, findings: S) -> impl Stream<Item = Finding>
    where
        S: Stream<Item = Finding>,
    {
        findings.filter(move |finding| future::ready(self.insert(finding)))
    }
}

/// Deduplicate `findings` with a fresh [`Merger`]
pub fn merge<S>(findings: S) -> impl Stream<Item = Finding>
where
    S: Stream<Item = Finding>,
{
    Merger::new().merge(findings)
}
