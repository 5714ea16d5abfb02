use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, Result};

/// A single discovered host.
///
/// A record is identified by the full `(host, input, source)` triple:
/// the same host found by two different sources yields two records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Canonical hostname, see [`crate::normalize`]
    pub host: String,
    /// The (lowercased) domain that was searched
    pub input: String,
    /// Name of the source that reported the host
    pub source: String,
}

impl Record {
    /// Create a new record
    pub fn new(
        host: impl Into<String>,
        input: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Record {
            host: host.into(),
            input: input.into(),
            source: source.into(),
        }
    }

    /// Serialize the record into a single JSON line (without line break).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ErrorKind::Serialize)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} via {})", self.host, self.input, self.source)
    }
}

/// A [`Record`] together with its serialized form.
///
/// The serialized form is computed once, where the record is created,
/// and is what deduplication and output operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    record: Record,
    json: String,
}

impl Finding {
    /// Serialize `record` and wrap it into a finding
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Serialize`] if the record cannot be serialized.
    pub fn new(record: Record) -> Result<Self> {
        let json = record.to_json()?;
        Ok(Finding { record, json })
    }

    /// The record of this finding
    #[must_use]
    pub const fn record(&self) -> &Record {
        &self.record
    }

    /// The serialized JSON line of this finding
    #[must_use]
    pub fn json(&self) -> &str {
        &self.json
    }

    /// Consume the finding and return the record
    #[must_use]
    pub fn into_record(self) -> Record {
        self.record
    }
}

impl Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.json)
    }
}
