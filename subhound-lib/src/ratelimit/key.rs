use std::fmt;

/// A type-safe representation of a source identity for rate limiting purposes.
///
/// Every registered source gets exactly one key, derived from its static
/// name when the dispatcher is built. Two sources never share a key.
///
/// # Examples
///
/// ```
/// use subhound_lib::ratelimit::SourceKey;
///
/// let key = SourceKey::from("CrtSh");
/// assert_eq!(key.as_str(), "CrtSh");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(&'static str);

impl SourceKey {
    /// Get the source name as a string slice
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl From<&'static str> for SourceKey {
    fn from(name: &'static str) -> Self {
        SourceKey(name)
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_key_display() {
        let key = SourceKey::from("Wayback");
        assert_eq!(format!("{key}"), "Wayback");
    }

    #[test]
    fn test_source_key_hash_equality() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(SourceKey::from("CrtSh"), 1);

        assert_eq!(map.get(&SourceKey::from("CrtSh")), Some(&1));
        assert_eq!(map.get(&SourceKey::from("CertSpotter")), None);
    }
}
