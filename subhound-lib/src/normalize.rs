//! Canonicalization of raw hostnames reported by sources.

/// Canonicalize a raw hostname.
///
/// The name is lowercased. Anything shorter than two characters is returned
/// as is. Otherwise a single leading `*` or `%` is dropped and then, in a
/// separate step, a single leading `.`. Neither step repeats, so
/// `..example.com` becomes `.example.com`.
///
/// ```
/// use subhound_lib::normalize;
///
/// assert_eq!(normalize("*.Example.COM"), "example.com");
/// assert_eq!(normalize("%.example.com"), "example.com");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    let host = raw.to_lowercase();
    if host.chars().count() < 2 {
        return host;
    }

    let host = host.strip_prefix(['*', '%']).unwrap_or(&host);
    host.strip_prefix('.').unwrap_or(host).to_string()
}
