//! Per-source rate limiting.
//!
//! Every source is queried at most once per configured interval, while
//! different sources run fully in parallel.
//!
//! - [`SourceKey`]: identity of a source for rate limiting
//! - [`RateLimiter`]: spaces calls sharing a key by a fixed interval

mod key;
mod limiter;

pub use key::SourceKey;
pub use limiter::{DEFAULT_INTERVAL, RateLimiter};
