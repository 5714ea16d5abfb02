//! `subhound` is a library for passive subdomain discovery.
//! "Hello world" example:
//! ```no_run
//! use futures::StreamExt;
//! use subhound_lib::{DispatcherBuilder, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let dispatcher = DispatcherBuilder::default().dispatcher()?;
//!   let domains = futures::stream::iter([String::from("example.com")]);
//!   let mut findings = std::pin::pin!(subhound_lib::merge(dispatcher.run(domains)));
//!   while let Some(finding) = findings.next().await {
//!     println!("{finding}");
//!   }
//!   Ok(())
//! }
//! ```
//!
//! Every built-in source is queried once per domain, at most once per
//! interval per source. Custom sources implement [`Source`] and are handed
//! to [`Dispatcher::new`] directly:
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use futures::StreamExt;
//! use subhound_lib::{Dispatcher, Result, Source};
//!
//! #[derive(Debug)]
//! struct Static;
//!
//! #[async_trait]
//! impl Source for Static {
//!     fn name(&self) -> &'static str {
//!         "Static"
//!     }
//!
//!     async fn fetch(&self, domain: &str) -> Result<Vec<String>> {
//!         Ok(vec![format!("*.{domain}"), format!("www.{domain}")])
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!   let dispatcher = Dispatcher::new([Arc::new(Static) as Arc<dyn Source>], Duration::from_secs(1), false);
//!   let domains = futures::stream::iter([String::from("Example.com")]);
//!   let hosts: Vec<String> = subhound_lib::merge(dispatcher.run(domains))
//!     .map(|finding| finding.into_record().host)
//!     .collect()
//!     .await;
//!   assert_eq!(hosts.len(), 2);
//! }
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![warn(missing_docs)]

// Only linked to select the TLS backend
#[cfg(feature = "openssl-sys")]
use openssl_sys as _;

mod builder;
mod dispatcher;
mod merger;
mod normalize;
mod types;

pub mod ratelimit;
pub mod source;

pub use builder::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, DispatcherBuilder};
pub use dispatcher::Dispatcher;
pub use merger::{Merger, merge};
pub use normalize::normalize;
pub use source::{Credentials, Source, SourceKind};
pub use types::*;
