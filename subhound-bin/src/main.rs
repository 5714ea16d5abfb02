//! `subhound` is a fast, rate-limited passive subdomain finder.
//! It asks certificate transparency logs, DNS datasets, web archives, and
//! threat intelligence services for the subdomains of a domain.
//!
//! The subhound binary is a wrapper around subhound-lib, which provides
//! the sources, the rate-limited dispatcher, and deduplication.
//!
//! Search a single domain:
//! ```sh
//! subhound example.com
//! ```
//!
//! Search many domains, one per line, and only keep real subdomains:
//! ```sh
//! cat domains.txt | subhound --subs-only
//! ```
//!
//! Restrict the search to some sources:
//! ```sh
//! subhound --source crtsh --source certspotter example.com
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use anyhow::{Context, Error, Result, bail};
use clap::Parser;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use log::{debug, error, info};
#[cfg(feature = "native-tls")]
use openssl_sys as _; // required for vendored-openssl feature
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::LinesStream;

use subhound_lib::{DispatcherBuilder, Finding, Merger};

mod logging;
mod options;
mod verbosity;

use crate::logging::init_logging;
use crate::options::{Config, SUBHOUND_CONFIG_FILE, SubhoundOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator. Failing sources never lead to a non-zero exit
    // code; they only mean fewer results.
    #[allow(unused)]
    UnexpectedFailure = 1,
    ConfigFile = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    // See: https://doc.rust-lang.org/stable/std/process/fn.exit.html
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file, command-line- and environment variables
fn load_config() -> Result<SubhoundOptions> {
    let mut opts = SubhoundOptions::parse();
    let merged = merge_config_file(&mut opts);

    // Logging is set up after merging, so that `verbose` from the config
    // file applies. A broken config file is still reported.
    init_logging(&opts.config.verbose);
    merged?;

    Ok(opts)
}

/// Load a potentially existing config file and merge it into the config from
/// the CLI
fn merge_config_file(opts: &mut SubhoundOptions) -> Result<()> {
    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // Without an explicit config file, use the default one from the
        // current directory if it exists. An invalid default file is an
        // error just like an invalid explicit one.
        let default_config = PathBuf::from(SUBHOUND_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }
    Ok(())
}

/// Set up runtime and call subhound entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!(
                "Error while loading config: {e}\n\
                subhound v{} expects a TOML file with the same keys as the long command-line flags",
                env!("CARGO_PKG_VERSION")
            );
            exit(ExitCode::ConfigFile as i32);
        }
    };
    debug!("Log level: {}", opts.config.verbose);

    let runtime = match opts.config.threads {
        Some(threads) => {
            // We define our own runtime instead of the `tokio::main` attribute
            // since we want to make the number of threads configurable
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .enable_all()
                .build()?
        }
        None => tokio::runtime::Runtime::new()?,
    };

    match runtime.block_on(run(opts)) {
        Err(e) if Some(ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
/// This is helpful for troubleshooting the root cause of an error.
/// Code is taken from the anyhow documentation.
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Domains to search: the positional argument, or every line of stdin
fn domains(domain: Option<String>) -> BoxStream<'static, String> {
    match domain {
        Some(domain) => stream::once(async move { domain }).boxed(),
        None => {
            let lines = BufReader::new(tokio::io::stdin()).lines();
            LinesStream::new(lines)
                .filter_map(|line| async move {
                    line.inspect_err(|e| error!("Cannot read domain from stdin: {e}"))
                        .ok()
                })
                .boxed()
        }
    }
}

/// Write every finding not seen by `merger` yet to `out`, one JSON line each.
/// Lines are flushed one by one, so results show up as they are found.
async fn emit<S, W>(findings: S, merger: &mut Merger, out: &mut W) -> io::Result<()>
where
    S: Stream<Item = Finding>,
    W: AsyncWrite + Unpin,
{
    let mut findings = pin!(findings);
    while let Some(finding) = findings.next().await {
        if !merger.insert(&finding) {
            continue;
        }
        let mut line = finding.json().to_owned();
        line.push('\n');
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
    }
    Ok(())
}

/// Run subhound with the given options
async fn run(opts: SubhoundOptions) -> Result<i32> {
    let config = opts.config;
    let dispatcher = DispatcherBuilder::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout))
        .interval(config.interval)
        .subdomains_only(config.subs_only)
        .max_concurrency(config.max_concurrency)
        .sources(config.source.clone())
        .credentials(config.credentials())
        .build()
        .dispatcher()
        .context("Cannot create dispatcher")?;
    info!(
        "Querying {} every {}",
        dispatcher.source_names().collect::<Vec<_>>().join(", "),
        humantime::format_duration(config.interval)
    );

    let mut merger = Merger::new();
    let mut stdout = tokio::io::stdout();
    emit(dispatcher.run(domains(opts.domain)), &mut merger, &mut stdout)
        .await
        .context("Cannot write to stdout")?;

    info!("Found {} unique records", merger.len());
    Ok(ExitCode::Success as i32)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use subhound_lib::Record;

    use super::*;

    fn finding(host: &str) -> Finding {
        Finding::new(Record::new(host, "example.com", "CrtSh")).unwrap()
    }

    #[tokio::test]
    async fn test_emit_writes_unique_findings_in_order() {
        let (a, b, c) = (
            finding("a.example.com"),
            finding("b.example.com"),
            finding("c.example.com"),
        );
        let findings = stream::iter([a.clone(), b.clone(), a.clone(), c.clone(), b.clone()]);

        let mut merger = Merger::new();
        let mut out = Vec::new();
        emit(findings, &mut merger, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.lines().collect::<Vec<_>>(), vec![a.json(), b.json(), c.json()]);
        assert!(out.ends_with('\n'));
        assert_eq!(merger.len(), 3);
    }

    #[tokio::test]
    async fn test_emit_skips_findings_seen_before() {
        let mut merger = Merger::new();
        merger.insert(&finding("a.example.com"));

        let mut out = Vec::new();
        let findings = stream::iter([finding("a.example.com"), finding("b.example.com")]);
        emit(findings, &mut merger, &mut out).await.unwrap();

        let line: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["host"], "b.example.com");
        assert_eq!(line["input"], "example.com");
        assert_eq!(line["source"], "CrtSh");
    }
}
