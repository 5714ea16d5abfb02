use crate::verbosity::Verbosity;
use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Parser, builder::TypedValueParser};
use const_format::{concatcp, formatcp};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::{fs, path::PathBuf, time::Duration};
use strum::VariantNames;
use subhound_lib::ratelimit::DEFAULT_INTERVAL;
use subhound_lib::{Credentials, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, SourceKind};

pub(crate) const SUBHOUND_CONFIG_FILE: &str = "subhound.toml";

const DEFAULT_INTERVAL_STR: &str = "1s";

// this exists because clap requires `&str` type values for defaults
// whereas serde expects owned `String` types
const TIMEOUT_STR: &str = concatcp!(DEFAULT_TIMEOUT_SECS);
// Show the default config file in the help, but only complain about a
// missing file if the user asked for it explicitly
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    SUBHOUND_CONFIG_FILE,
);

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    interval: Duration = DEFAULT_INTERVAL;
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    timeout: u64 = DEFAULT_TIMEOUT_SECS;
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// subhound discovers subdomains by asking passive sources such as
/// certificate transparency logs, DNS datasets, and web archives.
///
/// Every unique finding is printed to stdout as a JSON line with the fields
/// `host`, `input`, and `source`.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct SubhoundOptions {
    /// Domain to search for
    #[arg(
        name = "domain",
        long_help = "Domain to search for.

If omitted, domains are read from standard input, one per line:

    cat domains.txt | subhound --subs-only"
    )]
    pub(crate) domain: Option<String>,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

/// The main configuration for subhound
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Only report hosts which end with the searched domain
    #[arg(long)]
    #[serde(default)]
    pub(crate) subs_only: bool,

    /// Minimum interval between two requests to the same source
    ///
    /// Sources are queried in parallel; this only spaces requests which go
    /// to the same source, e.g. when several domains are searched.
    ///
    /// Examples:
    ///   --interval 500ms
    ///   --interval 2s
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = DEFAULT_INTERVAL_STR,
        verbatim_doc_comment
    )]
    #[serde(default = "interval", with = "humantime_serde")]
    pub(crate) interval: Duration,

    /// Timeout in seconds for a single source request
    #[arg(short, long, default_value = TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub(crate) timeout: u64,

    /// Maximum number of source requests in flight (default: unbounded)
    #[arg(long)]
    #[serde(default)]
    pub(crate) max_concurrency: Option<usize>,

    /// Only query the given source. Can be repeated. (default: all sources)
    #[arg(
        short,
        long,
        ignore_case = true,
        value_parser = PossibleValuesParser::new(SourceKind::VARIANTS)
            .try_map(|s| s.parse::<SourceKind>())
    )]
    #[serde(default)]
    pub(crate) source: Vec<SourceKind>,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Number of threads to utilize.
    /// Defaults to number of cores available to the system
    #[arg(short = 'T', long)]
    #[serde(default)]
    pub(crate) threads: Option<usize>,

    /// VirusTotal API key
    #[arg(long, env = "VT_API_KEY", hide_env_values = true)]
    #[serde(default)]
    pub(crate) virustotal_api_key: Option<SecretString>,

    /// Facebook app id, used together with the app secret
    #[arg(long, env = "FB_APP_ID", hide_env_values = true)]
    #[serde(default)]
    pub(crate) facebook_app_id: Option<SecretString>,

    /// Facebook app secret, used together with the app id
    #[arg(long, env = "FB_APP_SECRET", hide_env_values = true)]
    #[serde(default)]
    pub(crate) facebook_app_secret: Option<SecretString>,

    /// Spyse API token for the findsubdomains source
    #[arg(long, env = "SPYSE_API_TOKEN", hide_env_values = true)]
    #[serde(default)]
    pub(crate) spyse_api_token: Option<SecretString>,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        // Read configuration file
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        // Secrets are merged outside of fold_in! because SecretBox doesn't
        // implement Eq. Values from the CLI or environment win.
        merge_secret(&mut self.virustotal_api_key, toml.virustotal_api_key);
        merge_secret(&mut self.facebook_app_id, toml.facebook_app_id);
        merge_secret(&mut self.facebook_app_secret, toml.facebook_app_secret);
        merge_secret(&mut self.spyse_api_token, toml.spyse_api_token);

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..virustotal_api_key,
                ..facebook_app_id,
                ..facebook_app_secret,
                ..spyse_api_token,

                // Keys with defaults to assign
                interval: DEFAULT_INTERVAL,
                max_concurrency: None,
                source: Vec::<SourceKind>::new(),
                subs_only: false,
                threads: None,
                timeout: DEFAULT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT,
                verbose: Verbosity::default(),
            }
        }
    }

    /// API credentials handed to the sources
    pub(crate) fn credentials(&self) -> Credentials {
        Credentials {
            virustotal_api_key: self.virustotal_api_key.clone(),
            facebook_app_id: self.facebook_app_id.clone(),
            facebook_app_secret: self.facebook_app_secret.clone(),
            spyse_api_token: self.spyse_api_token.clone(),
        }
    }
}

fn merge_secret(cli: &mut Option<SecretString>, toml: Option<SecretString>) {
    if cli.is_none() && toml.is_some() {
        *cli = toml;
    }
}
