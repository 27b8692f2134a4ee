//! CLI commands and argument parsing

use crate::config::RunConfig;
use crate::types::{InputFormat, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fetch every page of list endpoints derived from input records
///
/// Input records are read from stdin, one result per seed URL is written
/// to stdout and diagnostics go to stderr.
#[derive(Parser, Debug, Default)]
#[command(name = "listwalk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML), overridden by flags
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// URL template rendered against each input record
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// JSONPath selecting seed URLs from each input record
    #[arg(long, global = true)]
    pub url_path: Option<String>,

    /// Billing / quota project sent with every request
    #[arg(short, long, global = true)]
    pub billing_project: Option<String>,

    /// Collection field merged across pages
    #[arg(short, long, global = true, conflicts_with = "auto_collection")]
    pub collection: Option<String>,

    /// Infer the collection field from the last URL path segment
    #[arg(short, long, global = true)]
    pub auto_collection: bool,

    /// Maximum seeds fetched concurrently
    #[arg(short, long, global = true)]
    pub parallelism: Option<usize>,

    /// Requests per minute across all workers (0 = unlimited)
    #[arg(long, global = true)]
    pub rate_limit_per_minute: Option<u32>,

    /// Send requests (without this only the requests are logged)
    #[arg(short = 'x', long, global = true)]
    pub execute: bool,

    /// Log every request
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Dump raw requests and responses to stderr
    #[arg(long, global = true)]
    pub log_http: bool,

    /// Input framing
    #[arg(short, long, global = true, value_enum)]
    pub input_format: Option<InputFormat>,

    /// Read newline-delimited strings (same as --input-format raw)
    #[arg(short, long, global = true, conflicts_with_all = ["input_format", "yaml_input"])]
    pub raw_input: bool,

    /// Read a YAML document stream (same as --input-format yaml)
    #[arg(long, global = true, conflicts_with = "input_format")]
    pub yaml_input: bool,

    /// Output encoding
    #[arg(short, long, global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Write YAML documents (same as --output-format yaml)
    #[arg(short, long, global = true, conflicts_with = "output_format")]
    pub yaml_output: bool,

    /// Drop terminal non-200 responses instead of writing them
    #[arg(short, long, global = true)]
    pub filter_error: bool,

    /// Retries per request before giving up (0 = unlimited)
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds (0 = none)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Bearer credential attached to every request
    #[arg(long, global = true, env = "LISTWALK_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// User agent override
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Read stdin and fetch every seed (default)
    Run,

    /// Validate the configuration and URL expression without reading input
    Validate,

    /// Print the effective configuration as YAML
    Config,
}

impl Cli {
    /// Fold the flags over a base config
    ///
    /// Only flags given on the command line replace file values.
    pub fn apply_to(&self, mut config: RunConfig) -> RunConfig {
        if let Some(url) = &self.url {
            config.url = Some(url.clone());
        }
        if let Some(path) = &self.url_path {
            config.url_path = Some(path.clone());
        }
        if let Some(project) = &self.billing_project {
            config.billing_project = Some(project.clone());
        }
        if let Some(collection) = &self.collection {
            config.collection = Some(collection.clone());
            config.auto_collection = false;
        }
        if self.auto_collection {
            config.auto_collection = true;
            config.collection = None;
        }
        if let Some(parallelism) = self.parallelism {
            config.parallelism = parallelism;
        }
        if let Some(rate) = self.rate_limit_per_minute {
            config.rate_limit_per_minute = rate;
        }
        config.execute |= self.execute;
        config.verbose |= self.verbose;
        config.log_http |= self.log_http;
        config.filter_error |= self.filter_error;

        if let Some(format) = self.input_format {
            config.input_format = format;
        } else if self.raw_input {
            config.input_format = InputFormat::Raw;
        } else if self.yaml_input {
            config.input_format = InputFormat::Yaml;
        }
        if let Some(format) = self.output_format {
            config.output_format = format;
        } else if self.yaml_output {
            config.output_format = OutputFormat::Yaml;
        }

        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(token) = &self.access_token {
            config.access_token = Some(token.clone());
        }
        if let Some(agent) = &self.user_agent {
            config.user_agent = Some(agent.clone());
        }
        config
    }

    /// Subcommand to run
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }
}
