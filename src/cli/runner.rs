//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::RunConfig;
use crate::decode::{decoder_for, spawn_input_thread};
use crate::engine::{Engine, StatsSnapshot};
use crate::error::{Result, ResultExt};
use crate::http::WireSink;
use crate::output::ResultEmitter;
use std::io::{Read, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Records buffered between the input thread and the dispatcher
const INPUT_BUFFER: usize = 64;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match self.cli.command() {
            Commands::Run => {
                let token = CancellationToken::new();
                let interrupt = token.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("interrupted, cancelling outstanding requests");
                        interrupt.cancel();
                    }
                });

                let output = Box::new(std::io::stdout());
                self.execute(std::io::stdin(), output, token).await?;
                Ok(())
            }
            Commands::Validate => self.validate(),
            Commands::Config => self.print_config(),
        }
    }

    /// Effective configuration: file, then flags, then validation
    pub fn load_config(&self) -> Result<RunConfig> {
        let base = match &self.cli.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        let config = self.cli.apply_to(base);
        config.validate()?;
        Ok(config)
    }

    /// Read records from `input` and write results to `output`
    ///
    /// Configuration and expression errors are reported before any input
    /// is read.
    pub async fn execute<R>(
        &self,
        input: R,
        output: Box<dyn Write + Send>,
        token: CancellationToken,
    ) -> Result<StatsSnapshot>
    where
        R: Read + Send + 'static,
    {
        let config = self.load_config()?;
        let expander = config.seed_expander()?;

        let emitter = Arc::new(ResultEmitter::new(config.output_format, output));
        let wire = config.log_http.then(|| Arc::new(WireSink::stderr()));
        let engine = Engine::new(&config, emitter, wire, token)?;

        if !config.execute {
            info!("dry run, pass --execute to send requests");
        }
        debug!(
            parallelism = config.parallelism,
            rate_limit_per_minute = config.rate_limit_per_minute,
            request_spacing = ?config.rate_limiter_config().interval(),
            max_retries = config.max_retries,
            "starting run"
        );

        let decoder = decoder_for(config.input_format, input);
        let records =
            spawn_input_thread(decoder, INPUT_BUFFER).context("failed to start input thread")?;

        let stats = engine.run(records, expander.as_ref()).await?;
        if config.verbose {
            info!(
                "{} records, {} seeds, {} requests, {} retries, {} results, {} dropped",
                stats.records,
                stats.seeds,
                stats.requests,
                stats.retries,
                stats.emitted,
                stats.dropped
            );
        }
        Ok(stats)
    }

    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        config.seed_expander()?;
        println!("Configuration is valid");
        Ok(())
    }

    fn print_config(&self) -> Result<()> {
        let config = self.load_config()?;
        let yaml = serde_yaml::to_string(&config)?;
        std::io::stdout()
            .lock()
            .write_all(yaml.as_bytes())
            .context("failed to write config")?;
        Ok(())
    }
}
