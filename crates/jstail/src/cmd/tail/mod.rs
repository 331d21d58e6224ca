//! Tail command - drain a JetStream stream to stdout
//!
//! Creates an ephemeral pull consumer for the requested subjects, prints every
//! payload that contains `--query`, and exits once a fetch comes back empty.

use std::io::{self, BufWriter};
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing_subscriber::EnvFilter;

use jstail_config::{
    ConfigError, ContextPaths, DrainConfig, LogLevel, NatsContext, OutputFormat, parse_subjects,
    require,
};
use jstail_drain::{DrainError, DrainSummary, Output, drain_stream};

/// Tail command arguments
#[derive(Args, Debug)]
pub struct TailArgs {
    /// Only print messages whose payload contains this text (case-sensitive)
    #[arg(long, value_name = "TEXT", default_value = "", env = "JSTAIL_QUERY")]
    pub query: String,

    /// JetStream stream name. Required
    #[arg(long, value_name = "NAME")]
    pub stream: Option<String>,

    /// Subjects to read. Comma-separated list with no spaces. Required
    #[arg(long, value_name = "LIST")]
    pub subjects: Option<String>,

    /// NATS context name (default: the one selected in ~/.config/nats/context.txt)
    #[arg(long, value_name = "NAME", env = "NATS_CONTEXT")]
    pub context: Option<String>,

    /// Server URL; skips context lookup
    #[arg(short, long, value_name = "URL", env = "NATS_URL")]
    pub server: Option<String>,

    /// Max messages per fetch
    #[arg(long = "batch-size", value_name = "N", default_value_t = jstail_config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Seconds each fetch waits for messages
    #[arg(long = "max-wait", value_name = "SECONDS", default_value_t = 3.0)]
    pub max_wait: f64,

    /// Retries after a failed fetch before giving up
    #[arg(long = "fetch-retries", value_name = "N", default_value_t = 0)]
    pub fetch_retries: u32,

    /// Output format: raw (default), json
    #[arg(short = 'o', long = "output", default_value = "raw")]
    pub format: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output (show debug info)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (suppress info logs and the drained notice)
    #[arg(short, long)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error). Overrides -v/-q
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Run the tail command
pub async fn run(args: TailArgs) -> Result<DrainSummary> {
    let config = build_config(&args, ContextPaths::from_home)?;

    // Enable color only if: stdout is TTY AND --no-color not set
    let use_color = atty::is(atty::Stream::Stdout) && !args.no_color;
    let mut output = Output::new(BufWriter::new(io::stdout()), config.format)
        .with_color(use_color)
        .with_quiet(args.quiet);

    tracing::debug!(
        stream = %config.stream,
        subjects = ?config.subjects,
        query = %config.query,
        batch_size = config.batch_size,
        max_wait_ms = config.max_wait.as_millis() as u64,
        "starting drain"
    );

    let summary = drain_stream(&config, &mut output).await?;
    Ok(summary)
}

/// Build the drain config from arguments
///
/// Required flags are checked before `paths` is called, so a missing flag
/// never touches the filesystem or the network.
pub fn build_config<F>(args: &TailArgs, paths: F) -> jstail_config::Result<DrainConfig>
where
    F: FnOnce() -> jstail_config::Result<ContextPaths>,
{
    let stream = require("stream", args.stream.as_deref())?;
    let subjects = parse_subjects(require("subjects", args.subjects.as_deref())?)?;
    let format: OutputFormat = args.format.parse()?;
    let max_wait = Duration::try_from_secs_f64(args.max_wait)
        .map_err(|e| ConfigError::invalid_value("max-wait", e.to_string()))?;

    let context = match args.server.as_deref().filter(|s| !s.is_empty()) {
        Some(url) => NatsContext::from_url(url),
        None => paths()?.resolve(args.context.as_deref())?,
    };

    let config = DrainConfig::new(context, stream, subjects)
        .with_query(args.query.as_str())
        .with_batch_size(args.batch_size)
        .with_max_wait(max_wait)
        .with_fetch_retries(args.fetch_retries)
        .with_format(format);
    config.validate()?;
    Ok(config)
}

/// Initialize logging to stderr; stdout carries only message output
pub fn init_logging(args: &TailArgs) -> Result<()> {
    let level = LogLevel::resolve(args.log_level.as_deref(), args.verbose, args.quiet)?;
    let filter = EnvFilter::try_new(level.as_str())
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr) && !args.no_color)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}

/// Map an error to the process exit code
///
/// 1 = bad input, 3 = context, 4 = connection, 5 = consumer, 6 = fetch,
/// 7 = output. Anything else is a generic failure (1).
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return e.exit_code();
    }
    if let Some(e) = err.downcast_ref::<DrainError>() {
        return e.exit_code();
    }
    1
}
