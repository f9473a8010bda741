//! pingwave — interval HTTP reachability probes as JSON lines.
//!
//! # Usage
//!
//! ```text
//! pingwave run https://example.com/ https://example.org/health --interval 3000ms
//! pingwave run --config /etc/pingwave.toml
//! pingwave check https://example.com/ --timeout 2s
//! ```
//!
//! Results go to stdout, logs to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pingwave_probe::config::parse_duration;
use pingwave_probe::{HyperTransport, ProbeConfig, ProbeService, TransportConfig, probe_once};
use tracing::info;

mod output;

use output::JsonLinesSink;

const DEFAULT_LOG_FILTER: &str = "info,pingwave=debug,pingwave_probe=debug";

#[derive(Parser)]
#[command(name = "pingwave", about = "Interval HTTP reachability prober", version)]
struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe endpoints every interval until interrupted.
    Run(RunArgs),
    /// Probe one endpoint once; exits non-zero if the probe failed.
    Check {
        url: String,

        /// Request deadline.
        #[arg(long, default_value = "3000ms", value_parser = duration_arg)]
        timeout: Duration,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Endpoints to probe. Replaces the list from --config when given.
    endpoints: Vec<String>,

    /// TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time between waves, also the per-probe deadline.
    #[arg(long, value_parser = duration_arg)]
    interval: Option<Duration>,

    /// Upper bound on the shutdown drain.
    #[arg(long, value_parser = duration_arg)]
    grace: Option<Duration>,

    /// Cap on concurrently probing workers.
    #[arg(long)]
    max_concurrency: Option<usize>,
}

fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).ok_or_else(|| format!("invalid duration `{s}` (try 500ms, 3s, 1m)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run(args) => {
            run(args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { url, timeout } => check(&url, timeout).await,
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_config(args: RunArgs) -> anyhow::Result<ProbeConfig> {
    let mut config = match &args.config {
        Some(path) => ProbeConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ProbeConfig::new(Vec::<String>::new()),
    };

    if !args.endpoints.is_empty() {
        config.endpoints = args.endpoints;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    if let Some(grace) = args.grace {
        config.grace = grace;
    }
    if let Some(limit) = args.max_concurrency {
        config.max_concurrency = Some(limit);
    }

    config.validate().context("invalid probe configuration")?;
    Ok(config)
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = build_config(args)?;
    info!(
        endpoints = config.endpoints.len(),
        interval_ms = config.interval.as_millis() as u64,
        "pingwave starting"
    );

    let mut service = ProbeService::new(config).context("failed to build probe service")?;
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received"),
            Err(e) => tracing::error!(error = %e, "failed to listen for interrupt, shutting down"),
        }
    };

    output::stream_until(&mut service, JsonLinesSink::new(std::io::stdout()), shutdown).await?;

    info!("pingwave stopped");
    Ok(())
}

async fn check(url: &str, timeout: Duration) -> anyhow::Result<ExitCode> {
    let transport = HyperTransport::new(&TransportConfig::default())?;
    let result = probe_once(&transport, url, timeout).await;

    JsonLinesSink::new(std::io::stdout()).write(&result)?;

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
