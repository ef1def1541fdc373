//! Courier CLI
//!
//! Submits one input file to the remote pipeline, waits for its results,
//! and writes them as an HTML page.

mod report;

use anyhow::{Context, Result, bail};
use clap::Parser;
use courier_client::GatewayClient;
use courier_orchestrator::{Collaborators, Config, Orchestrator, RunRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Run a job on the remote processing pipeline", long_about = None)]
struct Cli {
    /// Input file to process
    input: PathBuf,

    /// Where to write the rendered results
    output: PathBuf,

    /// Items each worker handles, used when a coordinator has to be launched
    #[arg(short = 'n', long, env = "COURIER_TASKS_PER_WORKER")]
    tasks_per_worker: Option<u32>,

    /// Collect run statistics and shut the coordinator down afterwards
    #[arg(long)]
    terminate: bool,

    /// Cloud gateway URL
    #[arg(long, env = "COURIER_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "courier=info,courier_orchestrator=info,courier_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        "Loaded configuration: gateway_url={}, bucket={}",
        config.gateway_url, config.bucket
    );

    let client = Arc::new(GatewayClient::new(config.gateway_url.clone()));
    let orchestrator = Orchestrator::new(config, Collaborators::shared(client));

    let request = RunRequest {
        input: cli.input,
        output: cli.output,
        terminate: cli.terminate,
    };

    let report = tokio::select! {
        result = orchestrator.run(request) => match result {
            Ok(report) => report,
            Err(e) => {
                error!("Run failed: {}", e);
                return Err(e).context("Job did not complete");
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, abandoning the run");
            bail!("Interrupted");
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_report(&report);
    }

    Ok(())
}

/// Loads configuration from the environment and applies command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env();

    if let Some(url) = &cli.gateway_url {
        config.gateway_url = url.clone();
    }
    if let Some(n) = cli.tasks_per_worker {
        config.tasks_per_worker = n;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
