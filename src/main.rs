//! fleet-planner - waste pickup route planning service
//!
//! `serve` runs the HTTP API; `plan` and `simulate` work offline on JSON.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleet_planner::api::{self, AppState, RouteRequest, RouteResponse, parse_date};
use fleet_planner::config::ServiceConfig;
use fleet_planner::providers::{demand_source, distance_provider};
use fleet_planner::solver::Planner;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address, overrides BIND_ADDR
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Plan a route request read from a file (or stdin) and print the response
    Plan {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },
    /// Print the pickups the configured demand source yields for a date
    Simulate {
        /// Service date, YYYY-MM-DD
        date: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,fleet_planner=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ServiceConfig::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { bind } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start the async runtime")?;
            runtime.block_on(serve(config, bind))
        }
        Commands::Plan { input, pretty } => plan(config, input, pretty),
        Commands::Simulate { date } => simulate(config, &date),
    }
}

async fn serve(config: ServiceConfig, bind: Option<String>) -> Result<()> {
    let addr = bind.unwrap_or_else(|| config.bind_addr.clone());
    let app = api::router(Arc::new(AppState { config }));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "fleet planner listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await
        .context("server error")
}

fn plan(config: ServiceConfig, input: Option<PathBuf>, pretty: bool) -> Result<()> {
    let raw = match &input {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let request: RouteRequest = serde_json::from_str(&raw).context("invalid route request JSON")?;
    let provider = distance_provider(&config)?;
    let plan = Planner::new(config.planner.clone(), provider).plan(request.into_plan_request()?)?;

    print_json(&RouteResponse::from(&plan), pretty)
}

fn simulate(config: ServiceConfig, date: &str) -> Result<()> {
    let date = parse_date(date)?;
    let pickups = demand_source(&config)?.fetch(date)?;
    info!(%date, count = pickups.len(), "pickups generated");
    print_json(&pickups, true)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(stdout, value)?;
    } else {
        serde_json::to_writer(stdout, value)?;
    }
    println!();
    Ok(())
}
