//! Wayfarer agent client binary.
//!
//! Composition root: parses the CLI surface, sets up logging, assembles the
//! agent over a world connection, and either auto-launches the highway
//! strategy (when a target is given) or drops into an interactive shell.
//!
//! The world connection is the in-process simulator; a real protocol client
//! would slot in behind the same `WorldConnection` seam.

mod shell;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wayfarer::strategy::HIGHWAY_Y;
use wayfarer::{
    Agent, AgentConfig, HighwayConfig, HighwayStrategy, Position, SimConfig, SimWorld, Strategy,
};

#[derive(Debug, Parser)]
#[command(name = "wayfarer", about = "Autonomous long-haul game-world agent")]
struct Cli {
    /// Server hostname.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 25565)]
    port: u16,

    /// Account username.
    #[arg(long, default_value = "wayfarer")]
    username: String,

    /// Game protocol version to negotiate.
    #[arg(long)]
    game_version: Option<String>,

    /// Skip account authentication.
    #[arg(long)]
    no_auth: bool,

    /// Do not start the web viewer.
    #[arg(long)]
    no_viewer: bool,

    /// Propagate handler errors instead of isolating them, and log at debug.
    #[arg(long)]
    debug: bool,

    /// Players exempt from the hostile-player check.
    #[arg(long)]
    whitelist: Vec<String>,

    /// Highway target as X Z (y is pinned to the highway altitude). When
    /// given, the highway strategy launches automatically; otherwise an
    /// interactive shell starts.
    #[arg(long, num_args = 2, value_names = ["X", "Z"], allow_negative_numbers = true)]
    target: Option<Vec<f64>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.debug)?;

    tracing::info!(
        host = %cli.host,
        port = cli.port,
        username = %cli.username,
        game_version = ?cli.game_version,
        auth = !cli.no_auth,
        viewer = !cli.no_viewer,
        "starting wayfarer"
    );
    if !cli.no_viewer {
        tracing::info!("viewer not available against the simulated world, skipping");
    }

    // Servers known for join-time anti-cheat get the double-spawn treatment.
    let high_latency = cli.host.contains("2b2t");

    let world = Arc::new(SimWorld::new(SimConfig {
        spawn_events: if high_latency { 2 } else { 1 },
        ..SimConfig::default()
    }));
    let agent = Agent::new(world, AgentConfig {
        username: cli.username.clone(),
        high_latency_server: high_latency,
        ..AgentConfig::default()
    });
    agent.bus().set_debug(cli.debug);
    for name in &cli.whitelist {
        agent.whitelist_add(name);
    }

    agent.connect().await?;
    let pump = tokio::spawn(Arc::clone(&agent).run());

    agent.wait_until_active(Duration::from_secs(60)).await?;
    agent.spawn_position_logger();

    match &cli.target {
        Some(target) => {
            let destination = Position::new(target[0], HIGHWAY_Y, target[1]);
            let mut config = HighwayConfig::new(destination);
            if cli.debug {
                config = config.debug();
            }
            let strategy = HighwayStrategy::new(Arc::clone(&agent), config)?;
            strategy.spawn_supervisor();
            strategy.start().await?;
        }
        None => {
            shell::run(Arc::clone(&agent)).await?;
        }
    }

    // The pump ends once a shutdown-intent disconnect happens.
    match pump.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!(error = %err, "event pump failed"),
        Err(err) => tracing::error!(error = %err, "event pump panicked"),
    }

    tracing::info!("wayfarer shut down");
    std::process::exit(0);
}

fn setup_logging(debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
