//! reroute: configuration-driven HTTP redirect server.
//!
//! # Architecture Overview
//!
//! ```text
//!     config file ──▶ config::load_config ──▶ route::compile ──▶ RouteTable
//!                                                                   │
//!                          ┌────────────────────────────────────────┤
//!                          ▼                                        ▼
//!     validate:   route::run_tests                 serve:   http::HttpServer
//!                 (declared tests, fail-fast)               (docs page + routes)
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use reroute::config::{load_config, ConfigError, RedirectConfig};
use reroute::docs::DocsPage;
use reroute::http::HttpServer;
use reroute::lifecycle::{spawn_signal_handler, Shutdown};
use reroute::observability::{logging, metrics};
use reroute::route::{compile, run_tests, ProcessEnv};
use reroute::routing::RouteTable;

#[derive(Parser)]
#[command(name = "reroute")]
#[command(about = "Configuration-driven HTTP redirect server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the configured redirects
    Serve {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
    /// Compile the routes and run their declared tests
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config } => serve(&config).await,
        Commands::Validate { config } => validate(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Exiting");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Load the config, start logging and compile every route.
fn prepare(path: &Path) -> Result<(RedirectConfig, Arc<RouteTable>), ConfigError> {
    let config = load_config(path)?;
    logging::init(&config.server.observability);

    let routes = compile(&config.routes)?;
    tracing::info!(
        path = %path.display(),
        routes = routes.len(),
        "Configuration loaded"
    );

    Ok((config, Arc::new(RouteTable::new(routes))))
}

async fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (_, table) = prepare(path)?;
    let report = run_tests(table).await?;
    println!(
        "{} test(s) passed across {} route(s)",
        report.tests, report.routes
    );
    Ok(())
}

async fn serve(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (config, table) = prepare(path)?;
    let server_config = config.server;

    if server_config.observability.metrics_enabled {
        let addr = server_config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let docs = DocsPage::render(&server_config.documentation.title, table.routes())?;
    let server = HttpServer::new(server_config, table, docs, Arc::new(ProcessEnv));

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    server.serve(rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
