mod commands;

use std::net::IpAddr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use balcao::config::DEFAULT_CONFIG_FILE;

// ============================================================================
// CLI Types
// ============================================================================

/// Balcão - menu-driven customer service bot for WhatsApp storefronts
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot: gateway, idle sweeper and HTTP endpoints
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Host to bind to (overrides config file)
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the catalog listing as contacts see it
    Catalogs {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,
    },

    /// Show the most recent catalog deliveries
    Deliveries {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: String,

        /// Number of records to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => commands::serve::run(&config, host, port).await,
        Commands::Catalogs { config } => commands::catalogs::run(&config).await,
        Commands::Deliveries { config, limit } => commands::deliveries::run(&config, limit).await,
    }
}

// ============================================================================
// Initialization
// ============================================================================

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
