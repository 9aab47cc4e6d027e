//! Revu Server Binary
//!
//! Runs the scrape API, the scrape worker, or both.

use anyhow::Result;
use clap::Parser;
use revu_config::{ConfigLoader, RevuConfig};
use revu_logging::init_logging_from_config;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use revu_server::{shutdown_signal, Role, Server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Which parts of the system to run
    #[arg(long, value_enum, default_value_t = Role::All)]
    role: Role,

    /// Server bind address, overriding the configuration (e.g. 0.0.0.0:8000)
    #[arg(short, long)]
    bind: Option<String>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", RevuConfig::generate_sample());
        return Ok(());
    }

    let mut config = ConfigLoader::new().load(cli.config.as_ref())?;
    apply_cli_overrides(&mut config, &cli)?;

    init_logging_from_config(&config.logging)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    Server::new(config, cli.role)?.run(shutdown).await
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut RevuConfig, cli: &Cli) -> Result<()> {
    if let Some(bind) = &cli.bind {
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", bind, e))?;
        config.server.bind_address = addr.ip().to_string();
        config.server.port = addr.port();
    }

    Ok(())
}
