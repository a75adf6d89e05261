mod cli;
mod demo;

use clap::Parser;
use cli::{Cli, Command};
use proton_handler::ReactorConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::GlobalLogger { delay_ms, reactor } => {
            demo::global_logger(delay_ms, ReactorConfig::from(&reactor)).await
        }
        Command::Countdown {
            from,
            interval_ms,
            reactor,
        } => demo::countdown(from, interval_ms, ReactorConfig::from(&reactor)).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "reactor failed");
        eprintln!("reactord: {e}");
        std::process::exit(1);
    }
}
