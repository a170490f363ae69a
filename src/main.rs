mod api;
mod archive;
mod cli;
mod config;
mod selection;
mod service;
mod status;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use config::Config;
use status::StatusAggregator;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    match &args.command {
        Some(Command::Serve { host, port }) => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            api::start_server(config, host, port)
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
        }
        Some(Command::Status) => {
            let aggregator = StatusAggregator::new(&config.api_dir);
            let live = aggregator.live_status();
            let running = service::service_running(&config.service_name);
            let text = aggregator.status_text(&live, running);

            println!("{}", serde_json::to_string_pretty(&live)?);
            println!("status_text: {}", text);
        }
        None => {
            eprintln!("No command specified.");
            eprintln!("Run 'isowatch --help' to see all available commands.");
            eprintln!();
            eprintln!("Quick Start:");
            eprintln!("  isowatch serve     Start the HTTP API server");
            eprintln!("  isowatch status    Print the merged live status once");

            std::process::exit(1);
        }
    }

    Ok(())
}
