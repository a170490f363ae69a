use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "isowatch")]
#[command(version)]
#[command(about = "Web monitoring front-end for the disk2iso ripping service", long_about = None)]
pub struct Args {
    /// Path to a config.yaml (defaults to the usual lookup locations)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the merged live status once and exit
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let args = Args::parse_from(["isowatch", "serve", "--port", "9000"]);
        match args.command {
            Some(Command::Serve { port, host }) => {
                assert_eq!(port, Some(9000));
                assert!(host.is_none());
            }
            _ => panic!("Expected serve command"),
        }
    }

    #[test]
    fn test_parse_status() {
        let args = Args::parse_from(["isowatch", "status"]);
        assert!(matches!(args.command, Some(Command::Status)));
    }

    #[test]
    fn test_parse_config_flag() {
        let args = Args::parse_from(["isowatch", "--config", "/etc/isowatch.yaml", "status"]);
        assert_eq!(args.config, Some(PathBuf::from("/etc/isowatch.yaml")));
    }

    #[test]
    fn test_no_command() {
        let args = Args::parse_from(["isowatch"]);
        assert!(args.command.is_none());
    }
}
