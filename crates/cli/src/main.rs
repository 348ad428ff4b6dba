//! Eventwire CLI: the main entry point.
//!
//! Commands:
//! - `serve`  : Start the HTTP SSE gateway
//! - `ask`    : Answer one query, printing SSE frames to stdout
//! - `config` : Print, show, locate or validate configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "eventwire",
    about = "Eventwire: ordered event streams for agent responses",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single query
    Ask {
        /// The question to research
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Configuration commands (prints the defaults when no action is given)
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the loaded configuration with keys redacted
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask { query } => commands::ask::run(query.join(" ")).await?,
        Commands::Config { action } => match action {
            None => commands::config_cmd::defaults().await?,
            Some(ConfigAction::Show) => commands::config_cmd::show().await?,
            Some(ConfigAction::Path) => commands::config_cmd::path().await?,
            Some(ConfigAction::Validate) => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_joins_words() {
        let cli = Cli::parse_from(["eventwire", "ask", "what", "is", "tokio"]);
        match cli.command {
            Commands::Ask { query } => assert_eq!(query.join(" "), "what is tokio"),
            _ => panic!("Expected ask"),
        }
    }

    #[test]
    fn serve_port_and_verbose() {
        let cli = Cli::parse_from(["eventwire", "serve", "--port", "9000", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000) }));
    }

    #[test]
    fn bare_config_prints_defaults() {
        let cli = Cli::parse_from(["eventwire", "config"]);
        assert!(matches!(cli.command, Commands::Config { action: None }));
    }
}
