//! dbpanel - HTTP/JSON administration panel for a MySQL server.

mod app;
mod http;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use panel_config::{init_logging, Config};
use tracing::debug;

/// dbpanel command-line interface.
#[derive(Parser)]
#[command(name = "dbpanel")]
#[command(about = "Browse databases and run SQL against a MySQL server over HTTP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Overrides PANEL_LOG_LEVEL.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// JSON log file. Defaults to ~/.dbpanel/logs/dbpanel.jsonl
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// JSON configuration file; environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Create an admin account for stored-credential login
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing .env is fine; variables may come from the environment.
    let dotenv_path = dotenvy::dotenv().ok();

    let config = Config::load(cli.config.as_deref())?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging("dbpanel", level, cli.log_file.clone());
    if let Some(path) = dotenv_path {
        debug!(path = %path.display(), "Loaded .env");
    }

    match cli.command {
        Some(Commands::Serve) | None => {
            app::run_server(config).await?;
        }
        Some(Commands::CreateAdmin { username, password }) => {
            app::create_admin(&config, &username, &password).await?;
        }
    }

    Ok(())
}
