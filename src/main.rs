use std::net::SocketAddr;
use std::path::PathBuf;

use api_assistant::Result;
use api_assistant::commands::{build_index, dry_run, serve, show_status};
use api_assistant::config::{Config, get_config_dir, run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "api-assistant")]
#[command(about = "Chat assistant that answers questions about an OpenAPI document")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and secrets.toml
    #[arg(long, global = true, env = "API_ASSISTANT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the model provider, vector store and server
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the vector index from an OpenAPI JSON document
    Build {
        /// Path to the OpenAPI JSON document
        #[arg(long, default_value = "api_docs.json")]
        source: PathBuf,
        /// Replace an existing index without asking
        #[arg(long, short = 'y')]
        yes: bool,
        /// Print the formatted documents without embedding or writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Start the password-protected chat server
    Serve {
        /// Address to listen on, overriding the configured host and port
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Show configuration, secrets and index status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()
            .map_err(|e| api_assistant::AssistantError::Config(e.to_string()))?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Build {
            source,
            yes,
            dry_run: preview,
        } => {
            if preview {
                dry_run(&source)?;
            } else {
                let config = Config::load(&config_dir)?;
                build_index(&config, &source, yes).await?;
            }
        }
        Commands::Serve { bind } => {
            let config = Config::load(&config_dir)?;
            serve(&config, bind).await?;
        }
        Commands::Status => {
            let config = Config::load(&config_dir)?;
            show_status(&config).await?;
        }
    }

    Ok(())
}
