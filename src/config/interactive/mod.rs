
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{Config, ConfigError, ProviderConfig, Secrets, ServerConfig, StoreConfig};
use crate::embeddings::OpenAiClient;

const CONNECTION_TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 API Assistant Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Model Provider").bold().yellow());
    eprintln!("Configure the OpenAI-compatible endpoint used for embeddings and chat.");
    eprintln!();
    configure_provider(&mut config.provider)?;

    eprintln!();
    eprintln!("{}", style("Vector Store").bold().yellow());
    configure_store(&mut config.store)?;

    eprintln!();
    eprintln!("{}", style("Chat Server").bold().yellow());
    configure_server(&mut config.server)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    let secrets = Secrets::load(&config).context("Failed to load secrets")?;
    if !secrets.has_api_key() {
        eprintln!(
            "{}",
            style("⚠ Warning: OPENAI_API_KEY is not set in secrets.toml or the environment")
                .yellow()
        );
    }

    if test_provider_connection(&config.provider, &secrets) {
        eprintln!("{}", style("✓ Provider connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the model provider or the API key was rejected")
                .yellow()
        );
        eprintln!("You can continue, but the provider must be reachable before indexing.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let secrets = Secrets::load(&config).context("Failed to load secrets")?;

    for line in describe_config(&config, &secrets) {
        eprintln!("{line}");
    }

    Ok(())
}

fn describe_config(config: &Config, secrets: &Secrets) -> Vec<String> {
    let presence = |set: bool| {
        if set {
            style("set").green().to_string()
        } else {
            style("missing").red().to_string()
        }
    };

    let mut lines = vec![
        style("📋 Current Configuration").bold().cyan().to_string(),
        String::new(),
        style("Provider:").bold().yellow().to_string(),
        format!("  Base URL: {}", style(&config.provider.base_url).cyan()),
        format!(
            "  Embedding Model: {}",
            style(&config.provider.embedding_model).cyan()
        ),
        format!("  Chat Model: {}", style(&config.provider.chat_model).cyan()),
        format!("  Batch Size: {}", style(config.provider.batch_size).cyan()),
        format!("  Temperature: {}", style(config.provider.temperature).cyan()),
        String::new(),
        style("Vector Store:").bold().yellow().to_string(),
        format!("  Path: {}", style(config.store.path.display()).cyan()),
        format!("  Collection: {}", style(&config.store.collection).cyan()),
        String::new(),
        style("Chat:").bold().yellow().to_string(),
        format!("  Top K: {}", style(config.chat.similarity_top_k).cyan()),
        format!(
            "  Memory Token Limit: {}",
            style(config.chat.memory_token_limit).cyan()
        ),
        String::new(),
        style("Server:").bold().yellow().to_string(),
    ];

    match config.server.socket_addr() {
        Ok(addr) => lines.push(format!("  Address: {}", style(addr).cyan())),
        Err(e) => lines.push(format!("  Address: {} ({e})", style("Invalid").red())),
    }
    lines.push(format!(
        "  Session Idle Timeout: {} min",
        style(config.server.session_idle_minutes).cyan()
    ));

    lines.push(String::new());
    lines.push(style("Secrets:").bold().yellow().to_string());
    lines.push(format!(
        "  {}: {}",
        super::API_KEY_VAR,
        presence(secrets.has_api_key())
    ));
    lines.push(format!(
        "  {}: {}",
        super::PASSWORD_VAR,
        presence(secrets.has_password())
    ));

    lines.push(String::new());
    lines.push(format!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    ));

    lines
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_provider(provider: &mut ProviderConfig) -> Result<()> {
    let current = provider.clone();

    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(provider.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ProviderConfig {
                base_url: input.clone(),
                ..current.clone()
            }
            .validate()
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(provider.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(provider.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(provider.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    provider.set_base_url(base_url)?;
    provider.set_embedding_model(embedding_model)?;
    provider.set_chat_model(chat_model)?;
    provider.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_store(store: &mut StoreConfig) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("Vector store directory")
        .default(store.path.display().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Path cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let collection: String = Input::new()
        .with_prompt("Collection name")
        .default(store.collection.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            StoreConfig::default().set_collection(input.clone())
        })
        .interact_text()?;

    store.set_path(PathBuf::from(path))?;
    store.set_collection(collection)?;

    Ok(())
}

fn configure_server(server: &mut ServerConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Listen address")
        .default(server.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ServerConfig::default().set_host(input.clone())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Listen port")
        .default(server.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    server.set_host(host)?;
    server.set_port(port)?;

    Ok(())
}

/// Ping the provider's `models` endpoint with the configured key
fn test_provider_connection(provider: &ProviderConfig, secrets: &Secrets) -> bool {
    let api_key = secrets.api_key().unwrap_or_default();

    match OpenAiClient::new(provider, api_key).and_then(|client| {
        client
            .with_timeout(CONNECTION_TEST_TIMEOUT)
            .with_retry_attempts(1)
            .ping()
    }) {
        Ok(()) => true,
        Err(e) => {
            debug!("Provider connection test failed: {:#}", e);
            false
        }
    }
}
