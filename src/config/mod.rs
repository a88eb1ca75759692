// Configuration management module
// TOML settings, secrets lookup and the interactive editor

pub mod interactive;
pub mod secrets;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use secrets::{API_KEY_VAR, PASSWORD_VAR, Secrets};
pub use settings::{ChatConfig, Config, ConfigError, ProviderConfig, ServerConfig, StoreConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
