mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./vidresolve.toml", "~/.config/vidresolve/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let base = url::Url::parse(&config.origin.base_url)
        .with_context(|| format!("Invalid origin base_url: {}", config.origin.base_url))?;
    if !matches!(base.scheme(), "http" | "https") {
        anyhow::bail!("Origin base_url must be http or https: {}", base);
    }

    if config.origin.language.trim().is_empty() {
        anyhow::bail!("Origin language cannot be empty");
    }

    if config.http.timeout_secs == 0 {
        anyhow::bail!("HTTP timeout cannot be 0");
    }

    if let Some(proxy) = &config.http.proxy {
        url::Url::parse(proxy).with_context(|| format!("Invalid proxy URL: {}", proxy))?;
    }

    if config.retry.max_delay_ms < config.retry.initial_delay_ms {
        anyhow::bail!(
            "Retry max_delay_ms ({}) is less than initial_delay_ms ({})",
            config.retry.max_delay_ms,
            config.retry.initial_delay_ms
        );
    }

    Ok(())
}
