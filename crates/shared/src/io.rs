use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::SessionCookies;

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "news-poster";
const CONFIG_FILE: &str = "config.json";

/// Locate the configuration file.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Ok(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join(APP_DIR).join(CONFIG_FILE);
        if path.exists() {
            return Ok(path);
        }
    }

    anyhow::bail!(
        "No config file found.\n\n\
        Create ./{CONFIG_FILE} or ~/.config/{APP_DIR}/{CONFIG_FILE}, or pass --config <path>."
    )
}

/// Serialize with 4-space indentation.
pub fn to_pretty_json(value: &serde_json::Value) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .context("Failed to serialize config")?;
    String::from_utf8(buf).context("Serialized config is not valid UTF-8")
}

/// Replace the `cookies` object of the config file, keeping every other key.
pub fn save_cookies(path: &Path, cookies: &SessionCookies) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;

    let object = config
        .as_object_mut()
        .with_context(|| format!("Config file {} is not a JSON object", path.display()))?;
    object.insert(
        "cookies".to_string(),
        serde_json::Value::Object(cookies.to_json_map()),
    );

    let json = to_pretty_json(&config)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

/// Destination for refreshed session cookies.
pub trait CookieSink: Send {
    fn persist(&mut self, cookies: &SessionCookies) -> Result<()>;
}

/// Writes cookies back into the config file they were loaded from.
#[derive(Debug, Clone)]
pub struct ConfigFileSink {
    path: PathBuf,
}

impl ConfigFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CookieSink for ConfigFileSink {
    fn persist(&mut self, cookies: &SessionCookies) -> Result<()> {
        save_cookies(&self.path, cookies)
    }
}
