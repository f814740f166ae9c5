use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::io;
use crate::session::{SessionCookies, TRACKED};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Run configuration, loaded once from the JSON config file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// File the configuration was read from; cookie refreshes are written back here.
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default)]
    pub cookies: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub open_ai_api_key: String,
    #[serde(default)]
    pub news_api_key: Option<String>,
    #[serde(default)]
    pub gpt_preamble: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default = "default_token_limit")]
    pub gpt_token_limit: u32,
    #[serde(default = "default_scrape_char_limit")]
    pub scrape_char_limit: usize,
    /// Re-scrape article pages instead of using the text returned by the news index.
    #[serde(default)]
    pub scraper: bool,
    #[serde(default = "default_model")]
    pub gpt_model: String,
}

fn default_token_limit() -> u32 {
    1000
}

fn default_scrape_char_limit() -> usize {
    4000
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Config {
    /// Load the config file and apply environment overrides.
    ///
    /// `explicit` takes precedence; otherwise `./config.json` and then
    /// `<config dir>/news-poster/config.json` are tried.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::try_load_dotenv();

        let path = io::resolve_config_path(explicit)?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_json(&path, &content)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a config document without touching the environment.
    pub fn from_json(path: &Path, content: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(content).with_context(|| {
            format!(
                "Failed to parse config JSON from {}. Expected an object with a \"cookies\" block.",
                path.display()
            )
        })?;
        config.path = path.to_path_buf();
        Ok(config)
    }

    pub fn session_cookies(&self) -> SessionCookies {
        SessionCookies::from_json_map(&self.cookies)
    }

    pub fn open_ai_api_key(&self) -> Result<&str> {
        let key = self.open_ai_api_key.trim();
        if key.is_empty() {
            anyhow::bail!(
                "open_ai_api_key not found.\n\n\
                Add \"open_ai_api_key\" to {} or set OPENAI_API_KEY.",
                self.path.display()
            );
        }
        Ok(key)
    }

    /// Key for the news index; only present once overrides have been applied.
    pub fn news_api_key(&self) -> Result<&str> {
        self.news_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .context(
                "news_api_key not found.\n\n\
                Add \"news_api_key\" to the config file or set NEWS_API_KEY.\n\
                Get an Event Registry key from: https://eventregistry.org/",
            )
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            self.open_ai_api_key = key;
        }
        if let Ok(key) = env::var("NEWS_API_KEY") {
            self.news_api_key = Some(key);
        }
    }

    /// Both session cookies are required for every run. API keys are checked
    /// by their accessors, so a session check works without them.
    fn validate(&self) -> Result<()> {
        let cookies = self.session_cookies();
        for name in TRACKED {
            if cookies.get(name).map_or(true, str::is_empty) {
                anyhow::bail!(
                    "cookies.{} missing from {}. Copy it from a logged-in browser session or run with --import-browser-cookies.",
                    name,
                    self.path.display()
                );
            }
        }
        Ok(())
    }

    fn try_load_dotenv() {
        if dotenvy::dotenv().is_ok() {
            return;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(io::APP_DIR).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let json = r#"{
            "cookies": {"JSESSIONID": "\"ajax:123\"", "li_at": "tok"},
            "open_ai_api_key": "sk-test",
            "news_api_key": "er-test",
            "gpt_preamble": "Write a post.",
            "bio": "I am a reporter.",
            "gpt_token_limit": 700,
            "scrape_char_limit": 2500,
            "scraper": true
        }"#;
        let config = Config::from_json(Path::new("config.json"), json).unwrap();

        assert_eq!(config.gpt_token_limit, 700);
        assert_eq!(config.scrape_char_limit, 2500);
        assert!(config.scraper);
        assert_eq!(config.gpt_model, DEFAULT_MODEL);
        assert_eq!(config.news_api_key().unwrap(), "er-test");
        assert_eq!(config.session_cookies().csrf_token(), Some("ajax:123"));
        assert_eq!(config.path, PathBuf::from("config.json"));
    }

    #[test]
    fn optional_keys_fall_back_to_defaults() {
        let json = r#"{"cookies": {"JSESSIONID": "abc", "li_at": "def"}, "scraper": false}"#;
        let config = Config::from_json(Path::new("c.json"), json).unwrap();

        assert!(!config.scraper);
        assert_eq!(config.gpt_token_limit, 1000);
        assert!(config.news_api_key().is_err());
    }

    #[test]
    fn session_cookies_alone_pass_validation() {
        let json = r#"{"cookies": {"JSESSIONID": "abc", "li_at": "def"}}"#;
        let config = Config::from_json(Path::new("c.json"), json).unwrap();

        config.validate().unwrap();
        assert!(config.open_ai_api_key().is_err());
        assert!(config.news_api_key().is_err());
    }

    #[test]
    fn missing_auth_token_fails_validation() {
        let json = r#"{
            "cookies": {"JSESSIONID": "abc"},
            "open_ai_api_key": "sk-test",
            "news_api_key": "er-test"
        }"#;
        let config = Config::from_json(Path::new("c.json"), json).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cookies.li_at"));
    }

    #[test]
    fn missing_session_id_fails_validation() {
        let json = r#"{"cookies": {"li_at": "def"}}"#;
        let config = Config::from_json(Path::new("c.json"), json).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cookies.JSESSIONID"));
    }

    #[test]
    fn rejects_malformed_document() {
        let err = Config::from_json(Path::new("broken.json"), "{ not json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
