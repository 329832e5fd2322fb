// File: src/config.rs
// Purpose: Configuration parsing from reservas.toml with environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub resos: ResosConfig,

    #[serde(default)]
    pub booking: BookingConfig,

    #[serde(default)]
    pub app: AppConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

/// resOS API access
#[derive(Clone, Serialize, Deserialize)]
pub struct ResosConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as the Basic auth username with an empty password
    #[serde(default)]
    pub api_key: String,

    /// Request timeout; unset leaves the HTTP client default in place
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// How guest input is reshaped before it reaches resOS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Prefixed to phone numbers without a leading '+'
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Origin channel reported to resOS
    #[serde(default = "default_source")]
    pub source: String,

    /// Fixed offset for interpreting date + time; unset uses the host's local time
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("Unknown environment: {}", other),
        }
    }
}

const MINUTES_PER_DAY: i32 = 24 * 60;

// Default values
fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_url() -> String {
    "https://api.resos.com/v1".to_string()
}

fn default_country_code() -> String {
    "+56".to_string()
}

fn default_source() -> String {
    "website".to_string()
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for ResosConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: None,
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            source: default_source(),
            utc_offset_minutes: None,
        }
    }
}

impl fmt::Debug for ResosConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResosConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;

        Ok(config)
    }

    /// Load ./reservas.toml, then apply `.env` and process environment overrides
    pub fn load_default() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::load("reservas.toml")?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override settings from environment-style variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("RESOS_API_KEY") {
            self.resos.api_key = key;
        }
        if let Some(url) = lookup("RESOS_BASE_URL") {
            self.resos.base_url = url;
        }
        if let Some(host) = lookup("RESERVAS_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("RESERVAS_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid RESERVAS_PORT: {}", port))?;
        }
        if let Some(env) = lookup("RESERVAS_ENV") {
            self.app.environment = env.parse()?;
        }
        if let Some(offset) = lookup("RESERVAS_UTC_OFFSET_MINUTES") {
            let minutes = offset
                .trim()
                .parse()
                .with_context(|| format!("Invalid RESERVAS_UTC_OFFSET_MINUTES: {}", offset))?;
            self.booking.utc_offset_minutes = Some(minutes);
        }
        self.validate()
    }

    /// Reject settings that would otherwise be silently ignored
    pub fn validate(&self) -> Result<()> {
        if let Some(minutes) = self.booking.utc_offset_minutes {
            if minutes.abs() >= MINUTES_PER_DAY {
                anyhow::bail!(
                    "booking.utc_offset_minutes must be within ±{} minutes, got {}",
                    MINUTES_PER_DAY - 1,
                    minutes
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.resos.base_url, "https://api.resos.com/v1");
        assert_eq!(config.booking.country_code, "+56");
        assert_eq!(config.booking.source, "website");
        assert_eq!(config.app.environment, Environment::Production);
    }

    #[test]
    fn test_empty_config() {
        let config = toml::from_str::<Config>("").unwrap_or_default();
        assert_eq!(config.server.port, 3000);
        assert!(config.resos.timeout_secs.is_none());
    }

    #[test]
    fn test_custom_sections() {
        let toml = r#"
            [resos]
            api_key = "secret"
            timeout_secs = 10

            [booking]
            country_code = "+54"
            utc_offset_minutes = -180

            [app]
            environment = "development"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.resos.api_key, "secret");
        assert_eq!(config.resos.timeout_secs, Some(10));
        assert_eq!(config.booking.country_code, "+54");
        assert_eq!(config.booking.utc_offset_minutes, Some(-180));
        assert!(config.app.environment.is_development());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RESOS_API_KEY", "from-env"),
            ("RESERVAS_PORT", "8080"),
            ("RESERVAS_ENV", "dev"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.resos.api_key, "from-env");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.app.environment, Environment::Development);
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let result = config.apply_env(|key| (key == "RESERVAS_PORT").then(|| "abc".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        let config: Config = toml::from_str("[booking]\nutc_offset_minutes = 1440").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[booking]\nutc_offset_minutes = -1439").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_offset_override() {
        let mut config = Config::default();
        config
            .apply_env(|key| (key == "RESERVAS_UTC_OFFSET_MINUTES").then(|| "-180".to_string()))
            .unwrap();
        assert_eq!(config.booking.utc_offset_minutes, Some(-180));

        let result =
            config.apply_env(|key| (key == "RESERVAS_UTC_OFFSET_MINUTES").then(|| "90000".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_out_of_range_offset() {
        let path = std::env::temp_dir().join(format!("reservas-offset-{}.toml", std::process::id()));
        fs::write(&path, "[booking]\nutc_offset_minutes = -2000\n").unwrap();
        let result = Config::load(&path);
        fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = Config::default();
        config.resos.api_key = "QroV6-secret".to_string();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("QroV6-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
