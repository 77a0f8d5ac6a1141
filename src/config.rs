//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'ottimizzatore.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` passata esplicitamente all'ottimizzatore
//!   (nessuno stato globale di processo)
//! - Fornisce validazione dei parametri
//! - Supporta caricamento/salvataggio da/verso file JSON
//! - Legge i due flag storici dalle variabili d'ambiente
//!
//! ## Parametri di configurazione:
//! - `method`: Strategia di ottimizzazione (`"pillow"` locale o `"tinypng"` remota)
//! - `tinypng_key`: Chiave API, usata solo dalla strategia remota
//! - `testing`: Modalità test, l'ottimizzatore diventa un no-op
//! - `jpeg_quality`: Qualità JPEG per il re-encode locale (1-100, default: 75)
//! - `tinypng_endpoint`: Base URL del servizio (default: `https://api.tinify.com`)
//! - `batch_mode`: Comportamento del batch legacy (`report` o `apply`)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     method: OptimizeMethod::TinyPng,
//!     tinypng_key: Some("abc123".to_string()),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable selecting the strategy
pub const METHOD_ENV: &str = "OPTIMIZED_IMAGE_METHOD";
/// Environment variable holding the TinyPNG API key
pub const TINYPNG_KEY_ENV: &str = "TINYPNG_KEY";

pub const DEFAULT_TINYPNG_ENDPOINT: &str = "https://api.tinify.com";

/// Backend used to optimize a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OptimizeMethod {
    /// Decode and re-encode in process
    #[default]
    #[serde(rename = "pillow", alias = "local")]
    Local,
    /// Send the bytes to the TinyPNG API
    #[serde(rename = "tinypng")]
    TinyPng,
}

impl FromStr for OptimizeMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pillow" | "local" => Ok(Self::Local),
            "tinypng" => Ok(Self::TinyPng),
            other => Err(anyhow::anyhow!(
                "Unknown optimization method '{}' (expected 'pillow' or 'tinypng')",
                other
            )),
        }
    }
}

impl std::fmt::Display for OptimizeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "pillow"),
            Self::TinyPng => write!(f, "tinypng"),
        }
    }
}

/// What the legacy batch routine does with eligible images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Enumerate and narrate only, nothing is rewritten
    #[default]
    Report,
    /// Run the optimizer on every eligible image and persist the result
    Apply,
}

/// Values given on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub method: Option<OptimizeMethod>,
    pub tinypng_key: Option<String>,
    pub jpeg_quality: Option<u8>,
    /// Only ever turns testing mode on
    pub dry_run: bool,
}

/// Configuration for image optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Optimization backend
    pub method: OptimizeMethod,
    /// TinyPNG API key
    pub tinypng_key: Option<String>,
    /// Skip all optimization work (automated test runs)
    pub testing: bool,
    /// JPEG quality used by the local re-encode (1-100)
    pub jpeg_quality: u8,
    /// Base URL of the TinyPNG API
    pub tinypng_endpoint: String,
    /// Legacy batch behaviour
    pub batch_mode: BatchMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: OptimizeMethod::Local,
            tinypng_key: None,
            testing: false,
            jpeg_quality: 75,
            tinypng_endpoint: DEFAULT_TINYPNG_ENDPOINT.to_string(),
            batch_mode: BatchMode::Report,
        }
    }
}

impl Config {
    /// Configuration that turns every optimization into a no-op
    pub fn testing() -> Self {
        Self {
            testing: true,
            ..Default::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG quality must be between 1 and 100"));
        }

        if self.method == OptimizeMethod::TinyPng && self.api_key().is_none() {
            return Err(anyhow::anyhow!(
                "The tinypng method requires an API key ({} or tinypng_key)",
                TINYPNG_KEY_ENV
            ));
        }

        if self.tinypng_endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("TinyPNG endpoint must not be empty"));
        }

        Ok(())
    }

    /// Non-blank API key, if any
    pub fn api_key(&self) -> Option<&str> {
        self.tinypng_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Overlay the strategy flag and API key from the environment
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Overlay the strategy flag and API key from `lookup`
    pub fn with_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(method) = lookup(METHOD_ENV) {
            self.method = method.parse()?;
        }
        if let Some(key) = lookup(TINYPNG_KEY_ENV) {
            self.tinypng_key = Some(key);
        }
        Ok(self)
    }

    /// Overlay explicit command-line values
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(method) = overrides.method {
            self.method = method;
        }
        if let Some(ref key) = overrides.tinypng_key {
            self.tinypng_key = Some(key.clone());
        }
        if let Some(quality) = overrides.jpeg_quality {
            self.jpeg_quality = quality;
        }
        self.testing |= overrides.dry_run;
        self
    }

    /// Defaults plus environment
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("optimized-image").join("config.json"))
    }

    /// Load configuration from file.
    ///
    /// Not validated: env and command-line values may still complete it.
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.jpeg_quality = 75;
        config.method = OptimizeMethod::TinyPng;
        assert!(config.validate().is_err());

        config.tinypng_key = Some("   ".to_string());
        assert!(config.validate().is_err());

        config.tinypng_key = Some("abc123".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.method, OptimizeMethod::Local);
        assert_eq!(config.jpeg_quality, 75);
        assert_eq!(config.tinypng_endpoint, DEFAULT_TINYPNG_ENDPOINT);
        assert_eq!(config.batch_mode, BatchMode::Report);
        assert!(!config.testing);
        assert!(Config::testing().testing);
    }

    #[test]
    fn test_method_flag_strings() {
        assert_eq!("pillow".parse::<OptimizeMethod>().unwrap(), OptimizeMethod::Local);
        assert_eq!("TinyPNG".parse::<OptimizeMethod>().unwrap(), OptimizeMethod::TinyPng);
        assert!("imagemagick".parse::<OptimizeMethod>().is_err());

        let json = serde_json::to_string(&OptimizeMethod::TinyPng).unwrap();
        assert_eq!(json, "\"tinypng\"");
        let parsed: OptimizeMethod = serde_json::from_str("\"pillow\"").unwrap();
        assert_eq!(parsed, OptimizeMethod::Local);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            method: OptimizeMethod::TinyPng,
            tinypng_key: Some("abc123".to_string()),
            jpeg_quality: 85,
            batch_mode: BatchMode::Apply,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.method, OptimizeMethod::TinyPng);
        assert_eq!(loaded_config.api_key(), Some("abc123"));
        assert_eq!(loaded_config.jpeg_quality, 85);
        assert_eq!(loaded_config.batch_mode, BatchMode::Apply);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.method, OptimizeMethod::Local);
    }

    #[tokio::test]
    async fn test_file_env_cli_layering() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"method": "tinypng", "testing": true}"#).unwrap();

        let from_file = Config::from_file(&config_path).await.unwrap();
        assert!(from_file.validate().is_err());

        let env = |name: &str| (name == TINYPNG_KEY_ENV).then(|| "abc123".to_string());
        let config = from_file
            .with_vars(env)
            .unwrap()
            .with_overrides(&ConfigOverrides {
                jpeg_quality: Some(90),
                ..Default::default()
            });

        assert!(config.validate().is_ok());
        assert_eq!(config.method, OptimizeMethod::TinyPng);
        assert_eq!(config.api_key(), Some("abc123"));
        assert_eq!(config.jpeg_quality, 90);
        assert!(config.testing);
    }

    #[test]
    fn test_cli_overrides_env() {
        let env = |name: &str| match name {
            METHOD_ENV => Some("tinypng".to_string()),
            TINYPNG_KEY_ENV => Some("from-env".to_string()),
            _ => None,
        };
        let config = Config::default()
            .with_vars(env)
            .unwrap()
            .with_overrides(&ConfigOverrides {
                method: Some(OptimizeMethod::Local),
                tinypng_key: Some("from-cli".to_string()),
                dry_run: true,
                ..Default::default()
            });

        assert_eq!(config.method, OptimizeMethod::Local);
        assert_eq!(config.api_key(), Some("from-cli"));
        assert!(config.testing);
    }

    #[test]
    fn test_invalid_env_method() {
        let env = |name: &str| (name == METHOD_ENV).then(|| "magick".to_string());
        assert!(Config::default().with_vars(env).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"method": "tinypng"}"#).unwrap();
        assert_eq!(config.method, OptimizeMethod::TinyPng);
        assert_eq!(config.jpeg_quality, 75);
        assert!(config.tinypng_key.is_none());
    }
}
