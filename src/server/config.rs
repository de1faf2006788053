//! Configuration loading for emailpilot-aid.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.emailpilot/config.toml` (user)
//! 3. `/etc/emailpilot/config.toml` (system)
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.emailpilot/secrets.toml` (user, must be 0600)
//! 2. `/etc/emailpilot/secrets.toml` (system, must be 0600)
//!
//! Missing keys fall back to `OPENAI_API_KEY`, `ANTHROPIC_API_KEY` and
//! `GEMINI_API_KEY`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::health::HealthConfig;
use crate::orchestrator::OrchestratorBuilder;
use crate::providers::RetryConfig;
use crate::types::Provider;
use crate::{Orchestrator, OrchestratorError, Result};

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub health: HealthSection,
    /// Present = retries enabled.
    #[serde(default)]
    pub retry: Option<RetrySection>,
    #[serde(default)]
    pub routing: RoutingSection,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8787).
    #[serde(default = "default_address")]
    pub address: String,
    /// Vendor request timeout in seconds (default: 60).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// Per-provider settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: Option<ProviderSection>,
    #[serde(default, alias = "claude")]
    pub anthropic: Option<ProviderSection>,
    #[serde(default, alias = "google")]
    pub gemini: Option<ProviderSection>,
}

impl ProvidersConfig {
    fn section(&self, provider: Provider) -> Option<&ProviderSection> {
        match provider {
            Provider::OpenAi => self.openai.as_ref(),
            Provider::Claude => self.anthropic.as_ref(),
            Provider::Gemini => self.gemini.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSection {
    /// API base URL override.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Set to false to leave the provider unconfigured even with a key.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_cache_entries(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_entries() -> u64 {
    1_000
}

fn default_cache_ttl() -> u64 {
    3_600
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSection {
    /// Model catalog TTL in seconds (default: 6 hours).
    #[serde(default = "default_catalog_ttl")]
    pub ttl_secs: u64,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_catalog_ttl(),
        }
    }
}

fn default_catalog_ttl() -> u64 {
    6 * 3_600
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthSection {
    #[serde(default = "default_health_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_health_ttl(),
            timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_health_ttl() -> u64 {
    300
}

fn default_probe_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_initial_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_retry_max_ms")]
    pub max_delay_ms: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_initial_ms() -> u64 {
    500
}

fn default_retry_max_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSection {
    /// Route marketing content to the marketing model (default: true).
    #[serde(default = "default_true")]
    pub marketing_override: bool,
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            marketing_override: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub openai: Option<ApiKeySecret>,
    #[serde(default, alias = "claude")]
    pub anthropic: Option<ApiKeySecret>,
    #[serde(default, alias = "google")]
    pub gemini: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// Environment variables consulted when the secrets file has no key.
fn env_vars(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::OpenAi => &["OPENAI_API_KEY"],
        Provider::Claude => &["ANTHROPIC_API_KEY"],
        Provider::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
    }
}

impl Config {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            OrchestratorError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            OrchestratorError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(OrchestratorError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".emailpilot").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/emailpilot/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(OrchestratorError::Configuration(
            "No config file found. Create ~/.emailpilot/config.toml or /etc/emailpilot/config.toml"
                .to_string(),
        ))
    }

    /// Builder populated from this configuration and the given secrets.
    ///
    /// A provider is configured when it has a key and its section (if any)
    /// is enabled.
    pub fn orchestrator_builder(&self, secrets: &Secrets) -> OrchestratorBuilder {
        let mut builder = Orchestrator::builder()
            .timeout(Duration::from_secs(self.server.request_timeout_secs))
            .catalog_ttl(Duration::from_secs(self.catalog.ttl_secs))
            .health_config(
                HealthConfig::new()
                    .ttl(Duration::from_secs(self.health.ttl_secs))
                    .timeout(Duration::from_secs(self.health.timeout_secs)),
            );

        builder = if self.cache.enabled {
            builder.response_cache(
                CacheConfig::new()
                    .max_entries(self.cache.max_entries)
                    .ttl(Duration::from_secs(self.cache.ttl_secs)),
            )
        } else {
            builder.disable_response_cache()
        };

        if let Some(retry) = &self.retry {
            builder = builder.retry(
                RetryConfig::new()
                    .max_attempts(retry.max_attempts)
                    .initial_delay(Duration::from_millis(retry.initial_delay_ms))
                    .max_delay(Duration::from_millis(retry.max_delay_ms)),
            );
        }

        if !self.routing.marketing_override {
            builder = builder.disable_marketing_route();
        }

        for provider in Provider::ALL {
            let section = self.providers.section(provider);
            if section.is_some_and(|s| !s.enabled) {
                continue;
            }
            let base_url = section.and_then(|s| s.base_url.clone());
            let Some(key) = secrets.api_key(provider) else {
                continue;
            };
            builder = match provider {
                Provider::OpenAi => {
                    let b = builder.openai(key);
                    match base_url {
                        Some(url) => b.openai_base_url(url),
                        None => b,
                    }
                }
                Provider::Claude => {
                    let b = builder.anthropic(key);
                    match base_url {
                        Some(url) => b.anthropic_base_url(url),
                        None => b,
                    }
                }
                Provider::Gemini => {
                    let b = builder.gemini(key);
                    match base_url {
                        Some(url) => b.gemini_base_url(url),
                        None => b,
                    }
                }
            };
        }

        builder
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (keys may come from env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".emailpilot").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/emailpilot/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load secrets from a specific file after checking its permissions.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            OrchestratorError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            OrchestratorError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            OrchestratorError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(OrchestratorError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for a provider, falling back to its environment variables.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let from_file = match provider {
            Provider::OpenAi => self.openai.as_ref(),
            Provider::Claude => self.anthropic.as_ref(),
            Provider::Gemini => self.gemini.as_ref(),
        }
        .map(|s| s.api_key.trim().to_string())
        .filter(|k| !k.is_empty());

        from_file.or_else(|| {
            env_vars(provider)
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .find(|k| !k.trim().is_empty())
        })
    }
}
