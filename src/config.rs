//! Configuration loading for rfd-solver.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.rfd-solver/config.toml` (user)
//! 3. `/etc/rfd-solver/config.toml` (system)
//! 4. built-in defaults
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.rfd-solver/secrets.toml` (user, must be 0600)
//! 2. `/etc/rfd-solver/secrets.toml` (system, must be 0600)
//! 3. `PINATA_JWT`, `PINATA_API_KEY` + `PINATA_SECRET_API_KEY` env vars

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{CacheConfig, CacheStore, MemoryBackend, PinataAuth, PinataClient};
use crate::generator::{DEFAULT_CONCURRENCY, DataGenerator};
use crate::pipeline::Pipeline;
use crate::providers::{MemoConfig, PokeApiClient, RetryConfig};
use crate::{Result, SolverError};

const APP_DIR: &str = ".rfd-solver";
const SYSTEM_DIR: &str = "/etc/rfd-solver";

/// Solver configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub pinata: PinataSection,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub output: OutputSection,
}

/// Which backend the cache store uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pinata; disabled when no credentials are available.
    #[default]
    Pinata,
    /// In-process, lost on exit.
    Memory,
    /// No caching.
    None,
}

/// Cache store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default)]
    pub backend: BackendKind,
    /// Entry time-to-live in seconds (default: 1800).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Local index capacity (default: 10000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Per-call backend timeout in seconds (default: 10).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            ttl_secs: default_ttl(),
            max_entries: default_max_entries(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_ttl() -> u64 {
    1800
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_timeout() -> u64 {
    10
}

/// Pinata endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PinataSection {
    #[serde(default = "default_pinata_url")]
    pub api_url: String,
    /// IPFS gateways, tried in order.
    #[serde(default = "default_gateways")]
    pub gateways: Vec<String>,
}

impl Default for PinataSection {
    fn default() -> Self {
        Self {
            api_url: default_pinata_url(),
            gateways: default_gateways(),
        }
    }
}

fn default_pinata_url() -> String {
    crate::cache::pinata::DEFAULT_API_URL.to_string()
}

fn default_gateways() -> Vec<String> {
    crate::cache::pinata::DEFAULT_GATEWAYS
        .iter()
        .map(|g| g.to_string())
        .collect()
}

/// Upstream provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    /// HTTP timeout in seconds (default: 10).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Response memo TTL in seconds (default: 3600).
    #[serde(default = "default_memo_ttl")]
    pub memo_ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub memo_max_entries: u64,
    /// Upstream requests in flight per RFD (default: 4).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            timeout_secs: default_timeout(),
            memo_ttl_secs: default_memo_ttl(),
            memo_max_entries: default_max_entries(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_provider_url() -> String {
    crate::providers::pokeapi::DEFAULT_BASE_URL.to_string()
}

fn default_memo_ttl() -> u64 {
    3600
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Retry settings for upstream requests.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    30_000
}

/// Local artifact settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    /// Directory for `<rfd_id>_solution.json` files (default: `data`).
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Secrets configuration (pinning service credentials).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub pinata: Option<PinataSecret>,
}

/// Pinata credentials as stored in `secrets.toml`.
#[derive(Clone, Default, Deserialize)]
pub struct PinataSecret {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub secret_api_key: Option<String>,
    #[serde(default)]
    pub jwt: Option<String>,
}

impl std::fmt::Debug for PinataSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataSecret")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("secret_api_key", &self.secret_api_key.as_ref().map(|_| "<redacted>"))
            .field("jwt", &self.jwt.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Pinata environment variables, checked after the secrets file.
const PINATA_JWT_VARS: &[&str] = &["PINATA_JWT", "PINATA_JWT_TOKEN"];
const PINATA_API_KEY_VAR: &str = "PINATA_API_KEY";
const PINATA_SECRET_VAR: &str = "PINATA_SECRET_API_KEY";

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path that does not exist is an error; when no path is
    /// given and no file exists, defaults are used.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                info!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SolverError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SolverError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(SolverError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(APP_DIR).join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = Path::new(SYSTEM_DIR).join("config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .ttl(Duration::from_secs(self.cache.ttl_secs))
            .max_entries(self.cache.max_entries)
            .timeout(Duration::from_secs(self.cache.timeout_secs))
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.retry.max_attempts)
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    pub fn memo_config(&self) -> MemoConfig {
        MemoConfig::new()
            .max_entries(self.provider.memo_max_entries)
            .ttl(Duration::from_secs(self.provider.memo_ttl_secs))
    }

    /// Pinata client, if credentials are available.
    pub fn pinata_client(&self, secrets: &Secrets) -> Result<Option<PinataClient>> {
        let Some(auth) = secrets.pinata_auth() else {
            return Ok(None);
        };
        let client = PinataClient::new(auth, Duration::from_secs(self.cache.timeout_secs))?
            .api_url(self.pinata.api_url.clone())
            .gateways(self.pinata.gateways.clone());
        Ok(Some(client))
    }

    /// Build the cache store for the configured backend.
    ///
    /// A Pinata backend without credentials yields a disabled store.
    pub fn cache_store(&self, secrets: &Secrets) -> Result<CacheStore> {
        let config = self.cache_config();
        let store = match self.cache.backend {
            BackendKind::Pinata => match self.pinata_client(secrets)? {
                Some(client) => CacheStore::new(Arc::new(client), config),
                None => {
                    warn!("Pinata credentials not configured, cache disabled");
                    CacheStore::disabled(config)
                }
            },
            BackendKind::Memory => CacheStore::new(Arc::new(MemoryBackend::new()), config),
            BackendKind::None => CacheStore::disabled(config),
        };
        Ok(store)
    }

    /// Build the generator over PokéAPI.
    pub fn generator(&self) -> Result<DataGenerator> {
        let client = PokeApiClient::with_base_url(
            self.provider.base_url.clone(),
            Duration::from_secs(self.provider.timeout_secs),
            &self.memo_config(),
        )?;
        Ok(DataGenerator::new(Arc::new(client), self.retry_config())
            .with_concurrency(self.provider.concurrency))
    }

    /// Build the full pipeline.
    pub fn pipeline(&self, secrets: &Secrets) -> Result<Pipeline> {
        Ok(Pipeline::new(
            Arc::new(self.cache_store(secrets)?),
            self.generator()?,
        ))
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.rfd-solver/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/rfd-solver/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (credentials may come from
    /// env vars).
    pub fn load() -> Result<Self> {
        // Try user secrets first
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(APP_DIR).join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        // Try system secrets
        let system_secrets = Path::new(SYSTEM_DIR).join("secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            SolverError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SolverError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            SolverError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(SolverError::Configuration(format!(
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

    /// Pinata credentials from the secrets file, falling back to env vars.
    pub fn pinata_auth(&self) -> Option<PinataAuth> {
        self.pinata_auth_with(|name| std::env::var(name).ok())
    }

    /// Resolve credentials with an explicit env lookup.
    ///
    /// A JWT wins over an API key pair. A key without its secret is ignored.
    pub fn pinata_auth_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<PinataAuth> {
        let file = self.pinata.clone().unwrap_or_default();
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let jwt = non_empty(file.jwt)
            .or_else(|| PINATA_JWT_VARS.iter().find_map(|var| non_empty(env(*var))));
        if let Some(jwt) = jwt {
            return Some(PinataAuth::Jwt(jwt));
        }

        let key = non_empty(file.api_key).or_else(|| non_empty(env(PINATA_API_KEY_VAR)));
        let secret =
            non_empty(file.secret_api_key).or_else(|| non_empty(env(PINATA_SECRET_VAR)));
        match (key, secret) {
            (Some(key), Some(secret)) => Some(PinataAuth::ApiKey { key, secret }),
            _ => None,
        }
    }
}
