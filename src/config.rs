use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/reiche-auth.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8420,
            cors_allowed_origins: vec![
                "http://localhost:4200".to_string(),
                "http://127.0.0.1:4200".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    /// Lower values reduce memory usage but decrease GPU resistance.
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// HS256 signing secret for access tokens.
    /// Overridable via the REICHE_AUTH_JWT_SECRET environment variable.
    pub jwt_secret: String,

    /// Access token lifetime in minutes (default: 15)
    pub access_token_ttl_minutes: i64,

    /// Refresh token lifetime in days (default: 7)
    pub refresh_token_ttl_days: i64,

    /// Password reset token lifetime in minutes (default: 15)
    pub reset_token_ttl_minutes: i64,

    /// Days an inactive refresh token is kept before the retention job
    /// deletes it (default: 90)
    pub inactive_token_retention_days: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            jwt_secret: "dev-secret-trocar-em-producao".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
            reset_token_ttl_minutes: 15,
            inactive_token_retention_days: 90,
        }
    }
}

/// One named throttling profile: a fixed window of `window_seconds`
/// admitting at most `max_requests` per key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitProfile {
    pub max_requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Interval of the background sweep that drops expired windows.
    pub sweep_interval_seconds: u64,

    pub login: RateLimitProfile,

    pub register: RateLimitProfile,

    /// Covers both forgot-password and reset-password.
    pub password: RateLimitProfile,

    /// Generic POST/PUT/PATCH/DELETE traffic.
    pub mutation: RateLimitProfile,

    /// Everything else.
    pub read: RateLimitProfile,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_seconds: 60,
            login: RateLimitProfile {
                max_requests: 5,
                window_seconds: 15 * 60,
            },
            register: RateLimitProfile {
                max_requests: 3,
                window_seconds: 60 * 60,
            },
            password: RateLimitProfile {
                max_requests: 3,
                window_seconds: 60 * 60,
            },
            mutation: RateLimitProfile {
                max_requests: 100,
                window_seconds: 60,
            },
            read: RateLimitProfile {
                max_requests: 300,
                window_seconds: 60,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "reiche-auth".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("REICHE_AUTH_JWT_SECRET")
            && !secret.is_empty()
        {
            self.security.jwt_secret = secret;
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("reiche-auth").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".reiche-auth").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.jwt_secret.is_empty() {
            anyhow::bail!("security.jwt_secret cannot be empty");
        }

        if self.security.access_token_ttl_minutes <= 0 {
            anyhow::bail!("security.access_token_ttl_minutes must be > 0");
        }

        if self.security.refresh_token_ttl_days <= 0 {
            anyhow::bail!("security.refresh_token_ttl_days must be > 0");
        }

        for (name, profile) in [
            ("login", &self.rate_limit.login),
            ("register", &self.rate_limit.register),
            ("password", &self.rate_limit.password),
            ("mutation", &self.rate_limit.mutation),
            ("read", &self.rate_limit.read),
        ] {
            if profile.max_requests == 0 || profile.window_seconds == 0 {
                anyhow::bail!("rate_limit.{name} must have max_requests > 0 and window_seconds > 0");
            }
        }

        Ok(())
    }
}
