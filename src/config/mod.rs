//! Configuration management
//!
//! YAML configuration with:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Access engine settings (navigation file, reserved modules, unknown-module policy)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::DEFAULT_LOGOUT_MODULE_ID;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub access: AccessConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://./data/module-access.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default)]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation
    File,
    /// Log to both console and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_prefix() -> String {
    "module-access".to_string()
}

fn default_log_rotation() -> bool {
    true
}

/// How callers are identified
///
/// Authentication happens upstream; this service only reads the role the
/// upstream layer resolved for the session.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Trusted header carrying the caller's role slug
    #[serde(default = "default_role_header")]
    pub role_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            role_header: default_role_header(),
        }
    }
}

fn default_role_header() -> String {
    "x-user-role".to_string()
}

/// Decision for modules known to neither the merged table nor the module tree
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnknownModulePolicy {
    Allow,
    #[default]
    Deny,
}

/// Access engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessConfig {
    /// Navigation tree file (YAML); no file means an empty tree
    #[serde(default)]
    pub navigation_file: Option<PathBuf>,
    #[serde(default = "default_logout_module_id")]
    pub logout_module_id: String,
    /// Module guarding the permission and role management routes
    #[serde(default = "default_admin_module_id")]
    pub admin_module_id: String,
    #[serde(default)]
    pub unknown_module: UnknownModulePolicy,
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            navigation_file: None,
            logout_module_id: default_logout_module_id(),
            admin_module_id: default_admin_module_id(),
            unknown_module: UnknownModulePolicy::default(),
            store_timeout_secs: default_store_timeout(),
        }
    }
}

impl AccessConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

fn default_logout_module_id() -> String {
    DEFAULT_LOGOUT_MODULE_ID.to_string()
}

fn default_admin_module_id() -> String {
    "admin-permissions".to_string()
}

fn default_store_timeout() -> u64 {
    10
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables (prefixed with MODULE_ACCESS_)
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("MODULE_ACCESS_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without applying overrides
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Current directory
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            // System config directory
            PathBuf::from("/etc/module-access/config.yaml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("module-access/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MODULE_ACCESS_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MODULE_ACCESS_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MODULE_ACCESS_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }

        if let Ok(path) = std::env::var("MODULE_ACCESS_NAVIGATION") {
            self.access.navigation_file = Some(PathBuf::from(path));
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.auth.role_header.trim().is_empty() {
            anyhow::bail!("Role header name cannot be empty");
        }

        if self.access.logout_module_id.trim().is_empty() {
            anyhow::bail!("Logout module id cannot be empty");
        }
        if self.access.admin_module_id.trim().is_empty() {
            anyhow::bail!("Admin module id cannot be empty");
        }
        if self.access.admin_module_id == self.access.logout_module_id {
            anyhow::bail!(
                "Admin module id '{}' cannot be the logout module",
                self.access.admin_module_id
            );
        }
        if self.access.store_timeout_secs == 0 {
            anyhow::bail!("Store timeout must be at least 1 second");
        }

        if let Some(ref nav) = self.access.navigation_file {
            if !nav.exists() {
                tracing::warn!(
                    "Navigation file does not exist: {:?}. Only stored modules will be served.",
                    nav
                );
            }
        }

        Ok(())
    }
}
