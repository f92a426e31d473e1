use crate::cli::error::{CliError, Result};
use crate::core::{ClientConfig, Credentials};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_HOSTNAME: &str = "ARIA_HOSTNAME";
pub const ENV_USERNAME: &str = "ARIA_USERNAME";
pub const ENV_DEFAULT_USER: &str = "ARIA_DEFAULT_USER";
pub const ENV_PASSWORD: &str = "ARIA_PASSWORD";
pub const ENV_DOMAIN: &str = "ARIA_DOMAIN";
pub const ENV_INSECURE: &str = "ARIA_INSECURE";

/// Settings of the aria-health CLI, stored as TOML
///
/// The password is deliberately absent; it only ever comes from the
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Connection and collection settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Login identity
    #[serde(default)]
    pub auth: AuthSettings,

    /// Report output preferences
    #[serde(default)]
    pub output: OutputSettings,
}

/// Login identity without the secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_username")]
    pub username: String,

    /// Authentication source passed as `authSource`
    pub domain: Option<String>,
}

/// Output formatting defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory reports are written into; the working directory when unset
    pub directory: Option<PathBuf>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            username: default_username(),
            domain: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from file, creating it with defaults when missing
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_file(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&content).map_err(|e| {
            CliError::configuration(format!("Failed to parse config file: {}", e))
        })?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::configuration(format!("Failed to serialize config: {}", e)))
    }

    /// Get the default config file path, `<config_dir>/aria-ops/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| CliError::configuration("could not determine the config directory"))?;
        Ok(dir.join("aria-ops").join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load_default() -> Result<Self> {
        Self::load_from_file(Self::default_path()?)
    }

    /// Apply `ARIA_*` overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply `ARIA_*` overrides read through `lookup`
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = lookup(ENV_HOSTNAME) {
            self.client.base_url = base_url_for_host(&host);
        }
        if let Some(username) = lookup(ENV_USERNAME).or_else(|| lookup(ENV_DEFAULT_USER)) {
            self.auth.username = username;
        }
        if let Some(domain) = lookup(ENV_DOMAIN) {
            self.auth.domain = Some(domain);
        }
        if lookup(ENV_INSECURE).as_deref() == Some("1") {
            self.client.verify_tls = false;
        }
        self
    }

    /// Merge with command-line arguments, giving priority to CLI args
    pub fn merge_with_cli_args(mut self, cli_args: &crate::cli::app::Cli) -> Self {
        if let Some(ref host) = cli_args.host {
            self.client.base_url = base_url_for_host(host);
        }
        if let Some(ref username) = cli_args.username {
            self.auth.username = username.clone();
        }
        if cli_args.insecure {
            self.client.verify_tls = false;
        }
        if let Some(timeout) = cli_args.timeout {
            self.client.timeout_secs = timeout;
        }
        self
    }

    /// Credentials for this configuration and the given password
    pub fn credentials(&self, password: String) -> Credentials {
        let credentials = Credentials::new(self.auth.username.clone(), password);
        match &self.auth.domain {
            Some(domain) => credentials.with_domain(domain.clone()),
            None => credentials,
        }
    }

    pub fn output_directory(&self) -> PathBuf {
        self.output
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Read the password from `ARIA_PASSWORD`
pub fn resolve_password() -> Result<String> {
    resolve_password_with(|key| std::env::var(key).ok())
}

pub fn resolve_password_with<F>(lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_PASSWORD)
        .filter(|password| !password.is_empty())
        .ok_or(CliError::MissingPassword(ENV_PASSWORD))
}

/// Accept either a bare host name or a full URL
fn base_url_for_host(host: &str) -> String {
    let host = host.trim();
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

// Helper functions for default values
fn default_username() -> String {
    "admin".to_string()
}
