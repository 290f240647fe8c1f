//! Provider configuration
//!
//! Loaded from `~/.config/netform/provider.toml` (or `--config`). Connection
//! settings can be overridden per invocation with flags or `NETFORM_*`
//! environment variables.

use anyhow::{Context, Result, bail};
use controller::{Connection, RetryConfig};
use reconcile::{MergePolicy, Reconciler};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("netform"))
}

/// Default provider config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("provider.toml"))
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(&raw).as_ref()),
    }
}

// ============================================================================
// Config structures
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub controller: ControllerSettings,
    pub retry: RetrySettings,
    pub reconcile: ReconcileSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerSettings {
    pub url: Option<String>,
    pub site: String,
    pub api_key: Option<String>,
    pub insecure: bool,
    pub timeout_secs: u64,
    /// `/proxy/network` on UniFi OS consoles, empty on standalone controllers
    pub api_prefix: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            url: None,
            site: "default".to_string(),
            api_key: None,
            insecure: false,
            timeout_secs: 30,
            api_prefix: "/proxy/network".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
            backoff_factor: defaults.backoff_factor,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Refuse to apply objects whose references are still unresolved
    pub strict: bool,
    #[serde(flatten)]
    pub policy: MergePolicy,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            strict: true,
            policy: MergePolicy::default(),
        }
    }
}

/// Per-invocation overrides from flags and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub site: Option<String>,
    pub api_key: Option<String>,
    pub insecure: bool,
}

// ============================================================================
// Loading
// ============================================================================

impl ProviderConfig {
    /// Load config from `path`, or the default location.
    ///
    /// A missing file is not an error: everything can come from overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => expand_path(path),
            None => default_config_path()?,
        };

        if !path.exists() {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply flag/environment overrides on top of the file.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(url) = &overrides.url {
            self.controller.url = Some(url.clone());
        }
        if let Some(site) = &overrides.site {
            self.controller.site = site.clone();
        }
        if let Some(api_key) = &overrides.api_key {
            self.controller.api_key = Some(api_key.clone());
        }
        if overrides.insecure {
            self.controller.insecure = true;
        }
        self
    }

    /// Connection settings for the controller client.
    pub fn connection(&self) -> Result<Connection> {
        let settings = &self.controller;
        let Some(url) = settings.url.as_deref().filter(|u| !u.is_empty()) else {
            bail!("Controller URL is not configured (set [controller].url, --url or NETFORM_URL)");
        };
        let Some(api_key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) else {
            bail!(
                "Controller API key is not configured (set [controller].api_key, --api-key or NETFORM_API_KEY)"
            );
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Controller URL must start with http:// or https://, got '{url}'");
        }

        let mut connection = Connection::new(url, api_key);
        connection.site = settings.site.clone();
        connection.insecure = settings.insecure;
        connection.timeout = Duration::from_secs(settings.timeout_secs.max(1));
        connection.api_prefix = settings.api_prefix.clone();
        Ok(connection)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            backoff_factor: self.retry.backoff_factor.max(1.0),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    /// Reconciler used for apply; strict unless disabled in config.
    pub fn reconciler(&self) -> Reconciler {
        if self.reconcile.strict {
            Reconciler::new(self.reconcile.policy)
        } else {
            Reconciler::lenient(self.reconcile.policy)
        }
    }

    /// Reconciler used for previews; unresolved values are expected there.
    pub fn preview_reconciler(&self) -> Reconciler {
        Reconciler::lenient(self.reconcile.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{EmptyCollections, ZeroScalars};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ProviderConfig::load(Some(temp.path().join("nope.toml").as_path())).unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert!(config.reconcile.strict);
    }

    #[test]
    fn test_load_full_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("provider.toml");
        fs::write(
            &path,
            r#"
[controller]
url = "https://10.0.0.1"
api_key = "secret"
site = "branch"
insecure = true

[retry]
max_attempts = 5

[reconcile]
zero_scalars = "overwrite"
empty_collections = "clear"
"#,
        )
        .unwrap();

        let config = ProviderConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.controller.site, "branch");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.reconcile.policy.zero_scalars, ZeroScalars::Overwrite);
        assert_eq!(config.reconcile.policy.empty_collections, EmptyCollections::Clear);

        let connection = config.connection().unwrap();
        assert!(connection.insecure);
        assert_eq!(connection.site, "branch");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("provider.toml");
        fs::write(&path, "[controller]\nuri = \"https://x\"\n").unwrap();
        assert!(ProviderConfig::load(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = ProviderConfig::default().with_overrides(&Overrides {
            url: Some("https://192.168.1.1".into()),
            site: Some("lab".into()),
            api_key: Some("k".into()),
            insecure: false,
        });
        let connection = config.connection().unwrap();
        assert_eq!(connection.url, "https://192.168.1.1");
        assert_eq!(connection.site, "lab");
    }

    #[test]
    fn test_missing_credentials_are_reported() {
        let err = ProviderConfig::default().connection().unwrap_err();
        assert!(err.to_string().contains("URL is not configured"));

        let config = ProviderConfig::default().with_overrides(&Overrides {
            url: Some("https://192.168.1.1".into()),
            ..Default::default()
        });
        let err = config.connection().unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_retry_config_conversion() {
        let mut config = ProviderConfig::default();
        config.retry.base_delay_ms = 250;
        config.retry.max_attempts = 0;
        let retry = config.retry_config();
        assert_eq!(retry.base_delay, Duration::from_millis(250));
        assert_eq!(retry.max_attempts, 1);
    }

    #[test]
    fn test_reconciler_strictness() {
        let mut config = ProviderConfig::default();
        assert!(config.reconciler().is_strict());
        assert!(!config.preview_reconciler().is_strict());
        config.reconcile.strict = false;
        assert!(!config.reconciler().is_strict());
    }
}
