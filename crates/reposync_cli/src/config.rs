//! Configuration file support for reposync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `REPOSYNC_`, sections separated by `__`,
//!    e.g. `REPOSYNC_GITHUB__KEY`, `REPOSYNC_SYNC__BATCH_CAP`)
//! 3. Config file (~/.config/reposync/config.toml or ./reposync.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/reposync/reposync.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/reposync/reposync.db"  # optional, this is the default
//!
//! [github]
//! user = "octocat"
//! key = "ghp_..."  # or use REPOSYNC_GITHUB__KEY
//!
//! [sync]
//! batch_cap = 30
//! rate_padding = 10
//! interval_minutes = 30
//! timeout_secs = 10
//! # requests_per_second = 5
//!
//! [source]
//! web_host = "github.com"
//! api_host = "api.github.com/repos"
//! rate_limit_url = "https://api.github.com/rate_limit"
//! raw_branch = "master"
//!
//! [notify]
//! notify_failures = false
//! # webhook_url = "https://hooks.example.com/reposync"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use reposync::client::{DEFAULT_USER_AGENT, ClientOptions};
use reposync::sync::{DEFAULT_BATCH_CAP, DEFAULT_RATE_PADDING};
use reposync::{DataSource, StaticCredentials, SyncOptions};
use serde::Deserialize;

const ENV_PREFIX: &str = "REPOSYNC";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub sync: SyncConfig,
    /// Hosts and endpoints of the repository service.
    pub source: DataSource,
    pub notify: NotifyConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// API credentials. Requests go out anonymously unless both are set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub user: Option<String>,
    /// Personal access token used as the Basic-Auth password.
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum records synced per pass.
    pub batch_cap: usize,
    /// Requests kept in reserve below the reported remaining budget.
    pub rate_padding: u64,
    /// Minutes between passes in `watch` mode.
    pub interval_minutes: u64,
    /// Client-side request pacing. Unset disables pacing.
    pub requests_per_second: Option<u32>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_cap: DEFAULT_BATCH_CAP,
            rate_padding: DEFAULT_RATE_PADDING,
            interval_minutes: 30,
            requests_per_second: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Post failed records to `webhook_url`.
    pub notify_failures: bool,
    pub webhook_url: Option<String>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/reposync/config.toml)
    /// 3. Local config file (./reposync.toml)
    /// 4. Environment variables with REPOSYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("reposync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./reposync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// `REPOSYNC_DATABASE__URL` -> `database.url`
    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("reposync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn credentials(&self) -> StaticCredentials {
        StaticCredentials::new(self.github.user.clone(), self.github.key.clone())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.sync.timeout_secs.max(1)),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            requests_per_second: self.sync.requests_per_second,
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            batch_cap: self.sync.batch_cap,
            rate_padding: self.sync.rate_padding,
            ..SyncOptions::default()
        }
    }

    /// Watch interval, at least one minute.
    pub fn interval(&self, override_minutes: Option<u64>) -> Duration {
        let minutes = override_minutes.unwrap_or(self.sync.interval_minutes).max(1);
        Duration::from_secs(minutes * 60)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "reposync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/reposync` or `~/.local/state/reposync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "reposync").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_toml(toml_content: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sync.batch_cap, 30);
        assert_eq!(config.sync.rate_padding, 10);
        assert_eq!(config.sync.interval_minutes, 30);
        assert_eq!(config.sync.timeout_secs, 10);
        assert!(config.sync.requests_per_second.is_none());
        assert!(config.database.url.is_none());
        assert!(config.github.user.is_none());
        assert!(config.github.key.is_none());
        assert!(!config.notify.notify_failures);
        assert_eq!(config.source, DataSource::default());
    }

    #[test]
    fn test_full_config_parsing() {
        let config = from_toml(
            r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            user = "octocat"
            key = "ghp_test123"

            [sync]
            batch_cap = 5
            rate_padding = 50
            interval_minutes = 15
            requests_per_second = 2

            [source]
            raw_branch = "main"

            [notify]
            notify_failures = true
            webhook_url = "https://hooks.example.com/x"
        "#,
        );

        assert_eq!(config.database.url.as_deref(), Some("sqlite:///tmp/test.db"));
        assert_eq!(config.github.user.as_deref(), Some("octocat"));
        assert_eq!(config.sync_options().batch_cap, 5);
        assert_eq!(config.sync_options().rate_padding, 50);
        assert_eq!(config.client_options().requests_per_second, Some(2));
        assert_eq!(config.interval(None), Duration::from_secs(15 * 60));
        assert_eq!(config.source.raw_branch, "main");
        assert_eq!(config.source.web_host, "github.com");
        assert!(config.notify.notify_failures);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = from_toml("[sync]\nbatch_cap = 10\n");
        assert_eq!(config.sync.batch_cap, 10);
        assert_eq!(config.sync.rate_padding, 10);
        assert_eq!(config.sync.interval_minutes, 30);
    }

    #[test]
    fn test_environment_uses_double_underscore_sections() {
        let env: HashMap<String, String> = [
            ("REPOSYNC_GITHUB__KEY", "from-env"),
            ("REPOSYNC_SYNC__BATCH_CAP", "7"),
            ("REPOSYNC_DATABASE__URL", "postgres://localhost/reposync"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config: Config = ConfigBuilder::builder()
            .add_source(config::File::from_str("[github]\nkey = \"from-file\"\n", FileFormat::Toml))
            .add_source(Config::environment().source(Some(env)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.github.key.as_deref(), Some("from-env"));
        assert_eq!(config.sync.batch_cap, 7);
        assert_eq!(
            config.database_url().as_deref(),
            Some("postgres://localhost/reposync")
        );
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let config = Config::default();
        if let Some(url) = config.database_url() {
            assert!(url.starts_with("sqlite://"));
            assert!(url.ends_with("reposync.db?mode=rwc"));
        }
    }

    #[test]
    fn test_interval_has_one_minute_floor() {
        let config = Config::default();
        assert_eq!(config.interval(Some(0)), Duration::from_secs(60));
        assert_eq!(config.interval(Some(2)), Duration::from_secs(120));
    }

    #[test]
    fn test_credentials_require_user_and_key() {
        use reposync::CredentialStore;

        let mut config = Config::default();
        assert!(config.credentials().credentials().is_none());

        config.github.user = Some("octocat".into());
        config.github.key = Some("k".into());
        let creds = config.credentials().credentials().unwrap();
        assert!(creds.basic_auth_header().is_some());
    }
}
