//! Configuration management.
//!
//! Two layers: process-level [`Settings`] loaded from the environment,
//! and the mutable bot/panel document [`BotConfig`] persisted as JSON
//! (`config.json`) through [`ConfigStore`]. The document keeps the
//! historical SCREAMING_SNAKE_CASE key names on disk so existing config
//! files keep working.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

/// Default enforcement interval between cycles, in seconds.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 240;
/// Default window during which a user counts as active, in seconds.
pub const DEFAULT_TIME_TO_ACTIVE_SECS: u64 = 600;

/// Errors that can occur while reading or writing the config document.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// `BOT_TOKEN` is absent or empty in the config document.
    #[error("BOT_TOKEN is missing in the config file")]
    MissingBotToken,
}

/// Process-level settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Path to the mutable JSON config document.
    #[serde(default = "default_config_path")]
    pub config_path: String,
}

fn default_config_path() -> String {
    "config.json".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, config::ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::default().ignore_empty(true))
            .build()?
            .try_deserialize()
    }
}

/// The mutable bot/panel configuration document.
///
/// Serialized with the historical upper-case key names, so the on-disk
/// file looks like `{"BOT_TOKEN": "...", "GENERAL_LIMIT": 3, ...}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Telegram Bot API token. Required at startup.
    #[serde(rename = "BOT_TOKEN", default)]
    pub bot_token: String,
    /// Chat IDs with admin access to the bot.
    #[serde(rename = "ADMINS", default)]
    pub admins: Vec<i64>,
    /// Panel address, host:port without a scheme.
    #[serde(rename = "PANEL_DOMAIN", default)]
    pub panel_domain: Option<String>,
    /// Panel admin username.
    #[serde(rename = "PANEL_USERNAME", default)]
    pub panel_username: Option<String>,
    /// Panel admin password.
    #[serde(rename = "PANEL_PASSWORD", default)]
    pub panel_password: Option<String>,
    /// Users exempt from any IP limit.
    #[serde(rename = "EXCEPT_USERS", default)]
    pub except_users: Vec<String>,
    /// Per-user IP-count limit overrides.
    #[serde(rename = "SPECIAL_LIMIT", default)]
    pub special_limit: HashMap<String, u64>,
    /// Default IP-count limit for users without an override.
    ///
    /// `None` means no default is configured: users without a special
    /// limit are skipped by the enforcer.
    #[serde(rename = "GENERAL_LIMIT", default)]
    pub general_limit: Option<u64>,
    /// Seconds between enforcement cycles.
    #[serde(rename = "CHECK_INTERVAL", default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Seconds a session stays in the active window.
    #[serde(rename = "TIME_TO_ACTIVE_USERS", default = "default_time_to_active")]
    pub time_to_active_secs: u64,
    /// Optional country filter for observed IPs.
    #[serde(rename = "COUNTRY_CODE", default)]
    pub country_code: Option<String>,
}

const fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

const fn default_time_to_active() -> u64 {
    DEFAULT_TIME_TO_ACTIVE_SECS
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admins: Vec::new(),
            panel_domain: None,
            panel_username: None,
            panel_password: None,
            except_users: Vec::new(),
            special_limit: HashMap::new(),
            general_limit: None,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            time_to_active_secs: DEFAULT_TIME_TO_ACTIVE_SECS,
            country_code: None,
        }
    }
}

/// Async store for the JSON config document.
///
/// All mutators are read-modify-write on the file, serialized behind an
/// internal lock so concurrent bot commands cannot clobber each other.
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// Create a store for the document at `path`. The file is not
    /// touched until the first read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the underlying config file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config document, requiring a non-empty `BOT_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `MissingBotToken` if the token is absent or empty, `Io`
    /// if the file cannot be read, `Json` if it cannot be parsed.
    pub async fn load(&self) -> Result<BotConfig, ConfigError> {
        let cfg = self.read_or_default().await?;
        if cfg.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingBotToken);
        }
        Ok(cfg)
    }

    /// Admin chat IDs, tolerating a missing document (used before the
    /// first admin has been bootstrapped).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn admins(&self) -> Result<Vec<i64>, ConfigError> {
        Ok(self.read_or_default().await?.admins)
    }

    /// Persist `cfg`, replacing the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, cfg: &BotConfig) -> Result<(), ConfigError> {
        let _guard = self.write_lock.lock().await;
        self.write(cfg).await
    }

    /// Register a new admin. Returns `false` if the ID was already
    /// present.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn add_admin(&self, chat_id: i64) -> Result<bool, ConfigError> {
        self.update(|cfg| {
            if cfg.admins.contains(&chat_id) {
                false
            } else {
                cfg.admins.push(chat_id);
                true
            }
        })
        .await
    }

    /// Remove an admin. Returns `false` if the ID was not present.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn remove_admin(&self, chat_id: i64) -> Result<bool, ConfigError> {
        self.update(|cfg| {
            let before = cfg.admins.len();
            cfg.admins.retain(|id| *id != chat_id);
            cfg.admins.len() != before
        })
        .await
    }

    /// Store panel connection data.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn set_panel_credentials(
        &self,
        domain: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ConfigError> {
        self.update(|cfg| {
            cfg.panel_domain = Some(domain.to_string());
            cfg.panel_username = Some(username.to_string());
            cfg.panel_password = Some(password.to_string());
        })
        .await
    }

    /// Set a per-user limit override. Returns the previous value when
    /// the user already had one.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn set_special_limit(
        &self,
        user: &str,
        limit: u64,
    ) -> Result<Option<u64>, ConfigError> {
        self.update(|cfg| cfg.special_limit.insert(user.to_string(), limit))
            .await
    }

    /// Add a user to the exempt list. Returns `false` if already listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn add_except_user(&self, user: &str) -> Result<bool, ConfigError> {
        self.update(|cfg| {
            if cfg.except_users.iter().any(|u| u == user) {
                false
            } else {
                cfg.except_users.push(user.to_string());
                true
            }
        })
        .await
    }

    /// Remove a user from the exempt list. Returns `false` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn remove_except_user(&self, user: &str) -> Result<bool, ConfigError> {
        self.update(|cfg| {
            let before = cfg.except_users.len();
            cfg.except_users.retain(|u| u != user);
            cfg.except_users.len() != before
        })
        .await
    }

    /// Set the general limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn set_general_limit(&self, limit: u64) -> Result<(), ConfigError> {
        self.update(|cfg| cfg.general_limit = Some(limit)).await
    }

    /// Set the enforcement interval in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn set_check_interval(&self, secs: u64) -> Result<(), ConfigError> {
        self.update(|cfg| cfg.check_interval_secs = secs).await
    }

    /// Set the active-user window in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn set_time_to_active(&self, secs: u64) -> Result<(), ConfigError> {
        self.update(|cfg| cfg.time_to_active_secs = secs).await
    }

    /// Set or clear the country filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn set_country_code(&self, code: Option<&str>) -> Result<(), ConfigError> {
        self.update(|cfg| cfg.country_code = code.map(ToString::to_string))
            .await
    }

    async fn read_or_default(&self) -> Result<BotConfig, ConfigError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BotConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, cfg: &BotConfig) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(cfg)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    async fn update<R>(
        &self,
        mutate: impl FnOnce(&mut BotConfig) -> R,
    ) -> Result<R, ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut cfg = self.read_or_default().await?;
        let out = mutate(&mut cfg);
        self.write(&cfg).await?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_store() -> ConfigStore {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "ipguard-config-test-{}-{n}.json",
            std::process::id()
        ));
        ConfigStore::new(path)
    }

    #[test]
    fn wire_keys_round_trip() {
        let raw = r#"{
            "BOT_TOKEN": "123:abc",
            "ADMINS": [11, 22],
            "EXCEPT_USERS": ["vip"],
            "SPECIAL_LIMIT": {"alice": 5},
            "GENERAL_LIMIT": 3,
            "CHECK_INTERVAL": 120
        }"#;
        let cfg: BotConfig = serde_json::from_str(raw).expect("parse");
        assert_eq!(cfg.bot_token, "123:abc");
        assert_eq!(cfg.admins, vec![11, 22]);
        assert_eq!(cfg.special_limit.get("alice"), Some(&5));
        assert_eq!(cfg.general_limit, Some(3));
        assert_eq!(cfg.check_interval_secs, 120);
        // Unset keys fall back to defaults.
        assert_eq!(cfg.time_to_active_secs, DEFAULT_TIME_TO_ACTIVE_SECS);

        let serialized = serde_json::to_string(&cfg).expect("serialize");
        assert!(serialized.contains("\"BOT_TOKEN\""));
        assert!(serialized.contains("\"GENERAL_LIMIT\""));
        let back: BotConfig = serde_json::from_str(&serialized).expect("reparse");
        assert_eq!(back, cfg);
    }

    #[tokio::test]
    async fn load_requires_bot_token() {
        let store = temp_store();
        store.save(&BotConfig::default()).await.expect("save");
        let err = store.load().await.expect_err("must fail without token");
        assert!(matches!(err, ConfigError::MissingBotToken));
    }

    #[tokio::test]
    async fn mutators_persist() {
        let store = temp_store();
        store
            .save(&BotConfig {
                bot_token: "123:abc".to_string(),
                ..BotConfig::default()
            })
            .await
            .expect("save");

        assert!(store.add_admin(42).await.expect("add"));
        assert!(!store.add_admin(42).await.expect("add twice"));
        assert_eq!(
            store.set_special_limit("alice", 5).await.expect("limit"),
            None
        );
        assert_eq!(
            store.set_special_limit("alice", 7).await.expect("limit"),
            Some(5)
        );
        assert!(store.add_except_user("vip").await.expect("except"));
        store.set_general_limit(3).await.expect("general");

        let cfg = store.load().await.expect("load");
        assert_eq!(cfg.admins, vec![42]);
        assert_eq!(cfg.special_limit.get("alice"), Some(&7));
        assert_eq!(cfg.except_users, vec!["vip".to_string()]);
        assert_eq!(cfg.general_limit, Some(3));

        assert!(store.remove_except_user("vip").await.expect("remove"));
        assert!(!store.remove_except_user("vip").await.expect("remove twice"));
        assert!(store.remove_admin(42).await.expect("remove admin"));
    }
}
