//! Transport settings.

use ipguard_core::config::{ConfigError, ConfigStore, Settings};
use std::sync::Arc;

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Shared store for the mutable config document.
    pub store: Arc<ConfigStore>,
    /// Telegram Bot API token, validated at startup.
    pub bot_token: String,
}

impl BotSettings {
    /// Build the settings bundle, loading the config document once to
    /// validate the bot token.
    ///
    /// # Errors
    ///
    /// Returns `MissingBotToken` (or an I/O or parse error) if the
    /// config document is unusable; fatal at startup.
    pub async fn new(settings: Settings) -> Result<Self, ConfigError> {
        let store = Arc::new(ConfigStore::new(settings.config_path));
        let cfg = store.load().await?;
        Ok(Self {
            store,
            bot_token: cfg.bot_token,
        })
    }
}
