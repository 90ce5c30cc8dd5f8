//! Admin report delivery.

use crate::bot::messaging::{split_message, TELEGRAM_MESSAGE_LIMIT};
use async_trait::async_trait;
use ipguard_core::config::ConfigStore;
use ipguard_core::enforcer::Notifier;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::error;

/// Delivers cycle reports and warnings to every configured admin.
///
/// The admin list is read fresh from the config document on every send,
/// so newly added admins start receiving reports immediately. A failed
/// delivery to one admin is logged and never blocks the others.
pub struct TelegramNotifier {
    bot: Bot,
    store: Arc<ConfigStore>,
}

impl TelegramNotifier {
    /// Create a notifier around the shared bot handle and config store.
    #[must_use]
    pub fn new(bot: Bot, store: Arc<ConfigStore>) -> Self {
        Self { bot, store }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) {
        let admins = match self.store.admins().await {
            Ok(admins) => admins,
            Err(e) => {
                error!("Cannot read admin list, report dropped: {e}");
                return;
            }
        };
        for admin in admins {
            for part in split_message(text, TELEGRAM_MESSAGE_LIMIT) {
                if let Err(e) = self
                    .bot
                    .send_message(ChatId(admin), part)
                    .parse_mode(ParseMode::Html)
                    .await
                {
                    error!("Failed to send report to admin {admin}: {e}");
                    break;
                }
            }
        }
    }
}
