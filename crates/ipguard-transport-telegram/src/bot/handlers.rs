//! Command and dialogue handlers.
//!
//! The admin-facing conversation flow: panel configuration, limit
//! management, admin management, and exemption lists. Every handler is
//! gated on the admin list; the very first chat to talk to the bot is
//! bootstrapped as the initial admin.

use crate::bot::messaging::{split_message, TELEGRAM_MESSAGE_LIMIT};
use crate::bot::state::{PanelDraft, State};
use crate::config::BotSettings;
use anyhow::{anyhow, Result};
use ipguard_core::panel;
use std::sync::Arc;
use teloxide::{
    dispatching::dialogue::InMemStorage,
    prelude::*,
    types::{InputFile, ParseMode},
    utils::command::BotCommands,
};
use tracing::info;

/// Dialogue handle used by all stateful handlers.
pub type BotDialogue = Dialogue<State, InMemStorage<State>>;

/// Bot cannot hold more admins than this.
pub const MAX_ADMINS: usize = 5;

/// Supported commands for the bot.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message and command list.
    #[command(description = "Start the bot.")]
    Start,
    /// Configure panel address and credentials.
    #[command(description = "Configure the panel connection.")]
    CreateConfig,
    /// Set a per-user IP limit.
    #[command(description = "Set a special limit for a user.")]
    SetSpecialLimit,
    /// Show the special limit list.
    #[command(description = "Show the special limit list.")]
    ShowSpecialLimit,
    /// Add an admin chat ID.
    #[command(description = "Grant bot access to another chat ID.")]
    AddAdmin,
    /// List bot admins.
    #[command(description = "Show the list of bot admins.")]
    AdminsList,
    /// Remove an admin chat ID.
    #[command(description = "Remove an admin from the bot.")]
    RemoveAdmin,
    /// Set the country filter.
    #[command(description = "Set the country code filter.")]
    CountryCode,
    /// Add a user exempt from limits.
    #[command(description = "Add a user to the exempt list.")]
    SetExceptUser,
    /// Remove an exempt user.
    #[command(description = "Remove a user from the exempt list.")]
    RemoveExceptUser,
    /// Show exempt users.
    #[command(description = "Show the exempt user list.")]
    ShowExceptUsers,
    /// Set the general IP limit.
    #[command(description = "Set the general limit number.")]
    SetGeneralLimitNumber,
    /// Set the enforcement interval.
    #[command(description = "Set the check interval.")]
    SetCheckInterval,
    /// Set the active-user window.
    #[command(description = "Set the active-user time window.")]
    SetTimeToActiveUsers,
    /// Send the config file.
    #[command(description = "Send the config.json backup.")]
    Backup,
}

const START_MESSAGE: &str = "\
✨<b>Список Команд:</b>\n\
<b>/start</b> — <code>запустите бота</code>\n\
<b>/create_config</b> — <code>настройка панели (адрес, имя пользователя, пароль)</code>\n\
<b>/set_special_limit</b> — <code>установите ограничение ip-адресов для пользователя</code>\n\
<b>/show_special_limit</b> — <code>показать список специальных лимитов</code>\n\
<b>/add_admin</b> — <code>добавить нового администратора бота</code>\n\
<b>/admins_list</b> — <code>показать список администраторов</code>\n\
<b>/remove_admin</b> — <code>удалить администратора</code>\n\
<b>/country_code</b> — <code>учитывать только IP-адреса этой страны</code>\n\
<b>/set_except_user</b> — <code>добавить пользователя в список исключений</code>\n\
<b>/remove_except_user</b> — <code>удалить пользователя из списка исключений</code>\n\
<b>/show_except_users</b> — <code>показать список исключений</code>\n\
<b>/set_general_limit_number</b> — <code>установить общий лимит</code>\n\
<b>/set_check_interval</b> — <code>установить интервал проверки</code>\n\
<b>/set_time_to_active_users</b> — <code>установить время активности пользователей</code>\n\
<b>/backup</b> — <code>отправить файл config.json</code>";

const NO_PERMISSION: &str = "К сожалению, у вас нет разрешения на выполнение этой команды.";

const ASK_DOMAIN: &str = "Так что теперь дайте мне <b>адрес вашей панели!</b>\n\
Отправьте домен или IP-адрес с указанием порта,\n\
например: <code>sub.domain.com:8333</code> или <code>95.12.153.87:443</code>\n\
<b>без</b> <code>https://</code> или <code>http://</code>";

/// Check admin access, bootstrapping the first admin when none exist.
///
/// # Errors
///
/// Returns an error if the config store or Telegram API fails.
pub async fn ensure_admin(bot: &Bot, msg: &Message, settings: &Arc<BotSettings>) -> Result<bool> {
    let store = &settings.store;
    let mut admins = store.admins().await?;
    if admins.is_empty() {
        info!("Bootstrapping first admin: chat {}", msg.chat.id.0);
        store.add_admin(msg.chat.id.0).await?;
        admins = store.admins().await?;
    }
    if admins.contains(&msg.chat.id.0) {
        return Ok(true);
    }
    bot.send_message(msg.chat.id, NO_PERMISSION).await?;
    Ok(false)
}

fn text_of(msg: &Message) -> Option<String> {
    msg.text().map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

async fn exit_dialogue(dialogue: &BotDialogue) -> Result<()> {
    dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))
}

async fn enter_state(dialogue: &BotDialogue, state: State) -> Result<()> {
    dialogue.update(state).await.map_err(|e| anyhow!(e.to_string()))
}

async fn reply_wrong_input(bot: &Bot, msg: &Message, input: &str, command: &str) -> Result<()> {
    bot.send_message(
        msg.chat.id,
        format!(
            "Неправильный ввод: <code>{}</code>\nпопробуйте еще раз <b>{command}</b>",
            html_escape::encode_text(input)
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    Ok(())
}

/// `/start`: welcome message with the command list.
pub async fn start(bot: &Bot, msg: &Message, settings: &Arc<BotSettings>) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_message(msg.chat.id, START_MESSAGE)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// `/create_config`: start the panel configuration dialogue.
pub async fn create_config(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    let cfg = settings.store.load().await?;
    if let (Some(domain), Some(username), Some(password)) =
        (&cfg.panel_domain, &cfg.panel_username, &cfg.panel_password)
    {
        bot.send_message(msg.chat.id, "Вы уже устанавливали конфигурацию раньше!")
            .await?;
        bot.send_message(
            msg.chat.id,
            format!(
                "<b>Текущая конфигурация:</b>\n\
                 Domain: <code>{}</code>\n\
                 Username: <code>{}</code>\n\
                 Password: <code>{}</code>\n\
                 Вы хотите изменить эти настройки? <code>(yes/no)</code>",
                html_escape::encode_text(domain),
                html_escape::encode_text(username),
                html_escape::encode_text(password)
            ),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return enter_state(dialogue, State::AwaitingReconfigureConfirm).await;
    }
    bot.send_message(msg.chat.id, ASK_DOMAIN)
        .parse_mode(ParseMode::Html)
        .await?;
    enter_state(dialogue, State::AwaitingPanelDomain).await
}

/// Yes/no answer before overwriting the existing panel config.
pub async fn on_reconfigure_confirm(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
) -> Result<()> {
    let Some(answer) = text_of(msg) else {
        return exit_dialogue(dialogue).await;
    };
    if matches!(answer.to_lowercase().as_str(), "yes" | "y") {
        bot.send_message(msg.chat.id, ASK_DOMAIN)
            .parse_mode(ParseMode::Html)
            .await?;
        return enter_state(dialogue, State::AwaitingPanelDomain).await;
    }
    bot.send_message(
        msg.chat.id,
        format!(
            "<code>{}</code> получено.\nИспользуйте <b>/create_config</b> когда передумаете.",
            html_escape::encode_text(&answer)
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    exit_dialogue(dialogue).await
}

/// Panel address step of the configuration dialogue.
pub async fn on_panel_domain(bot: &Bot, msg: &Message, dialogue: &BotDialogue) -> Result<()> {
    let Some(domain) = text_of(msg) else {
        return Ok(());
    };
    bot.send_message(
        msg.chat.id,
        "Отправьте свое имя пользователя: (Например: 'admin')",
    )
    .await?;
    enter_state(dialogue, State::AwaitingPanelUsername(domain)).await
}

/// Panel username step of the configuration dialogue.
pub async fn on_panel_username(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    domain: String,
) -> Result<()> {
    let Some(username) = text_of(msg) else {
        return Ok(());
    };
    bot.send_message(msg.chat.id, "Отправьте свой пароль: (Например: 'admin1234')")
        .await?;
    enter_state(dialogue, State::AwaitingPanelPassword(PanelDraft { domain, username })).await
}

/// Panel password step: verifies against the panel, then saves.
pub async fn on_panel_password(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
    draft: PanelDraft,
) -> Result<()> {
    let Some(password) = text_of(msg) else {
        return Ok(());
    };
    bot.send_message(
        msg.chat.id,
        "Пожалуйста, подождите: проверяю адрес панели, имя пользователя и пароль...",
    )
    .await?;
    match panel::verify_credentials(&draft.domain, &draft.username, &password).await {
        Ok(()) => {
            settings
                .store
                .set_panel_credentials(&draft.domain, &draft.username, &password)
                .await?;
            bot.send_message(msg.chat.id, "Конфигурация успешно сохранена 🎊")
                .await?;
        }
        Err(e) => {
            info!("Panel credential check failed: {e}");
            bot.send_message(
                msg.chat.id,
                format!(
                    "<b>Возникла проблема с вашими данными, проверьте их еще раз!</b> \
                     (также убедитесь, что панель запущена)\n\
                     Panel Address: <code>{}</code>\n\
                     Username: <code>{}</code>\n\
                     --------\n\
                     Попробуйте снова /create_config",
                    html_escape::encode_text(&draft.domain),
                    html_escape::encode_text(&draft.username)
                ),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
    }
    exit_dialogue(dialogue).await
}

/// `/set_special_limit`: ask for the username.
pub async fn set_special_limit(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_message(
        msg.chat.id,
        "Пожалуйста, пришлите имя пользователя. Например: <code>Test_User</code>",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    enter_state(dialogue, State::AwaitingSpecialLimitUser).await
}

/// Username step of the special-limit dialogue.
pub async fn on_special_limit_user(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
) -> Result<()> {
    let Some(user) = text_of(msg) else {
        return Ok(());
    };
    bot.send_message(
        msg.chat.id,
        "Пожалуйста, пришлите номер ограничения. Например: <code>4</code> или <code>2</code>",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    enter_state(dialogue, State::AwaitingSpecialLimitValue(user)).await
}

/// Limit-value step of the special-limit dialogue.
pub async fn on_special_limit_value(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
    user: String,
) -> Result<()> {
    let Some(raw) = text_of(msg) else {
        return Ok(());
    };
    let Ok(limit) = raw.parse::<u64>() else {
        reply_wrong_input(bot, msg, &raw, "/set_special_limit").await?;
        return exit_dialogue(dialogue).await;
    };
    let previous = settings.store.set_special_limit(&user, limit).await?;
    if previous.is_some() {
        bot.send_message(
            msg.chat.id,
            format!(
                "<code>{}</code> уже имел специальный лимит. Заменяю его новым значением.",
                html_escape::encode_text(&user)
            ),
        )
        .parse_mode(ParseMode::Html)
        .await?;
    }
    bot.send_message(
        msg.chat.id,
        format!(
            "Special limit for <code>{}</code> set to <code>{limit}</code> successfully!",
            html_escape::encode_text(&user)
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    exit_dialogue(dialogue).await
}

/// `/show_special_limit`: list the configured overrides.
pub async fn show_special_limit(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    let cfg = settings.store.load().await?;
    if cfg.special_limit.is_empty() {
        bot.send_message(msg.chat.id, "Никаких специальных ограничений не найдено!")
            .await?;
        return Ok(());
    }
    let mut entries: Vec<_> = cfg.special_limit.iter().collect();
    entries.sort();
    let listing = entries
        .iter()
        .map(|(user, limit)| format!("{} : {limit}", html_escape::encode_text(user)))
        .collect::<Vec<_>>()
        .join("\n");
    for part in split_message(&listing, TELEGRAM_MESSAGE_LIMIT) {
        bot.send_message(msg.chat.id, part)
            .parse_mode(ParseMode::Html)
            .await?;
    }
    Ok(())
}

/// `/add_admin`: ask for the new admin chat ID.
pub async fn add_admin(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    if settings.store.admins().await?.len() >= MAX_ADMINS {
        bot.send_message(
            msg.chat.id,
            "Установлено максимальное число администраторов. Удалите одного из них, \
             чтобы добавить нового: проверьте список через /admins_list и удалите \
             через /remove_admin.",
        )
        .await?;
        return Ok(());
    }
    bot.send_message(msg.chat.id, "Send chat id: ").await?;
    enter_state(dialogue, State::AwaitingAdminId).await
}

/// Chat-ID step of the add-admin dialogue.
pub async fn on_admin_id(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    let Some(raw) = text_of(msg) else {
        return Ok(());
    };
    let Ok(chat_id) = raw.parse::<i64>() else {
        reply_wrong_input(bot, msg, &raw, "/add_admin").await?;
        return exit_dialogue(dialogue).await;
    };
    let reply = if settings.store.add_admin(chat_id).await? {
        format!("Admin <code>{chat_id}</code> добавлен успешно!")
    } else {
        format!("Admin <code>{chat_id}</code> уже существует!")
    };
    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    exit_dialogue(dialogue).await
}

/// `/admins_list`: list the current admins.
pub async fn admins_list(bot: &Bot, msg: &Message, settings: &Arc<BotSettings>) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    let admins = settings.store.admins().await?;
    if admins.is_empty() {
        bot.send_message(msg.chat.id, "Администраторы не найдены!")
            .await?;
        return Ok(());
    }
    let listing = admins
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n- ");
    bot.send_message(msg.chat.id, format!("Admins: \n- {listing}"))
        .await?;
    Ok(())
}

/// `/remove_admin`: ask for the admin chat ID to remove.
pub async fn remove_admin(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    if settings.store.admins().await?.len() == 1 {
        bot.send_message(
            msg.chat.id,
            "Остался только <b>1</b> активный администратор. Если вы удалите этот \
             идентификатор чата, первый написавший боту станет новым администратором.",
        )
        .parse_mode(ParseMode::Html)
        .await?;
    }
    bot.send_message(msg.chat.id, "Отправьте идентификатор чата администратора для удаления: ")
        .await?;
    enter_state(dialogue, State::AwaitingAdminIdToRemove).await
}

/// Chat-ID step of the remove-admin dialogue.
pub async fn on_admin_id_to_remove(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    let Some(raw) = text_of(msg) else {
        return Ok(());
    };
    let Ok(chat_id) = raw.parse::<i64>() else {
        reply_wrong_input(bot, msg, &raw, "/remove_admin").await?;
        return exit_dialogue(dialogue).await;
    };
    let reply = if settings.store.remove_admin(chat_id).await? {
        format!("Admin <code>{chat_id}</code> успешно удален!")
    } else {
        format!("Admin <code>{chat_id}</code> не существует!")
    };
    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    exit_dialogue(dialogue).await
}

/// `/country_code`: show the selection list.
pub async fn country_code(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_message(
        msg.chat.id,
        "1. <code>IR</code> (Iran)\n\
         2. <code>RU</code> (Russia)\n\
         3. <code>CN</code> (China)\n\
         4. <code>None</code> — не проверять местоположение\n\
         <b>просто отправьте номер, например: <code>2</code> или <code>1</code></b>",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    enter_state(dialogue, State::AwaitingCountryCode).await
}

/// Country-code step: maps the selection number to a code.
pub async fn on_country_code(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    let Some(raw) = text_of(msg) else {
        return Ok(());
    };
    let selected = match raw.as_str() {
        "1" => Some("IR"),
        "2" => Some("RU"),
        "3" => Some("CN"),
        _ => None,
    };
    settings.store.set_country_code(selected).await?;
    bot.send_message(
        msg.chat.id,
        format!(
            "Код страны <code>{}</code> успешно установлен!",
            selected.unwrap_or("None")
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    exit_dialogue(dialogue).await
}

/// `/set_except_user`: ask for the username to exempt.
pub async fn set_except_user(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_message(
        msg.chat.id,
        "Отправьте имя пользователя для списка исключений \
         (<code>пользователи из этого списка не имеют ограничений</code>):",
    )
    .parse_mode(ParseMode::Html)
    .await?;
    enter_state(dialogue, State::AwaitingExceptUser).await
}

/// Username step of the exempt-user dialogue.
pub async fn on_except_user(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    let Some(user) = text_of(msg) else {
        return Ok(());
    };
    settings.store.add_except_user(&user).await?;
    bot.send_message(
        msg.chat.id,
        format!(
            "Пользователь <code>{}</code> добавлен в исключения успешно!",
            html_escape::encode_text(&user)
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;
    exit_dialogue(dialogue).await
}

/// `/remove_except_user`: ask for the exempt username to remove.
pub async fn remove_except_user(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_message(msg.chat.id, "Отправьте пользователя из исключений для удаления:")
        .await?;
    enter_state(dialogue, State::AwaitingExceptUserToRemove).await
}

/// Username step of the remove-exempt dialogue.
pub async fn on_except_user_to_remove(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    let Some(user) = text_of(msg) else {
        return Ok(());
    };
    let escaped = html_escape::encode_text(&user).to_string();
    let reply = if settings.store.remove_except_user(&user).await? {
        format!("Пользователь <code>{escaped}</code> успешно удален из исключений!")
    } else {
        format!("Пользователь <code>{escaped}</code> не найден в исключениях!")
    };
    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    exit_dialogue(dialogue).await
}

/// `/show_except_users`: list the exempt users.
pub async fn show_except_users(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    let cfg = settings.store.load().await?;
    if cfg.except_users.is_empty() {
        bot.send_message(msg.chat.id, "Список исключений пуст!").await?;
        return Ok(());
    }
    let listing = cfg
        .except_users
        .iter()
        .map(|user| format!("- {}", html_escape::encode_text(user)))
        .collect::<Vec<_>>()
        .join("\n");
    for part in split_message(&listing, TELEGRAM_MESSAGE_LIMIT) {
        bot.send_message(msg.chat.id, part)
            .parse_mode(ParseMode::Html)
            .await?;
    }
    Ok(())
}

/// `/set_general_limit_number`: ask for the general limit.
pub async fn set_general_limit_number(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_message(msg.chat.id, "Пожалуйста, пришлите общий лимит:")
        .await?;
    enter_state(dialogue, State::AwaitingGeneralLimit).await
}

/// Value step of the general-limit dialogue.
pub async fn on_general_limit(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    let Some(raw) = text_of(msg) else {
        return Ok(());
    };
    let Ok(limit) = raw.parse::<u64>() else {
        reply_wrong_input(bot, msg, &raw, "/set_general_limit_number").await?;
        return exit_dialogue(dialogue).await;
    };
    settings.store.set_general_limit(limit).await?;
    bot.send_message(msg.chat.id, format!("General LIMIT_NUMBER set to {limit}"))
        .await?;
    exit_dialogue(dialogue).await
}

/// `/set_check_interval`: ask for the interval in seconds.
pub async fn set_check_interval(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_message(
        msg.chat.id,
        "Пожалуйста, пришлите интервал проверки в секундах \
         (рекомендуется 240 секунд).",
    )
    .await?;
    enter_state(dialogue, State::AwaitingCheckInterval).await
}

/// Value step of the check-interval dialogue.
pub async fn on_check_interval(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    let Some(raw) = text_of(msg) else {
        return Ok(());
    };
    let Ok(secs) = raw.parse::<u64>() else {
        reply_wrong_input(bot, msg, &raw, "/set_check_interval").await?;
        return exit_dialogue(dialogue).await;
    };
    settings.store.set_check_interval(secs).await?;
    bot.send_message(msg.chat.id, format!("CHECK_INTERVAL установлен на {secs}"))
        .await?;
    exit_dialogue(dialogue).await
}

/// `/set_time_to_active_users`: ask for the window in seconds.
pub async fn set_time_to_active_users(
    bot: &Bot,
    msg: &Message,
    settings: &Arc<BotSettings>,
    dialogue: &BotDialogue,
) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_message(
        msg.chat.id,
        "Пожалуйста, пришлите время активности пользователей, например 600 (в секундах).",
    )
    .await?;
    enter_state(dialogue, State::AwaitingTimeToActive).await
}

/// Value step of the active-window dialogue.
pub async fn on_time_to_active(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    settings: &Arc<BotSettings>,
) -> Result<()> {
    let Some(raw) = text_of(msg) else {
        return Ok(());
    };
    let Ok(secs) = raw.parse::<u64>() else {
        reply_wrong_input(bot, msg, &raw, "/set_time_to_active_users").await?;
        return exit_dialogue(dialogue).await;
    };
    settings.store.set_time_to_active(secs).await?;
    bot.send_message(
        msg.chat.id,
        format!("TIME_TO_ACTIVE_USERS установлен на {secs}"),
    )
    .await?;
    exit_dialogue(dialogue).await
}

/// `/backup`: send the config file to the admin.
pub async fn backup(bot: &Bot, msg: &Message, settings: &Arc<BotSettings>) -> Result<()> {
    if !ensure_admin(bot, msg, settings).await? {
        return Ok(());
    }
    bot.send_document(msg.chat.id, InputFile::file(settings.store.path().to_path_buf()))
        .caption("Вот файл резервной копии!")
        .await?;
    Ok(())
}
