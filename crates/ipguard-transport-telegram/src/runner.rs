//! Bot runtime entry point.
//!
//! Builds the teloxide dispatcher for the admin command dialogues and
//! spawns the two background loops (session poller, enforcement cycle)
//! with a shared cancellation token.

use crate::bot::handlers::{self, BotDialogue, Command};
use crate::bot::state::{PanelDraft, State};
use crate::bot::TelegramNotifier;
use crate::config::BotSettings;
use ipguard_core::enforcer::EnforcementContext;
use ipguard_core::panel::{Disabler, PanelClient};
use ipguard_core::scheduler;
use ipguard_core::snapshot::SnapshotStore;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run the Telegram transport runtime until shutdown.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let bot = Bot::new(settings.bot_token.clone());

    let snapshot = Arc::new(SnapshotStore::new());
    let panel = Arc::new(PanelClient::new(settings.store.clone()));
    let notifier = Arc::new(TelegramNotifier::new(bot.clone(), settings.store.clone()));
    let ctx = Arc::new(EnforcementContext::new(
        settings.store.clone(),
        snapshot.clone(),
        panel.clone() as Arc<dyn Disabler>,
        notifier,
    ));

    let shutdown = CancellationToken::new();
    let poller = tokio::spawn(scheduler::run_session_poller(
        panel,
        snapshot,
        shutdown.child_token(),
    ));
    let enforcement = tokio::spawn(scheduler::run_enforcement_loop(
        ctx,
        shutdown.child_token(),
    ));

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![settings, InMemStorage::<State>::new()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    shutdown.cancel();
    let _ = tokio::join!(poller, enforcement);
    info!("Background tasks stopped");
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<State>, State>()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dialogue_branches())
        .branch(dptree::endpoint(handle_fallback))
}

fn dialogue_branches() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            dptree::case![State::AwaitingReconfigureConfirm]
                .endpoint(handle_reconfigure_confirm),
        )
        .branch(dptree::case![State::AwaitingPanelDomain].endpoint(handle_panel_domain))
        .branch(dptree::case![State::AwaitingPanelUsername(domain)].endpoint(handle_panel_username))
        .branch(dptree::case![State::AwaitingPanelPassword(draft)].endpoint(handle_panel_password))
        .branch(
            dptree::case![State::AwaitingSpecialLimitUser].endpoint(handle_special_limit_user),
        )
        .branch(
            dptree::case![State::AwaitingSpecialLimitValue(user)]
                .endpoint(handle_special_limit_value),
        )
        .branch(dptree::case![State::AwaitingAdminId].endpoint(handle_admin_id))
        .branch(
            dptree::case![State::AwaitingAdminIdToRemove].endpoint(handle_admin_id_to_remove),
        )
        .branch(dptree::case![State::AwaitingExceptUser].endpoint(handle_except_user))
        .branch(
            dptree::case![State::AwaitingExceptUserToRemove]
                .endpoint(handle_except_user_to_remove),
        )
        .branch(dptree::case![State::AwaitingGeneralLimit].endpoint(handle_general_limit))
        .branch(dptree::case![State::AwaitingCheckInterval].endpoint(handle_check_interval))
        .branch(dptree::case![State::AwaitingTimeToActive].endpoint(handle_time_to_active))
        .branch(dptree::case![State::AwaitingCountryCode].endpoint(handle_country_code))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    let res = match cmd {
        Command::Start => handlers::start(&bot, &msg, &settings).await,
        Command::CreateConfig => handlers::create_config(&bot, &msg, &settings, &dialogue).await,
        Command::SetSpecialLimit => {
            handlers::set_special_limit(&bot, &msg, &settings, &dialogue).await
        }
        Command::ShowSpecialLimit => handlers::show_special_limit(&bot, &msg, &settings).await,
        Command::AddAdmin => handlers::add_admin(&bot, &msg, &settings, &dialogue).await,
        Command::AdminsList => handlers::admins_list(&bot, &msg, &settings).await,
        Command::RemoveAdmin => handlers::remove_admin(&bot, &msg, &settings, &dialogue).await,
        Command::CountryCode => handlers::country_code(&bot, &msg, &settings, &dialogue).await,
        Command::SetExceptUser => {
            handlers::set_except_user(&bot, &msg, &settings, &dialogue).await
        }
        Command::RemoveExceptUser => {
            handlers::remove_except_user(&bot, &msg, &settings, &dialogue).await
        }
        Command::ShowExceptUsers => handlers::show_except_users(&bot, &msg, &settings).await,
        Command::SetGeneralLimitNumber => {
            handlers::set_general_limit_number(&bot, &msg, &settings, &dialogue).await
        }
        Command::SetCheckInterval => {
            handlers::set_check_interval(&bot, &msg, &settings, &dialogue).await
        }
        Command::SetTimeToActiveUsers => {
            handlers::set_time_to_active_users(&bot, &msg, &settings, &dialogue).await
        }
        Command::Backup => handlers::backup(&bot, &msg, &settings).await,
    };
    if let Err(e) = res {
        error!("Command error: {e}");
    }
    respond(())
}

async fn handle_fallback(bot: Bot, msg: Message, settings: Arc<BotSettings>) -> ResponseResult<()> {
    if let Err(e) = handlers::start(&bot, &msg, &settings).await {
        error!("Fallback handler error: {e}");
    }
    respond(())
}

async fn handle_reconfigure_confirm(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_reconfigure_confirm(&bot, &msg, &dialogue).await {
        error!("Reconfigure confirm handler error: {e}");
    }
    respond(())
}

async fn handle_panel_domain(bot: Bot, msg: Message, dialogue: BotDialogue) -> ResponseResult<()> {
    if let Err(e) = handlers::on_panel_domain(&bot, &msg, &dialogue).await {
        error!("Panel domain handler error: {e}");
    }
    respond(())
}

async fn handle_panel_username(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    domain: String,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_panel_username(&bot, &msg, &dialogue, domain).await {
        error!("Panel username handler error: {e}");
    }
    respond(())
}

async fn handle_panel_password(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    draft: PanelDraft,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_panel_password(&bot, &msg, &dialogue, &settings, draft).await {
        error!("Panel password handler error: {e}");
    }
    respond(())
}

async fn handle_special_limit_user(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_special_limit_user(&bot, &msg, &dialogue).await {
        error!("Special limit user handler error: {e}");
    }
    respond(())
}

async fn handle_special_limit_value(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    user: String,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) =
        handlers::on_special_limit_value(&bot, &msg, &dialogue, &settings, user).await
    {
        error!("Special limit value handler error: {e}");
    }
    respond(())
}

async fn handle_admin_id(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_admin_id(&bot, &msg, &dialogue, &settings).await {
        error!("Add admin handler error: {e}");
    }
    respond(())
}

async fn handle_admin_id_to_remove(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_admin_id_to_remove(&bot, &msg, &dialogue, &settings).await {
        error!("Remove admin handler error: {e}");
    }
    respond(())
}

async fn handle_except_user(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_except_user(&bot, &msg, &dialogue, &settings).await {
        error!("Except user handler error: {e}");
    }
    respond(())
}

async fn handle_except_user_to_remove(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_except_user_to_remove(&bot, &msg, &dialogue, &settings).await {
        error!("Remove except user handler error: {e}");
    }
    respond(())
}

async fn handle_general_limit(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_general_limit(&bot, &msg, &dialogue, &settings).await {
        error!("General limit handler error: {e}");
    }
    respond(())
}

async fn handle_check_interval(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_check_interval(&bot, &msg, &dialogue, &settings).await {
        error!("Check interval handler error: {e}");
    }
    respond(())
}

async fn handle_time_to_active(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_time_to_active(&bot, &msg, &dialogue, &settings).await {
        error!("Time to active handler error: {e}");
    }
    respond(())
}

async fn handle_country_code(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    settings: Arc<BotSettings>,
) -> ResponseResult<()> {
    if let Err(e) = handlers::on_country_code(&bot, &msg, &dialogue, &settings).await {
        error!("Country code handler error: {e}");
    }
    respond(())
}
