//! The admin command surface must keep its historical snake_case names;
//! existing admins type these from muscle memory.

use ipguard_transport_telegram::bot::handlers::Command;
use teloxide::utils::command::BotCommands;

const BOT_NAME: &str = "ipguard_bot";

#[test]
fn all_admin_commands_parse() {
    let commands = [
        "/start",
        "/create_config",
        "/set_special_limit",
        "/show_special_limit",
        "/add_admin",
        "/admins_list",
        "/remove_admin",
        "/country_code",
        "/set_except_user",
        "/remove_except_user",
        "/show_except_users",
        "/set_general_limit_number",
        "/set_check_interval",
        "/set_time_to_active_users",
        "/backup",
    ];
    for command in commands {
        assert!(
            Command::parse(command, BOT_NAME).is_ok(),
            "command failed to parse: {command}"
        );
    }
}

#[test]
fn specific_commands_map_to_variants() {
    assert!(matches!(
        Command::parse("/create_config", BOT_NAME),
        Ok(Command::CreateConfig)
    ));
    assert!(matches!(
        Command::parse("/set_general_limit_number", BOT_NAME),
        Ok(Command::SetGeneralLimitNumber)
    ));
}

#[test]
fn unknown_commands_are_rejected() {
    assert!(Command::parse("/frobnicate", BOT_NAME).is_err());
}
