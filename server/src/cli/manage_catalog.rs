use crate::cli::util::{name_or_query_user, query_user_bool, value_or_query_user};
use crate::cli::CliAuthTokenKey;
use crate::cli_error::CliError;
use crate::data_store::auth_token::AuthToken;
use crate::data_store::{get_store_from_env, models, HallId, StoreError, TableBookingStore};
use crate::setup::get_ledger_policy_from_env;

pub fn print_catalog() -> Result<(), CliError> {
    let data_store_pool = get_store_from_env(get_ledger_policy_from_env()?)?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let halls = data_store.get_halls(&auth_token)?;
    let tables = data_store.get_tables(&auth_token)?;
    let games = data_store.get_games(&auth_token)?;

    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED)
        .set_header(vec!["id", "hall", "tables"])
        .add_rows(halls.into_iter().map(|hall| {
            [
                hall.id.to_string(),
                hall.name,
                tables
                    .iter()
                    .filter(|t| t.hall_id == hall.id)
                    .map(|t| format!("{} ({})", t.name, t.id))
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        }));
    println!("{table}");

    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED)
        .set_header(vec!["id", "game"])
        .add_rows(
            games
                .into_iter()
                .map(|game| [game.id.to_string(), game.name]),
        );
    println!("{table}");
    Ok(())
}

pub fn add_hall(name: Option<String>) -> Result<(), CliError> {
    let name = name_or_query_user(name, "Name of the new hall");
    let data_store_pool = get_store_from_env(get_ledger_policy_from_env()?)?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let hall_id = data_store.create_hall(&auth_token, models::NewHall { name })?;
    println!("Created hall with id {}.", hall_id);
    Ok(())
}

pub fn add_table(hall_id: Option<HallId>, name: Option<String>) -> Result<(), CliError> {
    let hall_id = value_or_query_user(hall_id, "Id of the table's hall");
    let name = name_or_query_user(name, "Name of the new table");
    let data_store_pool = get_store_from_env(get_ledger_policy_from_env()?)?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let table_id = data_store.create_table(&auth_token, models::NewTable { name, hall_id })?;
    println!("Created table with id {}.", table_id);
    Ok(())
}

pub fn add_game(name: Option<String>) -> Result<(), CliError> {
    let name = name_or_query_user(name, "Name of the new game");
    let data_store_pool = get_store_from_env(get_ledger_policy_from_env()?)?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let game_id = data_store.create_game(&auth_token, models::NewGame { name })?;
    println!("Created game with id {}.", game_id);
    Ok(())
}

/// Elevate an existing user to admin, identified by their external (Discord) user id. The user
/// must have logged in at least once.
pub fn grant_admin(external_id: String, confirmed: bool) -> Result<(), CliError> {
    if !confirmed
        && !query_user_bool(
            &format!("Grant admin privileges to user {}?", external_id),
            Some(false),
        )
    {
        println!("Aborted.");
        return Ok(());
    }
    let data_store_pool = get_store_from_env(get_ledger_policy_from_env()?)?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let user = data_store
        .grant_admin(&auth_token, &external_id)
        .map_err(|e| match e {
            StoreError::NotExisting => CliError::UnknownUser { external_id },
            e => e.into(),
        })?;
    println!("User '{}' ({}) is now admin.", user.display_name, user.id);
    Ok(())
}
