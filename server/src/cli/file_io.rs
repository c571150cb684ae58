use crate::cli::CliAuthTokenKey;
use crate::cli_error::CliError;
use crate::data_store::auth_token::AuthToken;
use crate::data_store::{get_store_from_env, models, StoreError, TableBookingStore};
use crate::setup::get_ledger_policy_from_env;
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tablebooking_api_types::Catalog;

/// Load a catalog of halls, tables and games from a JSON file (in the format of
/// [tablebooking_api_types::Catalog]) into the database.
///
/// Entities, which already exist with the same name, are skipped. Thus, the same file can be loaded
/// multiple times, e.g. after adding new tables to it.
pub fn load_catalog_from_file(path: &PathBuf) -> Result<(), CliError> {
    let f = File::open(path).map_err(|error| CliError::CatalogFileUnreadable {
        path: path.clone(),
        error,
    })?;
    let catalog: Catalog = serde_json::from_reader(BufReader::new(f))?;
    validate_catalog(&catalog)?;

    let data_store_pool = get_store_from_env(get_ledger_policy_from_env()?)?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let mut hall_ids: BTreeMap<String, i32> = data_store
        .get_halls(&auth_token)?
        .into_iter()
        .map(|h| (h.name, h.id))
        .collect();
    let mut created = 0;
    for hall in catalog.halls {
        let hall_name = hall.name.trim().to_owned();
        let hall_id = match hall_ids.get(&hall_name).copied() {
            Some(id) => id,
            None => {
                let id = data_store.create_hall(
                    &auth_token,
                    models::NewHall {
                        name: hall_name.clone(),
                    },
                )?;
                created += 1;
                hall_ids.insert(hall_name.clone(), id);
                id
            }
        };
        for table_name in hall.tables {
            created += skip_existing(
                data_store.create_table(
                    &auth_token,
                    models::NewTable {
                        name: table_name.trim().to_owned(),
                        hall_id,
                    },
                ),
                &table_name,
            )?;
        }
    }
    for game_name in catalog.games {
        created += skip_existing(
            data_store.create_game(
                &auth_token,
                models::NewGame {
                    name: game_name.trim().to_owned(),
                },
            ),
            &game_name,
        )?;
    }

    info!("Created {} catalog entities from {:?}.", created, path);
    Ok(())
}

fn skip_existing(result: Result<i32, StoreError>, name: &str) -> Result<u32, CliError> {
    match result {
        Ok(_) => Ok(1),
        Err(StoreError::ConflictEntityExists) => {
            warn!("Skipping '{}', which exists already.", name);
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

fn validate_catalog(catalog: &Catalog) -> Result<(), CliError> {
    let names = catalog
        .halls
        .iter()
        .map(|h| &h.name)
        .chain(catalog.halls.iter().flat_map(|h| h.tables.iter()))
        .chain(catalog.games.iter());
    for name in names {
        if name.trim().is_empty() {
            return Err(CliError::RejectedData(
                "Catalog contains an empty name.".to_owned(),
            ));
        }
    }
    Ok(())
}
