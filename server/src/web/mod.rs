use crate::booking_calendar::BookingCalendar;
use crate::cli::database_migration::check_migration_state;
use crate::cli_error::CliError;
use crate::data_store::{get_store_from_env, TableBookingStore};
use crate::identity_provider::DiscordIdentityProvider;
use crate::setup::{
    get_admin_identity_from_env, get_booking_calendar_from_env, get_discord_settings_from_env,
    get_ledger_policy_from_env, get_listen_address_from_env, get_listen_port_from_env,
    get_secret_from_env,
};
use actix_web::{middleware, web, App, HttpServer};
use log::{info, warn};
use std::sync::Arc;

mod api;
mod http_error_logging;

pub fn serve() -> Result<(), CliError> {
    info!("Starting table booking server version {}", crate::get_version());
    check_migration_state()?;
    let state = AppState::new()?;
    let listen_address = get_listen_address_from_env()?;
    let listen_port = get_listen_port_from_env()?;
    info!("Listening on {}:{}", listen_address, listen_port);
    let bind_address = listen_address.clone();
    actix_web::rt::System::new()
        .block_on(
            HttpServer::new(move || {
                App::new()
                    .configure(api::configure_app)
                    .app_data(web::Data::new(state.clone()))
                    .wrap(middleware::from_fn(
                        http_error_logging::error_logging_middleware,
                    ))
                    .wrap(middleware::Compress::default())
            })
            .bind((bind_address, listen_port))
            .map_err(|error| CliError::BindFailed {
                address: listen_address,
                port: listen_port,
                error,
            })?
            .run(),
        )
        .map_err(CliError::ServerFailed)
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn TableBookingStore>,
    secret: String,
    calendar: BookingCalendar,
    /// None, if login is not configured
    identity_provider: Option<Arc<DiscordIdentityProvider>>,
    /// External identity id of the user, who is elevated to admin on login
    admin_identity: Option<String>,
}

impl AppState {
    pub fn new() -> Result<Self, CliError> {
        let policy = get_ledger_policy_from_env()?;
        let calendar = get_booking_calendar_from_env()?;
        info!(
            "Booking policy: {:?}; bookable days: {}",
            policy,
            calendar.describe_allowed_days()
        );
        let identity_provider = get_discord_settings_from_env()?
            .map(|settings| Arc::new(DiscordIdentityProvider::new(settings)));
        if identity_provider.is_none() {
            warn!("Discord login is not configured. Users won't be able to log in.");
        }
        let store = get_store_from_env(policy)?;
        let violating_bookings = store.apply_ledger_policy()?;
        if violating_bookings > 0 {
            warn!(
                "{} existing bookings violate the one-booking-per-user-per-day rule. They are kept.",
                violating_bookings
            );
        }
        Ok(Self {
            store: Arc::new(store),
            secret: get_secret_from_env()?,
            calendar,
            identity_provider,
            admin_identity: get_admin_identity_from_env()?,
        })
    }
}
