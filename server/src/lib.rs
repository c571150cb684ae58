mod data_store;

mod auth_session;
pub mod booking_calendar;
pub mod cli;
pub mod cli_error;
mod identity_provider;
mod setup;
pub mod web;

pub use cli::CliAuthTokenKey;

fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
