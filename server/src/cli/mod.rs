//! Implementations of the command line subcommands, apart from `serve`.

pub mod database_migration;
pub mod file_io;
pub mod manage_catalog;
mod util;

/// Proof of being called from the command line interface.
///
/// Required to create an all-privileged [crate::data_store::auth_token::AuthToken] for the cli
/// data transactions.
pub struct CliAuthTokenKey {
    _private: (),
}

impl CliAuthTokenKey {
    #[allow(clippy::new_without_default)] // We always want to explicitly create these objects
    pub fn new() -> Self {
        Self { _private: () }
    }
}
