use crate::data_store::StoreError;
use crate::setup::SetupError;
use std::path::PathBuf;

/// Error of a command line command, which terminates the program with an [CliError::exit_code].
#[derive(Debug)]
pub enum CliError {
    /// The environment variables are incomplete or invalid
    InvalidSetup(SetupError),
    /// The database server is not reachable or refused the connection
    DatabaseUnavailable(String),
    /// Applying or checking the database schema migrations failed
    DatabaseMigrationFailed(String),
    /// The server cannot start, because these database schema migrations are pending
    PendingMigrations(Vec<String>),
    /// The data store failed in a way the command cannot do anything about
    UnexpectedStoreError(String),
    /// `grant-admin` was called for an identity, which never logged in
    UnknownUser { external_id: String },
    /// The data given on the command line or in the catalog file was rejected
    RejectedData(String),
    CatalogFileUnreadable {
        path: PathBuf,
        error: std::io::Error,
    },
    /// The web server could not listen on the configured address
    BindFailed {
        address: String,
        port: u16,
        error: std::io::Error,
    },
    ServerFailed(std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidSetup(_) => 1,
            CliError::RejectedData(_) => 1,
            CliError::CatalogFileUnreadable { .. } => 1,
            CliError::UnexpectedStoreError(_) => 2,
            CliError::BindFailed { .. } => 3,
            CliError::ServerFailed(_) => 3,
            CliError::DatabaseUnavailable(_) => 4,
            CliError::DatabaseMigrationFailed(_) => 4,
            CliError::PendingMigrations(_) => 5,
            CliError::UnknownUser { .. } => 6,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::InvalidSetup(e) => write!(f, "Setup invalid: {}", e),
            CliError::DatabaseUnavailable(e) => write!(f, "Could not connect to database: {}", e),
            CliError::DatabaseMigrationFailed(e) => {
                write!(f, "Error while migrating the database schema: {}", e)
            }
            CliError::PendingMigrations(migrations) => write!(
                f,
                "Database migration required (run `migrate-database`). Pending migrations: {}",
                migrations.join(", ")
            ),
            CliError::UnexpectedStoreError(e) => write!(f, "Unexpected error in data store: {}", e),
            CliError::UnknownUser { external_id } => write!(
                f,
                "No user with external id {} exists. The user must log in once before.",
                external_id
            ),
            CliError::RejectedData(e) => write!(f, "Data rejected: {}", e),
            CliError::CatalogFileUnreadable { path, error } => {
                write!(f, "Could not read catalog file {:?}: {}", path, error)
            }
            CliError::BindFailed {
                address,
                port,
                error,
            } => write!(f, "Could not listen on {}:{}: {}", address, port, error),
            CliError::ServerFailed(e) => write!(f, "Web server failed: {}", e),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(e) => Self::DatabaseUnavailable(e),
            StoreError::QueryError(e) => Self::UnexpectedStoreError(e.to_string()),
            StoreError::TransactionConflict => {
                Self::UnexpectedStoreError("Concurrent transaction conflict".to_string())
            }
            StoreError::NotExisting => {
                Self::RejectedData("The referenced entry does not exist".to_string())
            }
            StoreError::ConflictEntityExists => {
                Self::RejectedData("An entry with this name exists already".to_string())
            }
            // The command line interface neither books tables nor checks closures
            e @ (StoreError::BookingConflict(_) | StoreError::HallClosed) => {
                Self::UnexpectedStoreError(e.to_string())
            }
            StoreError::PermissionDenied { required_privilege } => Self::UnexpectedStoreError(
                format!("Missing data_store privilege: {:?}", required_privilege),
            ),
            StoreError::InvalidInputData(e) => Self::RejectedData(e),
            StoreError::InvalidDataInDatabase(e) => Self::UnexpectedStoreError(e),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::RejectedData(format!("Catalog file is not valid: {}", value))
    }
}

impl From<SetupError> for CliError {
    fn from(value: SetupError) -> Self {
        Self::InvalidSetup(value)
    }
}

impl From<diesel::ConnectionError> for CliError {
    fn from(value: diesel::ConnectionError) -> Self {
        Self::DatabaseUnavailable(value.to_string())
    }
}
