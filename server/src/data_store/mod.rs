//! The backend part of the backend: the database interface
//!
//! The primary entry point to this module is the function [get_store_from_env], which returns an
//! object implementing the [TableBookingStore] trait. This object can be shared between threads in
//! a global application state and be used to create [TableBookingStoreFacade] instances for
//! interaction with the database. These provide a CRUD-like interface for the catalog (halls,
//! tables, games) and users, and the booking ledger, using the data models from the [models]
//! module.
//!
//! The booking ledger guards two uniqueness invariants: at most one booking per table and date,
//! and (if enabled by the [LedgerPolicy]) at most one booking per user and date. Implementations
//! must enforce them atomically, even for concurrent facades. The PostgreSQL implementation
//! ([postgres::PgDataStore]) relies on unique constraints of the database schema for this and
//! translates constraint violations into [StoreError::BookingConflict].
//!
//! There is also a mock implementation for unittests.

use crate::auth_session::SessionToken;
use crate::cli_error::CliError;
use crate::setup;
use auth_token::AuthToken;
use chrono::NaiveDate;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod auth_token;
pub mod models;
mod postgres;
mod schema;
#[cfg(test)]
pub mod store_mock;
pub mod util;

/// Get a [TableBookingStore] instance, according the "DATABASE_URL" environment variable.
///
/// The DATABASE_URL must be a PosgreSQL connection url, following the schema
/// "postgres://{user}:{password}@{host}/{database}".
pub fn get_store_from_env(policy: LedgerPolicy) -> Result<impl TableBookingStore, CliError> {
    postgres::PgDataStore::new(&setup::get_database_url_from_env()?, policy)
        .map_err(|err| CliError::DatabaseUnavailable(err.to_string()))
}

pub type HallId = i32;
pub type TableId = i32;
pub type GameId = i32;
pub type UserId = i32;
pub type BookingId = i32;

/// Configurable rules of the booking ledger, fixed per deployment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LedgerPolicy {
    /// If true, each user may only hold a single booking per date
    pub one_booking_per_user_per_day: bool,
    /// How to resolve the bookings referencing a game, when the game is deleted
    pub game_deletion: GameDeletionPolicy,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            one_booking_per_user_per_day: true,
            game_deletion: GameDeletionPolicy::Nullify,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GameDeletionPolicy {
    /// Keep the bookings, but remove their game reference
    Nullify,
    /// Delete the bookings together with the game
    Cascade,
}

impl FromStr for GameDeletionPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nullify" => Ok(Self::Nullify),
            "cascade" => Ok(Self::Cascade),
            _ => Err(()),
        }
    }
}

pub trait TableBookingStoreFacade {
    fn get_halls(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Hall>, StoreError>;
    fn create_hall(
        &mut self,
        auth_token: &AuthToken,
        hall: models::NewHall,
    ) -> Result<HallId, StoreError>;
    /// Delete a hall, together with all its tables and their bookings
    fn delete_hall(&mut self, auth_token: &AuthToken, hall_id: HallId) -> Result<(), StoreError>;

    /// Get all tables, ordered by hall and (natural order of) table name
    fn get_tables(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Table>, StoreError>;
    fn create_table(
        &mut self,
        auth_token: &AuthToken,
        table: models::NewTable,
    ) -> Result<TableId, StoreError>;
    /// Delete a table, together with all its bookings
    fn delete_table(&mut self, auth_token: &AuthToken, table_id: TableId)
        -> Result<(), StoreError>;

    fn get_games(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Game>, StoreError>;
    fn create_game(
        &mut self,
        auth_token: &AuthToken,
        game: models::NewGame,
    ) -> Result<GameId, StoreError>;
    /// Delete a game. The referencing bookings are deleted or keep existing without game,
    /// according to the store's [LedgerPolicy::game_deletion].
    fn delete_game(&mut self, auth_token: &AuthToken, game_id: GameId) -> Result<(), StoreError>;

    fn get_hall_closures(
        &mut self,
        auth_token: &AuthToken,
        date: NaiveDate,
    ) -> Result<Vec<models::HallClosure>, StoreError>;
    /// Close a hall for bookings on the given date. Existing bookings are not touched.
    ///
    /// # return value
    /// - `Ok(true)` if the hall has been closed
    /// - `Ok(false)` if the hall had already been closed for that date
    fn close_hall(
        &mut self,
        auth_token: &AuthToken,
        closure: models::HallClosure,
    ) -> Result<bool, StoreError>;
    fn reopen_hall(
        &mut self,
        auth_token: &AuthToken,
        closure: models::HallClosure,
    ) -> Result<(), StoreError>;

    /// Create a new user or update the existing user with the same external id, when they log in.
    ///
    /// If `grant_admin` is true, the user is elevated to admin. Otherwise, the admin flag of an
    /// existing user is kept.
    fn upsert_user(
        &mut self,
        identity: models::ExternalIdentity,
        grant_admin: bool,
    ) -> Result<models::User, StoreError>;
    fn get_users(&mut self, auth_token: &AuthToken) -> Result<Vec<models::User>, StoreError>;
    /// Delete a user, together with all of their bookings
    fn delete_user(&mut self, auth_token: &AuthToken, user_id: UserId) -> Result<(), StoreError>;
    /// Elevate the user with the given external id to admin
    fn grant_admin(
        &mut self,
        auth_token: &AuthToken,
        external_id: &str,
    ) -> Result<models::User, StoreError>;

    /// Get an [AuthToken] instance for a client, representing the user of the client's session
    ///
    /// Returns `Err(StoreError::NotExisting)` if the session's user does not exist (anymore).
    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<(AuthToken, models::User), StoreError>;

    /// Get the booking status of each table on the given date.
    ///
    /// The result contains one entry per table, ordered by hall name and natural order of the
    /// table name.
    fn get_availability(
        &mut self,
        auth_token: &AuthToken,
        date: NaiveDate,
    ) -> Result<Vec<models::TableStatus>, StoreError>;

    /// Atomically create a new booking, if it does not conflict with existing bookings.
    ///
    /// The booking must be booked by the authenticated user of the `auth_token`.
    ///
    /// # return value
    /// - `Ok(booking)` if the booking has been created
    /// - `Err(StoreError::BookingConflict(_))` if the table is already booked on that date or the
    ///   user already has a booking on that date (only with
    ///   [LedgerPolicy::one_booking_per_user_per_day])
    /// - `Err(StoreError::HallClosed)` if the table's hall is closed on that date
    /// - `Err(StoreError::InvalidInputData(_))` if the table or game does not exist
    /// - `Err(_)` if something different went wrong, as usual
    fn create_booking(
        &mut self,
        auth_token: &AuthToken,
        booking: models::NewBooking,
    ) -> Result<models::Booking, StoreError>;

    /// Cancel (delete) a booking. Only the booking's user or an admin may cancel a booking.
    ///
    /// Returns the deleted booking or `Err(StoreError::NotExisting)` if the booking does not exist
    /// or does not belong to the authenticated user. Both cases are deliberately not
    /// distinguished.
    fn cancel_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<models::Booking, StoreError>;

    /// Get the bookings of a user, ordered by date (ascending), optionally only from the given
    /// date on.
    fn get_bookings_of_user(
        &mut self,
        auth_token: &AuthToken,
        user_id: UserId,
        from_date: Option<NaiveDate>,
    ) -> Result<Vec<models::BookingDetails>, StoreError>;

    /// Get all bookings, newest date first
    fn get_all_bookings(
        &mut self,
        auth_token: &AuthToken,
    ) -> Result<Vec<models::BookingDetails>, StoreError>;
}

pub trait TableBookingStore: Send + Sync {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn TableBookingStoreFacade + 'a>, StoreError>;

    /// Adjust the stored bookings to the store's [LedgerPolicy]. This is required when the
    /// one-booking-per-user-per-day rule is enabled for a database, which already contains bookings
    /// created without the rule.
    ///
    /// Returns the number of existing bookings, which violate the rule and are kept anyway. The
    /// rule is enforced for all new bookings, nevertheless.
    fn apply_ledger_policy(&self) -> Result<usize, StoreError>;
}

/// The invariant, which would have been violated by a new booking
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BookingConflict {
    /// There is a booking for the same table on the same date
    TableAlreadyBooked,
    /// The user already has a booking on the same date
    UserAlreadyBooked,
}

impl Display for BookingConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TableAlreadyBooked => f.write_str("This table is already booked for the selected date."),
            Self::UserAlreadyBooked => f.write_str("You already have a booking for this date. Only one booking per user per day is allowed."),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// Connection the database failed. See string description for details.
    ConnectionError(String),
    /// The query could not be executed because of some error not covered by the other members (see
    /// string description)
    QueryError(diesel::result::Error),
    /// Database transaction could not be commited due to a conflicting concurrent transaction
    TransactionConflict,
    /// The requested entity does not exist
    NotExisting,
    /// The entity could not be created because it (or another entity with the same unique name)
    /// already exists.
    ConflictEntityExists,
    /// The booking could not be created, because it would violate one of the ledger's invariants
    BookingConflict(BookingConflict),
    /// The booking could not be created, because the table's hall is closed on the requested date
    HallClosed,
    /// The client is not authorized for this action. It would need to authenticate for an access
    /// role qualifying for the `required_privilege`.
    PermissionDenied {
        required_privilege: auth_token::Privilege,
    },
    /// The provided data is invalid, i.e. it does not match the expected ranges or violates a
    /// SQL constraint. See string description for details.
    InvalidInputData(String),
    /// Some data queried from the database could not be deserialized. See string description for
    /// details.
    InvalidDataInDatabase(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotExisting,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => match info.constraint_name() {
                Some("bookings_table_date_key") => {
                    Self::BookingConflict(BookingConflict::TableAlreadyBooked)
                }
                Some("bookings_user_date_key") => {
                    Self::BookingConflict(BookingConflict::UserAlreadyBooked)
                }
                _ => Self::ConflictEntityExists,
            },
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::SerializationFailure,
                _,
            ) => Self::TransactionConflict,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ClosedConnection
                | diesel::result::DatabaseErrorKind::UnableToSendCommand,
                info,
            ) => Self::ConnectionError(info.message().to_owned()),
            diesel::result::Error::BrokenTransactionManager => {
                Self::ConnectionError("The transaction manager is broken".to_owned())
            }
            // Diesel has no error kind for deadlocks (SQLSTATE 40P01). PostgreSQL aborts one of the
            // involved transactions, which can be retried like a serialization failure.
            diesel::result::Error::DatabaseError(_, info)
                if info.message().starts_with("deadlock detected") =>
            {
                Self::TransactionConflict
            }
            diesel::result::Error::DatabaseError(
                e @ diesel::result::DatabaseErrorKind::ForeignKeyViolation
                | e @ diesel::result::DatabaseErrorKind::CheckViolation,
                info,
            ) => Self::InvalidInputData(
                info.constraint_name()
                    .and_then(postgres::description_for_postgres_constraint)
                    .map(|s| s.to_owned())
                    .unwrap_or_else(|| format!("{:?}", e)),
            ),
            diesel::result::Error::SerializationError(e) => Self::InvalidInputData(e.to_string()),
            diesel::result::Error::DeserializationError(e) => {
                Self::InvalidDataInDatabase(e.to_string())
            }
            _ => Self::QueryError(error),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(error: r2d2::Error) -> Self {
        Self::ConnectionError(error.to_string())
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Error connecting to database: {}", e),
            Self::QueryError(e) => write!(f, "Error while executing database query: {}", e),
            Self::TransactionConflict => f.write_str("Database transaction could not be commited due to a conflicting concurrent transaction"),
            Self::NotExisting => f.write_str("Database record does not exist."),
            Self::ConflictEntityExists => f.write_str("Database record exists already."),
            Self::BookingConflict(c) => write!(f, "Booking conflict: {}", c),
            Self::HallClosed => f.write_str("The hall is closed on the requested date."),
            Self::PermissionDenied { required_privilege } => {
                write!(f, "Client is not authorized to perform this action. {:?} privilege required.", required_privilege)
            }
            Self::InvalidInputData(e) => {
                write!(f, "Data to be stored in database is not valid: {}", e)
            }
            Self::InvalidDataInDatabase(e) => {
                write!(f, "Data queried from database could not be deserialized: {}", e)
            },
        }
    }
}

impl std::error::Error for StoreError {}
