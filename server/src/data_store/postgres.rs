use super::auth_token::{AuthToken, Privilege};
use super::{
    models, schema, util, BookingId, GameDeletionPolicy, GameId, HallId, LedgerPolicy, StoreError,
    TableBookingStore, TableBookingStoreFacade, TableId, UserId,
};
use crate::auth_session::SessionToken;
use chrono::NaiveDate;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::info;

#[derive(Clone)]
pub struct PgDataStore {
    pool: diesel::r2d2::Pool<diesel::r2d2::ConnectionManager<PgConnection>>,
    policy: LedgerPolicy,
}

impl PgDataStore {
    pub fn new(database_url: &str, policy: LedgerPolicy) -> Result<Self, StoreError> {
        let connection_manager = diesel::r2d2::ConnectionManager::<PgConnection>::new(database_url);
        Ok(Self {
            pool: diesel::r2d2::Pool::builder()
                .test_on_check_out(true)
                .min_idle(Some(2))
                .build(connection_manager)?,
            policy,
        })
    }
}

impl TableBookingStore for PgDataStore {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn TableBookingStoreFacade + 'a>, StoreError> {
        Ok(Box::new(PgDataStoreFacade::with_pooled_connection(
            self.pool.get()?,
            self.policy,
        )))
    }

    fn apply_ledger_policy(&self) -> Result<usize, StoreError> {
        use schema::bookings::dsl::*;
        if !self.policy.one_booking_per_user_per_day {
            return Ok(0);
        }

        let mut connection = self.pool.get()?;
        connection.transaction(|connection| {
            // Lock the first booking of each user and date, unless the user already holds a
            // locked booking on that date. Any further bookings of the user on that date are
            // left unlocked, as they would violate `bookings_user_date_key`.
            let locked = diesel::sql_query(
                "UPDATE bookings SET user_day_lock = booked_by_user_id \
                 WHERE user_day_lock IS NULL AND NOT EXISTS ( \
                     SELECT 1 FROM bookings AS other \
                     WHERE other.booked_by_user_id = bookings.booked_by_user_id \
                         AND other.booking_date = bookings.booking_date \
                         AND (other.user_day_lock IS NOT NULL OR other.id < bookings.id))",
            )
            .execute(connection)?;
            if locked > 0 {
                info!("Applied one-booking-per-user-per-day rule to {} existing bookings", locked);
            }
            let unlocked = bookings
                .filter(user_day_lock.is_null())
                .count()
                .get_result::<i64>(connection)?;
            Ok(unlocked as usize)
        })
    }
}

pub struct PgDataStoreFacade {
    connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
    policy: LedgerPolicy,
}

impl PgDataStoreFacade {
    pub fn with_pooled_connection(
        connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
        policy: LedgerPolicy,
    ) -> Self {
        Self { connection, policy }
    }
}

type BookingDetailsRow = (models::Booking, String, String, Option<String>, String);

impl TableBookingStoreFacade for PgDataStoreFacade {
    fn get_halls(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Hall>, StoreError> {
        use schema::halls::dsl::*;
        auth_token.check_privilege(Privilege::ShowAvailability)?;

        let mut result = halls
            .select(models::Hall::as_select())
            .load::<models::Hall>(&mut self.connection)?;
        result.sort_by(|a, b| util::natural_cmp(&a.name, &b.name));
        Ok(result)
    }

    fn create_hall(
        &mut self,
        auth_token: &AuthToken,
        hall: models::NewHall,
    ) -> Result<HallId, StoreError> {
        use schema::halls::dsl::*;
        auth_token.check_privilege(Privilege::ManageCatalog)?;

        Ok(diesel::insert_into(halls)
            .values(&hall)
            .returning(id)
            .get_result::<HallId>(&mut self.connection)?)
    }

    fn delete_hall(&mut self, auth_token: &AuthToken, hall_id: HallId) -> Result<(), StoreError> {
        use schema::halls::dsl::*;
        auth_token.check_privilege(Privilege::ManageCatalog)?;

        // Tables, their bookings and the hall's closures are deleted by the database (ON DELETE
        // CASCADE)
        let count = diesel::delete(halls.filter(id.eq(hall_id))).execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_tables(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Table>, StoreError> {
        auth_token.check_privilege(Privilege::ShowAvailability)?;

        let mut result = schema::tables::table
            .inner_join(schema::halls::table)
            .select((models::Table::as_select(), schema::halls::name))
            .load::<(models::Table, String)>(&mut self.connection)?;
        result.sort_by(|(table_a, hall_a), (table_b, hall_b)| {
            util::natural_cmp(hall_a, hall_b)
                .then_with(|| util::natural_cmp(&table_a.name, &table_b.name))
        });
        Ok(result.into_iter().map(|(table, _)| table).collect())
    }

    fn create_table(
        &mut self,
        auth_token: &AuthToken,
        table: models::NewTable,
    ) -> Result<TableId, StoreError> {
        use schema::tables::dsl::*;
        auth_token.check_privilege(Privilege::ManageCatalog)?;

        Ok(diesel::insert_into(tables)
            .values(&table)
            .returning(id)
            .get_result::<TableId>(&mut self.connection)?)
    }

    fn delete_table(
        &mut self,
        auth_token: &AuthToken,
        table_id: TableId,
    ) -> Result<(), StoreError> {
        use schema::tables::dsl::*;
        auth_token.check_privilege(Privilege::ManageCatalog)?;

        // The table's bookings are deleted by the database (ON DELETE CASCADE)
        let count = diesel::delete(tables.filter(id.eq(table_id))).execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_games(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Game>, StoreError> {
        use schema::games::dsl::*;
        auth_token.check_privilege(Privilege::ShowAvailability)?;

        let mut result = games
            .select(models::Game::as_select())
            .load::<models::Game>(&mut self.connection)?;
        result.sort_by(|a, b| util::natural_cmp(&a.name, &b.name));
        Ok(result)
    }

    fn create_game(
        &mut self,
        auth_token: &AuthToken,
        game: models::NewGame,
    ) -> Result<GameId, StoreError> {
        use schema::games::dsl::*;
        auth_token.check_privilege(Privilege::ManageCatalog)?;

        Ok(diesel::insert_into(games)
            .values(&game)
            .returning(id)
            .get_result::<GameId>(&mut self.connection)?)
    }

    fn delete_game(&mut self, auth_token: &AuthToken, game_id: GameId) -> Result<(), StoreError> {
        use schema::games::dsl::*;
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let policy = self.policy.game_deletion;

        self.connection.transaction(|connection| {
            if policy == GameDeletionPolicy::Cascade {
                let deleted_bookings = diesel::delete(
                    schema::bookings::table.filter(schema::bookings::game_id.eq(game_id)),
                )
                .execute(connection)?;
                info!(
                    "Deleted {} bookings together with game {}",
                    deleted_bookings, game_id
                );
            }
            // With GameDeletionPolicy::Nullify, the game reference of the bookings is removed by
            // the database (ON DELETE SET NULL)
            let count = diesel::delete(games.filter(id.eq(game_id))).execute(connection)?;
            if count == 0 {
                return Err(StoreError::NotExisting);
            }
            Ok(())
        })
    }

    fn get_hall_closures(
        &mut self,
        auth_token: &AuthToken,
        date: NaiveDate,
    ) -> Result<Vec<models::HallClosure>, StoreError> {
        use schema::hall_closures::dsl::*;
        auth_token.check_privilege(Privilege::ShowAvailability)?;

        Ok(hall_closures
            .filter(closed_date.eq(date))
            .order_by(hall_id.asc())
            .select(models::HallClosure::as_select())
            .load::<models::HallClosure>(&mut self.connection)?)
    }

    fn close_hall(
        &mut self,
        auth_token: &AuthToken,
        closure: models::HallClosure,
    ) -> Result<bool, StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;

        self.connection.transaction(|connection| {
            // The exclusive lock on the hall waits for running booking transactions of the hall's
            // tables (which hold a shared lock, see `create_booking()`).
            schema::halls::table
                .filter(schema::halls::id.eq(closure.hall_id))
                .select(schema::halls::id)
                .for_update()
                .first::<HallId>(connection)?;
            let count = diesel::insert_into(schema::hall_closures::table)
                .values(&closure)
                .on_conflict_do_nothing()
                .execute(connection)?;
            Ok(count == 1)
        })
    }

    fn reopen_hall(
        &mut self,
        auth_token: &AuthToken,
        closure: models::HallClosure,
    ) -> Result<(), StoreError> {
        use schema::hall_closures::dsl::*;
        auth_token.check_privilege(Privilege::ManageCatalog)?;

        let count = diesel::delete(
            hall_closures
                .filter(hall_id.eq(closure.hall_id))
                .filter(closed_date.eq(closure.closed_date)),
        )
        .execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn upsert_user(
        &mut self,
        identity: models::ExternalIdentity,
        grant_admin: bool,
    ) -> Result<models::User, StoreError> {
        use diesel::upsert::excluded;
        use schema::users::dsl::*;

        Ok(diesel::insert_into(users)
            .values((&identity, is_admin.eq(grant_admin)))
            .on_conflict(external_id)
            .do_update()
            .set((
                display_name.eq(excluded(display_name)),
                avatar_ref.eq(excluded(avatar_ref)),
                is_admin.eq(is_admin.or(excluded(is_admin))),
                last_login.eq(diesel::dsl::now),
            ))
            .returning(models::User::as_returning())
            .get_result::<models::User>(&mut self.connection)?)
    }

    fn get_users(&mut self, auth_token: &AuthToken) -> Result<Vec<models::User>, StoreError> {
        use schema::users::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;

        Ok(users
            .order_by(id.asc())
            .select(models::User::as_select())
            .load::<models::User>(&mut self.connection)?)
    }

    fn delete_user(&mut self, auth_token: &AuthToken, user_id: UserId) -> Result<(), StoreError> {
        use schema::users::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;

        // The user's bookings are deleted by the database (ON DELETE CASCADE)
        let count = diesel::delete(users.filter(id.eq(user_id))).execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn grant_admin(
        &mut self,
        auth_token: &AuthToken,
        the_external_id: &str,
    ) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;

        Ok(diesel::update(users)
            .filter(external_id.eq(the_external_id))
            .set(is_admin.eq(true))
            .returning(models::User::as_returning())
            .get_result::<models::User>(&mut self.connection)?)
    }

    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<(AuthToken, models::User), StoreError> {
        use schema::users::dsl::*;

        let user = users
            .filter(id.eq(session_token.user_id()))
            .select(models::User::as_select())
            .first::<models::User>(&mut self.connection)?;
        Ok((AuthToken::create_for_session(user.id, user.is_admin), user))
    }

    fn get_availability(
        &mut self,
        auth_token: &AuthToken,
        date: NaiveDate,
    ) -> Result<Vec<models::TableStatus>, StoreError> {
        use schema::{bookings, games, hall_closures, halls, tables, users};
        auth_token.check_privilege(Privilege::ShowAvailability)?;

        self.connection.transaction(|connection| {
            let rows = tables::table
                .inner_join(halls::table)
                .left_join(
                    bookings::table.on(bookings::table_id
                        .eq(tables::id)
                        .and(bookings::booking_date.eq(date))),
                )
                .left_join(games::table.on(games::id.nullable().eq(bookings::game_id)))
                .left_join(users::table.on(users::id.eq(bookings::booked_by_user_id)))
                .select((
                    tables::id,
                    tables::name,
                    halls::id,
                    halls::name,
                    (
                        bookings::id,
                        bookings::game_id,
                        bookings::player_count,
                        bookings::booked_by_user_id,
                    )
                        .nullable(),
                    games::name.nullable(),
                    users::display_name.nullable(),
                ))
                .load::<(
                    TableId,
                    String,
                    HallId,
                    String,
                    Option<(BookingId, Option<GameId>, i32, UserId)>,
                    Option<String>,
                    Option<String>,
                )>(connection)?;

            let closed_halls = hall_closures::table
                .filter(hall_closures::closed_date.eq(date))
                .select(hall_closures::hall_id)
                .load::<HallId>(connection)?;

            let mut result: Vec<models::TableStatus> = rows
                .into_iter()
                .map(
                    |(table_id, table_name, hall_id, hall_name, booking, game_name, username)| {
                        models::TableStatus {
                            table_id,
                            table_name,
                            hall_id,
                            hall_name,
                            hall_closed: closed_halls.contains(&hall_id),
                            booking: booking.map(
                                |(booking_id, game_id, player_count, booked_by_user_id)| {
                                    models::TableStatusBooking {
                                        booking_id,
                                        game_id,
                                        game_name,
                                        player_count,
                                        booked_by_user_id,
                                        booked_by_username: username.unwrap_or_default(),
                                    }
                                },
                            ),
                        }
                    },
                )
                .collect();
            util::sort_table_statuses(&mut result);
            Ok(result)
        })
    }

    fn create_booking(
        &mut self,
        auth_token: &AuthToken,
        booking: models::NewBooking,
    ) -> Result<models::Booking, StoreError> {
        use schema::bookings::dsl::*;
        auth_token.check_privilege(Privilege::BookTables)?;
        if auth_token.user_id() != Some(booking.booked_by_user_id) {
            return Err(StoreError::PermissionDenied {
                required_privilege: Privilege::BookTables,
            });
        }
        if booking.player_count < 1 {
            return Err(StoreError::InvalidInputData(
                "Booking's player count must be at least 1.".to_owned(),
            ));
        }
        let lock = if self.policy.one_booking_per_user_per_day {
            Some(booking.booked_by_user_id)
        } else {
            None
        };

        self.connection.transaction(|connection| {
            // Shared locks on the hall and the table: prevent concurrent deletion of the table and
            // closing of the hall until this transaction is committed. Concurrent bookings don't
            // block each other here. The hall is locked first, in the same order as
            // `delete_hall()` locks the rows (hall, then its tables via the cascade).
            let the_hall_id = schema::tables::table
                .filter(schema::tables::id.eq(booking.table_id))
                .select(schema::tables::hall_id)
                .first::<HallId>(connection)
                .optional()?
                .ok_or_else(unknown_table_error)?;
            schema::halls::table
                .filter(schema::halls::id.eq(the_hall_id))
                .select(schema::halls::id)
                .for_share()
                .first::<HallId>(connection)
                .optional()?
                .ok_or_else(unknown_table_error)?;
            schema::tables::table
                .filter(schema::tables::id.eq(booking.table_id))
                .select(schema::tables::id)
                .for_share()
                .first::<TableId>(connection)
                .optional()?
                .ok_or_else(unknown_table_error)?;

            let hall_is_closed = diesel::select(diesel::dsl::exists(
                schema::hall_closures::table
                    .filter(schema::hall_closures::hall_id.eq(the_hall_id))
                    .filter(schema::hall_closures::closed_date.eq(booking.booking_date)),
            ))
            .get_result::<bool>(connection)?;
            if hall_is_closed {
                return Err(StoreError::HallClosed);
            }

            // The uniqueness invariants are checked by the database's unique constraints
            // `bookings_table_date_key` and `bookings_user_date_key`. A violation is translated to
            // StoreError::BookingConflict (see `impl From<diesel::result::Error> for StoreError`).
            Ok(diesel::insert_into(bookings)
                .values((&booking, user_day_lock.eq(lock)))
                .returning(models::Booking::as_returning())
                .get_result::<models::Booking>(connection)?)
        })
    }

    fn cancel_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<models::Booking, StoreError> {
        use schema::bookings::dsl::*;

        let query = diesel::delete(bookings).filter(id.eq(booking_id)).into_boxed();
        let query = if auth_token.has_privilege(Privilege::CancelAnyBooking) {
            query
        } else {
            let user_id = auth_token.user_id().ok_or(StoreError::PermissionDenied {
                required_privilege: Privilege::CancelAnyBooking,
            })?;
            query.filter(booked_by_user_id.eq(user_id))
        };
        Ok(query
            .returning(models::Booking::as_returning())
            .get_result::<models::Booking>(&mut self.connection)?)
    }

    fn get_bookings_of_user(
        &mut self,
        auth_token: &AuthToken,
        user_id: UserId,
        from_date: Option<NaiveDate>,
    ) -> Result<Vec<models::BookingDetails>, StoreError> {
        auth_token.check_user_or_privilege(user_id, Privilege::ShowAllBookings)?;

        let mut result = load_booking_details(&mut self.connection, Some(user_id), from_date)?;
        util::sort_booking_details(&mut result, false);
        Ok(result)
    }

    fn get_all_bookings(
        &mut self,
        auth_token: &AuthToken,
    ) -> Result<Vec<models::BookingDetails>, StoreError> {
        auth_token.check_privilege(Privilege::ShowAllBookings)?;

        let mut result = load_booking_details(&mut self.connection, None, None)?;
        util::sort_booking_details(&mut result, true);
        Ok(result)
    }
}

/// Load bookings, joined with the names of the referenced table, hall, game and user, optionally
/// filtered by user and minimum date.
///
/// The game is joined with a LEFT JOIN, as it is optional or may have been deleted.
fn load_booking_details(
    connection: &mut PgConnection,
    user_id: Option<UserId>,
    from_date: Option<NaiveDate>,
) -> Result<Vec<models::BookingDetails>, StoreError> {
    use schema::{bookings, games, halls, tables, users};

    let mut query = bookings::table
        .inner_join(tables::table.inner_join(halls::table))
        .inner_join(users::table)
        .left_join(games::table.on(games::id.nullable().eq(bookings::game_id)))
        .select((
            models::Booking::as_select(),
            tables::name,
            halls::name,
            games::name.nullable(),
            users::display_name,
        ))
        .into_boxed();
    if let Some(user_id) = user_id {
        query = query.filter(bookings::booked_by_user_id.eq(user_id));
    }
    if let Some(from_date) = from_date {
        query = query.filter(bookings::booking_date.ge(from_date));
    }

    Ok(query
        .load::<BookingDetailsRow>(connection)?
        .into_iter()
        .map(
            |(booking, table_name, hall_name, game_name, booked_by_username)| {
                models::BookingDetails {
                    booking,
                    table_name,
                    hall_name,
                    game_name,
                    booked_by_username,
                }
            },
        )
        .collect())
}

fn unknown_table_error() -> StoreError {
    StoreError::InvalidInputData("Booking's table must reference an existing table.".to_owned())
}

/// Get a human-readable description of the consistency expectation that is checked by a specific
/// constraint in our Postgres database schema by the constraint's name.
///
/// These are visible to the user when creating entities inconsistently via the REST API.
///
/// Returns None, when no human-readable description is present of the given constraint name. This
/// may be the case when we don't expect this constraint to be violated by a user interaction.
pub fn description_for_postgres_constraint(constraint_name: &str) -> Option<&'static str> {
    match constraint_name {
        "bookings_table_id_fkey" => Some("Booking's table must reference an existing table."),
        "bookings_game_id_fkey" => Some("Booking's game must be null or reference an existing game."),
        "bookings_booked_by_user_id_fkey" => Some("Booking's user must reference an existing user."),
        "bookings_player_count_positive" => Some("Booking's player count must be at least 1."),
        "tables_hall_id_fkey" => Some("Table's hall must reference an existing hall."),
        "hall_closures_hall_id_fkey" => Some("Hall closure's hall must reference an existing hall."),
        _ => None,
    }
}
