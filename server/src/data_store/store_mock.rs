use crate::auth_session::SessionToken;
use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::data_store::models::{
    Booking, BookingDetails, ExternalIdentity, Game, Hall, HallClosure, NewBooking, NewGame,
    NewHall, NewTable, Table, TableStatus, TableStatusBooking, User,
};
use crate::data_store::{
    util, BookingConflict, BookingId, GameDeletionPolicy, GameId, HallId, LedgerPolicy,
    StoreError, TableBookingStore, TableBookingStoreFacade, TableId, UserId,
};
use chrono::NaiveDate;
use std::sync::Mutex;

/**
 * A mock [TableBookingStore] implementation for testing.
 *
 * The simulated database consists of the [StoreMockData] structure with vectors of entities. These
 * can be directly modified by the tests.
 *
 * In contrast to the database, the mock does not have transactions. Instead, each facade method
 * holds the mutex for its whole runtime, which makes the ledger operations atomic as well. The
 * ledger invariants, the hall closures, the referential integrity and the privilege checks are
 * simulated like in the PostgreSQL implementation. In addition, the [StoreMockData.next_error]
 * attribute can be set to simulate a database error.
 */
#[derive(Default)]
pub struct StoreMock {
    pub data: Mutex<StoreMockData>,
    pub policy: LedgerPolicy,
}

impl StoreMock {
    pub fn with_policy(policy: LedgerPolicy) -> Self {
        Self {
            data: Mutex::default(),
            policy,
        }
    }
}

impl TableBookingStore for StoreMock {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn TableBookingStoreFacade + 'a>, StoreError> {
        Ok(Box::new(StoreMockFacade { store: self }))
    }

    /// The mock checks the one-booking-per-user-per-day rule against all bookings of the user, so
    /// there is nothing to adjust. Only the bookings violating the rule are counted.
    fn apply_ledger_policy(&self) -> Result<usize, StoreError> {
        if !self.policy.one_booking_per_user_per_day {
            return Ok(0);
        }
        let data = self.data.lock().expect("Error while locking mutex.");
        let user_days: std::collections::BTreeSet<(UserId, NaiveDate)> = data
            .bookings
            .iter()
            .map(|b| (b.booked_by_user_id, b.booking_date))
            .collect();
        Ok(data.bookings.len() - user_days.len())
    }
}

#[derive(Default)]
pub struct StoreMockData {
    pub halls: Vec<Hall>,
    pub tables: Vec<Table>,
    pub games: Vec<Game>,
    pub users: Vec<User>,
    pub bookings: Vec<Booking>,
    pub hall_closures: Vec<HallClosure>,
    /// Last used id, for generating ids of new entities
    pub last_id: i32,
    /// If not none, the next call to a store facade method will return this error.
    pub next_error: Option<StoreError>,
}

impl StoreMockData {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn booking_details(&self, booking: &Booking) -> BookingDetails {
        let table = self.tables.iter().find(|t| t.id == booking.table_id);
        BookingDetails {
            booking: booking.clone(),
            table_name: table.map(|t| t.name.clone()).unwrap_or_default(),
            hall_name: table
                .and_then(|t| self.halls.iter().find(|h| h.id == t.hall_id))
                .map(|h| h.name.clone())
                .unwrap_or_default(),
            game_name: booking
                .game_id
                .and_then(|game_id| self.games.iter().find(|g| g.id == game_id))
                .map(|g| g.name.clone()),
            booked_by_username: self
                .users
                .iter()
                .find(|u| u.id == booking.booked_by_user_id)
                .map(|u| u.display_name.clone())
                .unwrap_or_default(),
        }
    }

    fn delete_bookings_where(&mut self, predicate: impl Fn(&Booking) -> bool) {
        self.bookings.retain(|b| !predicate(b));
    }
}

struct StoreMockFacade<'a> {
    store: &'a StoreMock,
}

impl StoreMockFacade<'_> {
    fn lock_data(&self) -> Result<std::sync::MutexGuard<'_, StoreMockData>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        Ok(data)
    }
}

impl TableBookingStoreFacade for StoreMockFacade<'_> {
    fn get_halls(&mut self, auth_token: &AuthToken) -> Result<Vec<Hall>, StoreError> {
        auth_token.check_privilege(Privilege::ShowAvailability)?;
        let data = self.lock_data()?;
        let mut result = data.halls.clone();
        result.sort_by(|a, b| util::natural_cmp(&a.name, &b.name));
        Ok(result)
    }

    fn create_hall(&mut self, auth_token: &AuthToken, hall: NewHall) -> Result<HallId, StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let mut data = self.lock_data()?;
        if data.halls.iter().any(|h| h.name == hall.name) {
            return Err(StoreError::ConflictEntityExists);
        }
        let id = data.next_id();
        data.halls.push(Hall {
            id,
            name: hall.name,
        });
        Ok(id)
    }

    fn delete_hall(&mut self, auth_token: &AuthToken, hall_id: HallId) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let mut data = self.lock_data()?;
        if !data.halls.iter().any(|h| h.id == hall_id) {
            return Err(StoreError::NotExisting);
        }
        let table_ids: Vec<TableId> = data
            .tables
            .iter()
            .filter(|t| t.hall_id == hall_id)
            .map(|t| t.id)
            .collect();
        data.delete_bookings_where(|b| table_ids.contains(&b.table_id));
        data.tables.retain(|t| t.hall_id != hall_id);
        data.hall_closures.retain(|c| c.hall_id != hall_id);
        data.halls.retain(|h| h.id != hall_id);
        Ok(())
    }

    fn get_tables(&mut self, auth_token: &AuthToken) -> Result<Vec<Table>, StoreError> {
        auth_token.check_privilege(Privilege::ShowAvailability)?;
        let data = self.lock_data()?;
        let hall_name = |hall_id: HallId| {
            data.halls
                .iter()
                .find(|h| h.id == hall_id)
                .map(|h| h.name.as_str())
                .unwrap_or_default()
        };
        let mut result = data.tables.clone();
        result.sort_by(|a, b| {
            util::natural_cmp(hall_name(a.hall_id), hall_name(b.hall_id))
                .then_with(|| util::natural_cmp(&a.name, &b.name))
        });
        Ok(result)
    }

    fn create_table(
        &mut self,
        auth_token: &AuthToken,
        table: NewTable,
    ) -> Result<TableId, StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let mut data = self.lock_data()?;
        if !data.halls.iter().any(|h| h.id == table.hall_id) {
            return Err(StoreError::InvalidInputData(
                "Table's hall must reference an existing hall.".to_owned(),
            ));
        }
        if data.tables.iter().any(|t| t.name == table.name) {
            return Err(StoreError::ConflictEntityExists);
        }
        let id = data.next_id();
        data.tables.push(Table {
            id,
            name: table.name,
            hall_id: table.hall_id,
        });
        Ok(id)
    }

    fn delete_table(
        &mut self,
        auth_token: &AuthToken,
        table_id: TableId,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let mut data = self.lock_data()?;
        if !data.tables.iter().any(|t| t.id == table_id) {
            return Err(StoreError::NotExisting);
        }
        data.delete_bookings_where(|b| b.table_id == table_id);
        data.tables.retain(|t| t.id != table_id);
        Ok(())
    }

    fn get_games(&mut self, auth_token: &AuthToken) -> Result<Vec<Game>, StoreError> {
        auth_token.check_privilege(Privilege::ShowAvailability)?;
        let data = self.lock_data()?;
        let mut result = data.games.clone();
        result.sort_by(|a, b| util::natural_cmp(&a.name, &b.name));
        Ok(result)
    }

    fn create_game(&mut self, auth_token: &AuthToken, game: NewGame) -> Result<GameId, StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let mut data = self.lock_data()?;
        if data.games.iter().any(|g| g.name == game.name) {
            return Err(StoreError::ConflictEntityExists);
        }
        let id = data.next_id();
        data.games.push(Game {
            id,
            name: game.name,
        });
        Ok(id)
    }

    fn delete_game(&mut self, auth_token: &AuthToken, game_id: GameId) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let mut data = self.lock_data()?;
        if !data.games.iter().any(|g| g.id == game_id) {
            return Err(StoreError::NotExisting);
        }
        match self.store.policy.game_deletion {
            GameDeletionPolicy::Cascade => {
                data.delete_bookings_where(|b| b.game_id == Some(game_id));
            }
            GameDeletionPolicy::Nullify => {
                for booking in data.bookings.iter_mut() {
                    if booking.game_id == Some(game_id) {
                        booking.game_id = None;
                    }
                }
            }
        }
        data.games.retain(|g| g.id != game_id);
        Ok(())
    }

    fn get_hall_closures(
        &mut self,
        auth_token: &AuthToken,
        date: NaiveDate,
    ) -> Result<Vec<HallClosure>, StoreError> {
        auth_token.check_privilege(Privilege::ShowAvailability)?;
        let data = self.lock_data()?;
        let mut result: Vec<HallClosure> = data
            .hall_closures
            .iter()
            .filter(|c| c.closed_date == date)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.hall_id);
        Ok(result)
    }

    fn close_hall(
        &mut self,
        auth_token: &AuthToken,
        closure: HallClosure,
    ) -> Result<bool, StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let mut data = self.lock_data()?;
        if !data.halls.iter().any(|h| h.id == closure.hall_id) {
            return Err(StoreError::NotExisting);
        }
        if data.hall_closures.contains(&closure) {
            return Ok(false);
        }
        data.hall_closures.push(closure);
        Ok(true)
    }

    fn reopen_hall(
        &mut self,
        auth_token: &AuthToken,
        closure: HallClosure,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageCatalog)?;
        let mut data = self.lock_data()?;
        if !data.hall_closures.contains(&closure) {
            return Err(StoreError::NotExisting);
        }
        data.hall_closures.retain(|c| *c != closure);
        Ok(())
    }

    fn upsert_user(
        &mut self,
        identity: ExternalIdentity,
        grant_admin: bool,
    ) -> Result<User, StoreError> {
        let mut data = self.lock_data()?;
        let now = chrono::Utc::now();
        if let Some(user) = data
            .users
            .iter_mut()
            .find(|u| u.external_id == identity.external_id)
        {
            user.display_name = identity.display_name;
            user.avatar_ref = identity.avatar_ref;
            user.is_admin |= grant_admin;
            user.last_login = now;
            return Ok(user.clone());
        }
        let id = data.next_id();
        let user = User {
            id,
            external_id: identity.external_id,
            display_name: identity.display_name,
            avatar_ref: identity.avatar_ref,
            is_admin: grant_admin,
            last_login: now,
        };
        data.users.push(user.clone());
        Ok(user)
    }

    fn get_users(&mut self, auth_token: &AuthToken) -> Result<Vec<User>, StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let data = self.lock_data()?;
        let mut result = data.users.clone();
        result.sort_by_key(|u| u.id);
        Ok(result)
    }

    fn delete_user(&mut self, auth_token: &AuthToken, user_id: UserId) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let mut data = self.lock_data()?;
        if !data.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::NotExisting);
        }
        data.delete_bookings_where(|b| b.booked_by_user_id == user_id);
        data.users.retain(|u| u.id != user_id);
        Ok(())
    }

    fn grant_admin(
        &mut self,
        auth_token: &AuthToken,
        external_id: &str,
    ) -> Result<User, StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let mut data = self.lock_data()?;
        let user = data
            .users
            .iter_mut()
            .find(|u| u.external_id == external_id)
            .ok_or(StoreError::NotExisting)?;
        user.is_admin = true;
        Ok(user.clone())
    }

    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<(AuthToken, User), StoreError> {
        let data = self.lock_data()?;
        let user = data
            .users
            .iter()
            .find(|u| u.id == session_token.user_id())
            .cloned()
            .ok_or(StoreError::NotExisting)?;
        Ok((AuthToken::create_for_session(user.id, user.is_admin), user))
    }

    fn get_availability(
        &mut self,
        auth_token: &AuthToken,
        date: NaiveDate,
    ) -> Result<Vec<TableStatus>, StoreError> {
        auth_token.check_privilege(Privilege::ShowAvailability)?;
        let data = self.lock_data()?;
        let mut result: Vec<TableStatus> = data
            .tables
            .iter()
            .filter_map(|table| {
                let hall = data.halls.iter().find(|h| h.id == table.hall_id)?;
                let booking = data
                    .bookings
                    .iter()
                    .find(|b| b.table_id == table.id && b.booking_date == date)
                    .map(|b| {
                        let details = data.booking_details(b);
                        TableStatusBooking {
                            booking_id: b.id,
                            game_id: b.game_id,
                            game_name: details.game_name,
                            player_count: b.player_count,
                            booked_by_user_id: b.booked_by_user_id,
                            booked_by_username: details.booked_by_username,
                        }
                    });
                Some(TableStatus {
                    table_id: table.id,
                    table_name: table.name.clone(),
                    hall_id: hall.id,
                    hall_name: hall.name.clone(),
                    hall_closed: data
                        .hall_closures
                        .iter()
                        .any(|c| c.hall_id == hall.id && c.closed_date == date),
                    booking,
                })
            })
            .collect();
        util::sort_table_statuses(&mut result);
        Ok(result)
    }

    fn create_booking(
        &mut self,
        auth_token: &AuthToken,
        booking: NewBooking,
    ) -> Result<Booking, StoreError> {
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
        let mut data = self.lock_data()?;
        let table = data
            .tables
            .iter()
            .find(|t| t.id == booking.table_id)
            .ok_or_else(|| {
                StoreError::InvalidInputData(
                    "Booking's table must reference an existing table.".to_owned(),
                )
            })?;
        if let Some(game_id) = booking.game_id {
            if !data.games.iter().any(|g| g.id == game_id) {
                return Err(StoreError::InvalidInputData(
                    "Booking's game must be null or reference an existing game.".to_owned(),
                ));
            }
        }
        if data
            .hall_closures
            .iter()
            .any(|c| c.hall_id == table.hall_id && c.closed_date == booking.booking_date)
        {
            return Err(StoreError::HallClosed);
        }
        if data
            .bookings
            .iter()
            .any(|b| b.table_id == booking.table_id && b.booking_date == booking.booking_date)
        {
            return Err(StoreError::BookingConflict(
                BookingConflict::TableAlreadyBooked,
            ));
        }
        if self.store.policy.one_booking_per_user_per_day
            && data.bookings.iter().any(|b| {
                b.booked_by_user_id == booking.booked_by_user_id
                    && b.booking_date == booking.booking_date
            })
        {
            return Err(StoreError::BookingConflict(
                BookingConflict::UserAlreadyBooked,
            ));
        }

        let new_booking = Booking {
            id: data.next_id(),
            table_id: booking.table_id,
            booking_date: booking.booking_date,
            game_id: booking.game_id,
            player_count: booking.player_count,
            booked_by_user_id: booking.booked_by_user_id,
        };
        data.bookings.push(new_booking.clone());
        Ok(new_booking)
    }

    fn cancel_booking(
        &mut self,
        auth_token: &AuthToken,
        booking_id: BookingId,
    ) -> Result<Booking, StoreError> {
        let may_cancel_any = auth_token.has_privilege(Privilege::CancelAnyBooking);
        let mut data = self.lock_data()?;
        let position = data
            .bookings
            .iter()
            .position(|b| {
                b.id == booking_id
                    && (may_cancel_any || Some(b.booked_by_user_id) == auth_token.user_id())
            })
            .ok_or(StoreError::NotExisting)?;
        Ok(data.bookings.remove(position))
    }

    fn get_bookings_of_user(
        &mut self,
        auth_token: &AuthToken,
        user_id: UserId,
        from_date: Option<NaiveDate>,
    ) -> Result<Vec<BookingDetails>, StoreError> {
        auth_token.check_user_or_privilege(user_id, Privilege::ShowAllBookings)?;
        let data = self.lock_data()?;
        let mut result: Vec<BookingDetails> = data
            .bookings
            .iter()
            .filter(|b| b.booked_by_user_id == user_id)
            .filter(|b| from_date.map_or(true, |from| b.booking_date >= from))
            .map(|b| data.booking_details(b))
            .collect();
        util::sort_booking_details(&mut result, false);
        Ok(result)
    }

    fn get_all_bookings(&mut self, auth_token: &AuthToken) -> Result<Vec<BookingDetails>, StoreError> {
        auth_token.check_privilege(Privilege::ShowAllBookings)?;
        let data = self.lock_data()?;
        let mut result: Vec<BookingDetails> =
            data.bookings.iter().map(|b| data.booking_details(b)).collect();
        util::sort_booking_details(&mut result, true);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CliAuthTokenKey;
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    /// Create a store with hall "Main Hall", tables "A1" and "A2", game "Catan" and two users
    fn sample_store(policy: LedgerPolicy) -> (StoreMock, [UserId; 2], [TableId; 2], GameId) {
        let store = StoreMock::with_policy(policy);
        let admin = AuthToken::create_for_cli(&CliAuthTokenKey::new());
        let mut facade = store.get_facade().unwrap();
        let hall_id = facade
            .create_hall(&admin, NewHall { name: "Main Hall".to_owned() })
            .unwrap();
        let table_a1 = facade
            .create_table(&admin, NewTable { name: "A1".to_owned(), hall_id })
            .unwrap();
        let table_a2 = facade
            .create_table(&admin, NewTable { name: "A2".to_owned(), hall_id })
            .unwrap();
        let game_id = facade
            .create_game(&admin, NewGame { name: "Catan".to_owned() })
            .unwrap();
        let mut user_ids = [0; 2];
        for (i, name) in ["U1", "U2"].iter().enumerate() {
            user_ids[i] = facade
                .upsert_user(
                    ExternalIdentity {
                        external_id: format!("discord-{}", name),
                        display_name: name.to_string(),
                        avatar_ref: None,
                    },
                    false,
                )
                .unwrap()
                .id;
        }
        drop(facade);
        (store, user_ids, [table_a1, table_a2], game_id)
    }

    fn new_booking(table_id: TableId, user_id: UserId, game_id: Option<GameId>) -> NewBooking {
        NewBooking {
            table_id,
            booking_date: date("2025-07-29"),
            game_id,
            player_count: 4,
            booked_by_user_id: user_id,
        }
    }

    #[test]
    fn test_booking_conflicts() {
        let (store, [u1, u2], [a1, a2], _) = sample_store(LedgerPolicy::default());
        let mut facade = store.get_facade().unwrap();
        let token_u1 = AuthToken::create_for_session(u1, false);
        let token_u2 = AuthToken::create_for_session(u2, false);

        facade.create_booking(&token_u1, new_booking(a1, u1, None)).unwrap();
        assert!(matches!(
            facade.create_booking(&token_u2, new_booking(a1, u2, None)),
            Err(StoreError::BookingConflict(BookingConflict::TableAlreadyBooked))
        ));
        assert!(matches!(
            facade.create_booking(&token_u1, new_booking(a2, u1, None)),
            Err(StoreError::BookingConflict(BookingConflict::UserAlreadyBooked))
        ));
        facade.create_booking(&token_u2, new_booking(a2, u2, None)).unwrap();
        assert_eq!(store.data.lock().unwrap().bookings.len(), 2);
    }

    #[test]
    fn test_multiple_bookings_per_user_if_allowed() {
        let (store, [u1, _], [a1, a2], _) = sample_store(LedgerPolicy {
            one_booking_per_user_per_day: false,
            ..LedgerPolicy::default()
        });
        let mut facade = store.get_facade().unwrap();
        let token_u1 = AuthToken::create_for_session(u1, false);
        facade.create_booking(&token_u1, new_booking(a1, u1, None)).unwrap();
        facade.create_booking(&token_u1, new_booking(a2, u1, None)).unwrap();
    }

    #[test]
    fn test_enabling_one_booking_per_user_per_day() {
        let (mut store, [u1, u2], [a1, a2], _) = sample_store(LedgerPolicy {
            one_booking_per_user_per_day: false,
            ..LedgerPolicy::default()
        });
        let token_u1 = AuthToken::create_for_session(u1, false);
        let token_u2 = AuthToken::create_for_session(u2, false);
        {
            let mut facade = store.get_facade().unwrap();
            facade.create_booking(&token_u1, new_booking(a1, u1, None)).unwrap();
            facade.create_booking(&token_u1, new_booking(a2, u1, None)).unwrap();
        }
        assert_eq!(store.apply_ledger_policy().unwrap(), 0);

        store.policy = LedgerPolicy::default();
        assert_eq!(store.apply_ledger_policy().unwrap(), 1);
        let second_booking_id = store.data.lock().unwrap().bookings[1].id;
        let mut facade = store.get_facade().unwrap();
        facade.cancel_booking(&token_u1, second_booking_id).unwrap();
        assert_eq!(store.apply_ledger_policy().unwrap(), 0);
        assert!(matches!(
            facade.create_booking(&token_u1, new_booking(a2, u1, None)),
            Err(StoreError::BookingConflict(BookingConflict::UserAlreadyBooked))
        ));
        facade.create_booking(&token_u2, new_booking(a2, u2, None)).unwrap();
    }

    #[test]
    fn test_booking_for_other_user_is_denied() {
        let (store, [u1, u2], [a1, _], _) = sample_store(LedgerPolicy::default());
        let mut facade = store.get_facade().unwrap();
        assert!(matches!(
            facade.create_booking(
                &AuthToken::create_for_session(u1, false),
                new_booking(a1, u2, None)
            ),
            Err(StoreError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_concurrent_bookings_of_same_table() {
        let (store, [u1, u2], [a1, _], _) = sample_store(LedgerPolicy::default());
        let store = Arc::new(store);
        let threads: Vec<_> = [u1, u2, u1, u2]
            .into_iter()
            .map(|user_id| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut facade = store.get_facade().unwrap();
                    facade.create_booking(
                        &AuthToken::create_for_session(user_id, false),
                        new_booking(a1, user_id, None),
                    )
                })
            })
            .collect();
        let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().filter(|r| r.is_err()).all(|r| matches!(
            r,
            Err(StoreError::BookingConflict(_))
        )));
    }

    #[test]
    fn test_cancel_booking() {
        let (store, [u1, u2], [a1, _], _) = sample_store(LedgerPolicy::default());
        let mut facade = store.get_facade().unwrap();
        let token_u1 = AuthToken::create_for_session(u1, false);
        let booking = facade.create_booking(&token_u1, new_booking(a1, u1, None)).unwrap();

        assert!(matches!(
            facade.cancel_booking(&AuthToken::create_for_session(u2, false), booking.id),
            Err(StoreError::NotExisting)
        ));
        assert_eq!(facade.cancel_booking(&token_u1, booking.id).unwrap(), booking);
        assert!(matches!(
            facade.cancel_booking(&token_u1, booking.id),
            Err(StoreError::NotExisting)
        ));

        // An admin may cancel any booking
        let booking = facade.create_booking(&token_u1, new_booking(a1, u1, None)).unwrap();
        facade
            .cancel_booking(&AuthToken::create_for_session(u2, true), booking.id)
            .unwrap();
    }

    #[test]
    fn test_closed_hall() {
        let (store, [u1, _], [a1, _], _) = sample_store(LedgerPolicy::default());
        let mut facade = store.get_facade().unwrap();
        let admin = AuthToken::create_for_cli(&CliAuthTokenKey::new());
        let hall_id = facade.get_halls(&admin).unwrap()[0].id;
        let closure = HallClosure {
            hall_id,
            closed_date: date("2025-07-29"),
        };
        assert!(facade.close_hall(&admin, closure.clone()).unwrap());
        assert!(!facade.close_hall(&admin, closure.clone()).unwrap());

        let token_u1 = AuthToken::create_for_session(u1, false);
        assert!(matches!(
            facade.create_booking(&token_u1, new_booking(a1, u1, None)),
            Err(StoreError::HallClosed)
        ));
        let availability = facade.get_availability(&token_u1, date("2025-07-29")).unwrap();
        assert!(availability.iter().all(|s| s.hall_closed && !s.is_available()));

        facade.reopen_hall(&admin, closure).unwrap();
        facade.create_booking(&token_u1, new_booking(a1, u1, None)).unwrap();
    }

    #[test]
    fn test_availability() {
        let (store, [u1, _], [a1, a2], game_id) = sample_store(LedgerPolicy::default());
        let mut facade = store.get_facade().unwrap();
        let token_u1 = AuthToken::create_for_session(u1, false);
        let booking = facade
            .create_booking(&token_u1, new_booking(a2, u1, Some(game_id)))
            .unwrap();

        let availability = facade.get_availability(&token_u1, date("2025-07-29")).unwrap();
        assert_eq!(availability.len(), 2);
        assert_eq!(availability[0].table_id, a1);
        assert!(availability[0].is_available());
        assert_eq!(availability[1].table_id, a2);
        let slot = availability[1].booking.as_ref().unwrap();
        assert_eq!(slot.booking_id, booking.id);
        assert_eq!(slot.game_name.as_deref(), Some("Catan"));
        assert_eq!(slot.booked_by_username, "U1");

        let other_day = facade.get_availability(&token_u1, date("2025-08-05")).unwrap();
        assert!(other_day.iter().all(|s| s.is_available()));
    }

    #[test]
    fn test_delete_game_policies() {
        for (policy, expected_bookings) in [
            (GameDeletionPolicy::Nullify, 1),
            (GameDeletionPolicy::Cascade, 0),
        ] {
            let (store, [u1, _], [a1, _], game_id) = sample_store(LedgerPolicy {
                game_deletion: policy,
                ..LedgerPolicy::default()
            });
            let mut facade = store.get_facade().unwrap();
            facade
                .create_booking(
                    &AuthToken::create_for_session(u1, false),
                    new_booking(a1, u1, Some(game_id)),
                )
                .unwrap();
            facade
                .delete_game(&AuthToken::create_for_cli(&CliAuthTokenKey::new()), game_id)
                .unwrap();
            drop(facade);
            let data = store.data.lock().unwrap();
            assert_eq!(data.bookings.len(), expected_bookings);
            assert!(data.bookings.iter().all(|b| b.game_id.is_none()));
        }
    }

    #[test]
    fn test_upsert_user_keeps_admin_flag() {
        let (store, [u1, _], _, _) = sample_store(LedgerPolicy::default());
        let mut facade = store.get_facade().unwrap();
        let identity = ExternalIdentity {
            external_id: "discord-U1".to_owned(),
            display_name: "U1 renamed".to_owned(),
            avatar_ref: Some("abc".to_owned()),
        };
        let user = facade.upsert_user(identity.clone(), true).unwrap();
        assert_eq!(user.id, u1);
        assert!(user.is_admin);
        let user = facade.upsert_user(identity, false).unwrap();
        assert!(user.is_admin);
        assert_eq!(user.display_name, "U1 renamed");
    }
}
