use crate::data_store::{BookingId, GameId, HallId, TableId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;

#[derive(Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name=super::schema::halls)]
pub struct Hall {
    pub id: HallId,
    pub name: String,
}

impl From<Hall> for tablebooking_api_types::Hall {
    fn from(value: Hall) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::halls)]
pub struct NewHall {
    pub name: String,
}

impl From<tablebooking_api_types::NewHall> for NewHall {
    fn from(value: tablebooking_api_types::NewHall) -> Self {
        Self {
            name: value.name.trim().to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name=super::schema::tables)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub hall_id: HallId,
}

impl From<Table> for tablebooking_api_types::Table {
    fn from(value: Table) -> Self {
        Self {
            id: value.id,
            name: value.name,
            hall_id: value.hall_id,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::tables)]
pub struct NewTable {
    pub name: String,
    pub hall_id: HallId,
}

impl From<tablebooking_api_types::NewTable> for NewTable {
    fn from(value: tablebooking_api_types::NewTable) -> Self {
        Self {
            name: value.name.trim().to_owned(),
            hall_id: value.hall_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name=super::schema::games)]
pub struct Game {
    pub id: GameId,
    pub name: String,
}

impl From<Game> for tablebooking_api_types::Game {
    fn from(value: Game) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::games)]
pub struct NewGame {
    pub name: String,
}

impl From<tablebooking_api_types::NewGame> for NewGame {
    fn from(value: tablebooking_api_types::NewGame) -> Self {
        Self {
            name: value.name.trim().to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name=super::schema::users)]
pub struct User {
    pub id: UserId,
    pub external_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub is_admin: bool,
    pub last_login: DateTime<Utc>,
}

impl From<User> for tablebooking_api_types::User {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            avatar_ref: value.avatar_ref,
            is_admin: value.is_admin,
        }
    }
}

/// A user identity, as provided by the external identity provider on login
#[derive(Clone, Debug, PartialEq, Insertable)]
#[diesel(table_name=super::schema::users)]
pub struct ExternalIdentity {
    pub external_id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name=super::schema::bookings)]
pub struct Booking {
    pub id: BookingId,
    pub table_id: TableId,
    pub booking_date: NaiveDate,
    pub game_id: Option<GameId>,
    pub player_count: i32,
    pub booked_by_user_id: UserId,
}

impl From<Booking> for tablebooking_api_types::Booking {
    fn from(value: Booking) -> Self {
        Self {
            id: value.id,
            table_id: value.table_id,
            booking_date: value.booking_date,
            game_id: value.game_id,
            player_count: value.player_count,
            booked_by_user_id: value.booked_by_user_id,
        }
    }
}

/// A validated booking request, to be passed to
/// [crate::data_store::TableBookingStoreFacade::create_booking]
#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::bookings)]
pub struct NewBooking {
    pub table_id: TableId,
    pub booking_date: NaiveDate,
    pub game_id: Option<GameId>,
    pub player_count: i32,
    pub booked_by_user_id: UserId,
}

/// A booking together with the names of the referenced entities
#[derive(Clone, Debug, PartialEq)]
pub struct BookingDetails {
    pub booking: Booking,
    pub table_name: String,
    pub hall_name: String,
    pub game_name: Option<String>,
    pub booked_by_username: String,
}

impl From<BookingDetails> for tablebooking_api_types::BookingDetails {
    fn from(value: BookingDetails) -> Self {
        Self {
            booking: value.booking.into(),
            table_name: value.table_name,
            hall_name: value.hall_name,
            game_name: value.game_name,
            booked_by_username: value.booked_by_username,
        }
    }
}

/// The booking slot of one table on a specific date, as returned by
/// [crate::data_store::TableBookingStoreFacade::get_availability]
#[derive(Clone, Debug, PartialEq)]
pub struct TableStatus {
    pub table_id: TableId,
    pub table_name: String,
    pub hall_id: HallId,
    pub hall_name: String,
    pub hall_closed: bool,
    pub booking: Option<TableStatusBooking>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableStatusBooking {
    pub booking_id: BookingId,
    pub game_id: Option<GameId>,
    pub game_name: Option<String>,
    pub player_count: i32,
    pub booked_by_user_id: UserId,
    pub booked_by_username: String,
}

impl TableStatus {
    pub fn is_available(&self) -> bool {
        self.booking.is_none() && !self.hall_closed
    }
}

impl From<TableStatus> for tablebooking_api_types::TableStatus {
    fn from(value: TableStatus) -> Self {
        let booking = value.booking;
        Self {
            table_id: value.table_id,
            table_name: value.table_name,
            hall_id: value.hall_id,
            hall_name: value.hall_name,
            hall_closed: value.hall_closed,
            booking_id: booking.as_ref().map(|b| b.booking_id),
            game_id: booking.as_ref().and_then(|b| b.game_id),
            game_name: booking.as_ref().and_then(|b| b.game_name.clone()),
            player_count: booking.as_ref().map(|b| b.player_count),
            booked_by_user_id: booking.as_ref().map(|b| b.booked_by_user_id),
            booked_by_username: booking.map(|b| b.booked_by_username),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name=super::schema::hall_closures)]
pub struct HallClosure {
    pub hall_id: HallId,
    pub closed_date: NaiveDate,
}

impl From<HallClosure> for tablebooking_api_types::HallClosure {
    fn from(value: HallClosure) -> Self {
        Self {
            hall_id: value.hall_id,
            closed_date: value.closed_date,
        }
    }
}
