use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn not(v: &bool) -> bool {
    !v
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Hall {
    pub id: i32,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewHall {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Table {
    pub id: i32,
    pub name: String,
    #[serde(rename = "hallId")]
    pub hall_id: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewTable {
    pub name: String,
    #[serde(rename = "hallId")]
    pub hall_id: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Game {
    pub id: i32,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewGame {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: i32,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "avatarRef")]
    pub avatar_ref: Option<String>,
    #[serde(default, skip_serializing_if = "not", rename = "isAdmin")]
    pub is_admin: bool,
}

/// Request body for creating a booking.
///
/// All fields are optional on the wire, so that missing fields can be reported with a helpful
/// message instead of a generic JSON deserialization error.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BookingRequest {
    #[serde(default, rename = "tableId")]
    pub table_id: Option<i32>,
    #[serde(default, rename = "bookingDate")]
    pub booking_date: Option<NaiveDate>,
    #[serde(default, rename = "gameId")]
    pub game_id: Option<i32>,
    #[serde(default, rename = "playerCount")]
    pub player_count: Option<i32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Booking {
    pub id: i32,
    #[serde(rename = "tableId")]
    pub table_id: i32,
    #[serde(rename = "bookingDate")]
    pub booking_date: NaiveDate,
    #[serde(default, rename = "gameId")]
    pub game_id: Option<i32>,
    #[serde(rename = "playerCount")]
    pub player_count: i32,
    #[serde(rename = "bookedByUserId")]
    pub booked_by_user_id: i32,
}

/// A booking, together with the display names of the referenced table, hall, game and user
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(rename = "hallName")]
    pub hall_name: String,
    #[serde(default, rename = "gameName")]
    pub game_name: Option<String>,
    #[serde(rename = "bookedByUsername")]
    pub booked_by_username: String,
}

/// Booking status of a single table on a specific date.
///
/// All booking-related fields are `null`, if the table is available.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TableStatus {
    #[serde(rename = "tableId")]
    pub table_id: i32,
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(rename = "hallId")]
    pub hall_id: i32,
    #[serde(rename = "hallName")]
    pub hall_name: String,
    #[serde(default, rename = "hallClosed")]
    pub hall_closed: bool,
    #[serde(default, rename = "bookingId")]
    pub booking_id: Option<i32>,
    #[serde(default, rename = "gameId")]
    pub game_id: Option<i32>,
    #[serde(default, rename = "gameName")]
    pub game_name: Option<String>,
    #[serde(default, rename = "playerCount")]
    pub player_count: Option<i32>,
    #[serde(default, rename = "bookedByUserId")]
    pub booked_by_user_id: Option<i32>,
    #[serde(default, rename = "bookedByUsername")]
    pub booked_by_username: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Availability {
    pub date: NaiveDate,
    pub tables: Vec<TableStatus>,
}

/// Response of a successful booking or cancellation, including the refreshed availability of the
/// booking date.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BookingChangeResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking: Option<Booking>,
    pub availability: Availability,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HallClosure {
    #[serde(rename = "hallId")]
    pub hall_id: i32,
    #[serde(rename = "closedDate")]
    pub closed_date: NaiveDate,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BookingDates {
    pub dates: Vec<NaiveDate>,
}

/// Catalog data file, as used for importing halls, tables and games
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Catalog {
    #[serde(default)]
    pub halls: Vec<CatalogHall>,
    #[serde(default)]
    pub games: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CatalogHall {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<String>,
}
