use crate::booking_calendar::BookingCalendar;
use crate::data_store::models::NewBooking;
use crate::data_store::{StoreError, TableBookingStoreFacade};
use crate::web::api::{authenticate, parse_date, session_token_from_request, APIError};
use crate::web::AppState;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::NaiveDate;
use log::info;
use serde::Deserialize;
use tablebooking_api_types::{Availability, BookingChangeResult, BookingDates, BookingRequest};

const DEFAULT_BOOKING_DATES_COUNT: usize = 4;

#[derive(Deserialize)]
struct BookingDatesQuery {
    count: Option<usize>,
}

#[get("/booking-dates")]
async fn list_booking_dates(
    query: web::Query<BookingDatesQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let count = query.count.unwrap_or(DEFAULT_BOOKING_DATES_COUNT);
    web::Json(BookingDates {
        dates: state
            .calendar
            .upcoming_dates(state.calendar.today(), count),
    })
}

#[get("/availability/{date}")]
async fn get_availability(
    path: web::Path<String>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let date = parse_date(&path.into_inner())?;
    let session_token = session_token_from_request(&req, &state.secret)?;
    let availability = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        load_availability(store.as_mut(), &auth, date)
    })
    .await??;

    Ok(web::Json(availability))
}

fn load_availability(
    store: &mut dyn TableBookingStoreFacade,
    auth: &crate::data_store::auth_token::AuthToken,
    date: NaiveDate,
) -> Result<Availability, APIError> {
    Ok(Availability {
        date,
        tables: store
            .get_availability(auth, date)?
            .into_iter()
            .map(|s| s.into())
            .collect(),
    })
}

/// Check the booking request for completeness and the calendar rules, before it is passed to the
/// data store
fn validate_booking_request(
    request: &BookingRequest,
    calendar: &BookingCalendar,
) -> Result<(i32, NaiveDate, i32), APIError> {
    let (Some(table_id), Some(booking_date), Some(player_count)) =
        (request.table_id, request.booking_date, request.player_count)
    else {
        return Err(APIError::InvalidData(
            "tableId, bookingDate and playerCount are required".to_owned(),
        ));
    };
    if player_count < 1 {
        return Err(APIError::InvalidData(
            "playerCount must be at least 1".to_owned(),
        ));
    }
    if !calendar.is_bookable(booking_date) {
        return Err(APIError::InvalidData(format!(
            "Tables can only be booked for the following days: {}",
            calendar.describe_allowed_days()
        )));
    }
    Ok((table_id, booking_date, player_count))
}

#[post("/bookings")]
async fn create_booking(
    data: web::Json<BookingRequest>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    let request = data.into_inner();
    let (table_id, booking_date, player_count) =
        validate_booking_request(&request, &state.calendar)?;
    let result = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, user) = authenticate(store.as_mut(), &session_token)?;
        let booking = store
            .create_booking(
                &auth,
                NewBooking {
                    table_id,
                    booking_date,
                    game_id: request.game_id,
                    player_count,
                    booked_by_user_id: user.id,
                },
            )
            .map_err(|e| {
                if let StoreError::BookingConflict(conflict) = &e {
                    info!(
                        "Rejected booking of table {} on {} by user {}: {:?}",
                        table_id, booking_date, user.id, conflict
                    );
                }
                e
            })?;
        info!(
            "User {} booked table {} on {} (booking {})",
            user.id, table_id, booking_date, booking.id
        );
        Ok(BookingChangeResult {
            availability: load_availability(store.as_mut(), &auth, booking_date)?,
            booking: Some(booking.into()),
        })
    })
    .await??;

    Ok(HttpResponse::Created().json(result))
}

#[delete("/bookings/{booking_id}")]
async fn cancel_booking(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let booking_id = path.into_inner();
    let session_token = session_token_from_request(&req, &state.secret)?;
    let result = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, user) = authenticate(store.as_mut(), &session_token)?;
        let booking = store
            .cancel_booking(&auth, booking_id)
            .map_err(|e| match e {
                StoreError::NotExisting => APIError::NotFoundOrForbidden,
                e => e.into(),
            })?;
        info!(
            "User {} cancelled booking {} of table {} on {}",
            user.id, booking.id, booking.table_id, booking.booking_date
        );
        Ok(BookingChangeResult {
            availability: load_availability(store.as_mut(), &auth, booking.booking_date)?,
            booking: Some(booking.into()),
        })
    })
    .await??;

    Ok(web::Json(result))
}

#[derive(Deserialize)]
struct OwnBookingsQuery {
    #[serde(default, rename = "includePast")]
    include_past: bool,
}

#[get("/me/bookings")]
async fn list_own_bookings(
    query: web::Query<OwnBookingsQuery>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    let from_date = if query.include_past {
        None
    } else {
        Some(state.calendar.today())
    };
    let bookings: Vec<tablebooking_api_types::BookingDetails> =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            let (auth, user) = authenticate(store.as_mut(), &session_token)?;
            Ok(store.get_bookings_of_user(&auth, user.id, from_date)?)
        })
        .await??
        .into_iter()
        .map(|b| b.into())
        .collect();

    Ok(web::Json(bookings))
}

#[get("/bookings")]
async fn list_all_bookings(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    let bookings: Vec<tablebooking_api_types::BookingDetails> =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
            Ok(store.get_all_bookings(&auth)?)
        })
        .await??
        .into_iter()
        .map(|b| b.into())
        .collect();

    Ok(web::Json(bookings))
}
