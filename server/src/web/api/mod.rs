use std::fmt::Display;

mod endpoints_auth;
mod endpoints_booking;
mod endpoints_catalog;
mod endpoints_user;

use crate::auth_session::SessionToken;
use crate::data_store::auth_token::{AuthToken, Privilege};
use crate::data_store::models::User;
use crate::data_store::{BookingConflict, StoreError, TableBookingStoreFacade};
use actix_web::error::JsonPayloadError;
use actix_web::http::header::Header;
use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    web, HttpRequest, HttpResponse,
};
use chrono::NaiveDate;
use serde_json::json;

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.service(get_api_service()).service(get_login_service());
}

fn get_api_service() -> actix_web::Scope {
    let json_config =
        web::JsonConfig::default().error_handler(|err, _req| APIError::InvalidJson(err).into());
    let query_config =
        web::QueryConfig::default().error_handler(|err, _req| APIError::InvalidQuery(err).into());
    web::scope("/api/v1")
        .app_data(json_config)
        .app_data(query_config)
        .service(endpoints_auth::get_current_user)
        .service(endpoints_auth::logout)
        .service(endpoints_booking::list_booking_dates)
        .service(endpoints_booking::get_availability)
        .service(endpoints_booking::create_booking)
        .service(endpoints_booking::cancel_booking)
        .service(endpoints_booking::list_own_bookings)
        .service(endpoints_booking::list_all_bookings)
        .service(endpoints_catalog::list_halls)
        .service(endpoints_catalog::create_hall)
        .service(endpoints_catalog::list_hall_closures)
        .service(endpoints_catalog::delete_hall)
        .service(endpoints_catalog::close_hall)
        .service(endpoints_catalog::reopen_hall)
        .service(endpoints_catalog::list_tables)
        .service(endpoints_catalog::create_table)
        .service(endpoints_catalog::delete_table)
        .service(endpoints_catalog::list_games)
        .service(endpoints_catalog::create_game)
        .service(endpoints_catalog::delete_game)
        .service(endpoints_user::list_users)
        .service(endpoints_user::delete_user)
}

/// OAuth2 login endpoints, which are visited by the browser (not called by the API client)
fn get_login_service() -> actix_web::Scope {
    web::scope("/auth")
        .service(endpoints_auth::login)
        .service(endpoints_auth::login_callback)
}

#[derive(Debug)]
pub enum APIError {
    NotExisting,
    AlreadyExisting,
    /// The entity does not exist or the client is not allowed to modify it. Both cases are not
    /// distinguished on purpose.
    NotFoundOrForbidden,
    BookingConflict(BookingConflict),
    HallClosed,
    PermissionDenied {
        required_privilege: Privilege,
    },
    NoSessionToken,
    InvalidSessionToken,
    LoginNotConfigured,
    LoginFailed(String),
    InvalidJson(actix_web::error::JsonPayloadError),
    InvalidQuery(actix_web::error::QueryPayloadError),
    InvalidData(String),
    TransactionConflict,
    StorageUnavailable(String),
    InternalError(String),
}

impl Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotExisting => f.write_str("Element does not exist")?,
            Self::AlreadyExisting => {
                f.write_str("An element with this name already exists")?;
            },
            Self::NotFoundOrForbidden => {
                f.write_str("Element does not exist or you are not allowed to change it")?;
            },
            Self::BookingConflict(conflict) => {
                write!(f, "{}", conflict)?;
            },
            Self::HallClosed => {
                f.write_str("The hall of this table is closed on the selected date.")?;
            },
            Self::PermissionDenied{required_privilege} => {
                write!(f, "Client is not authorized to perform this action. Authentication as {} is required.",
                       required_privilege
                           .qualifying_roles()
                           .iter()
                           .map(|role| role.name().to_owned())
                           .collect::<Vec<String>>()
                           .join(" or "))?;
            },
            Self::NoSessionToken => {
                f.write_str("This action requires authentication, but client did not send authentication session token.")?
            },
            Self::InvalidSessionToken => {
                f.write_str("This action requires authentication, but client authentication session given by the client is not valid.")?
            },
            Self::LoginNotConfigured => {
                f.write_str("Login is not configured on this server.")?
            },
            Self::LoginFailed(e) => {
                write!(f, "Login failed: {}", e)?;
            },
            Self::InternalError(s) => {
                f.write_str("Internal error")?;
                if cfg!(debug_assertions) {
                    write!(f, ": {}", s)?;
                }
            },
            Self::StorageUnavailable(s) => {
                f.write_str("Database is currently not available. Please retry later.")?;
                if cfg!(debug_assertions) {
                    write!(f, " ({})", s)?;
                }
            },
            Self::InvalidJson(e) => {
                write!(f, "Invalid JSON request data: {}", e)?;
            },
            Self::InvalidQuery(e) => {
                write!(f, "Invalid query parameters: {}", e)?;
            },
            Self::InvalidData(e) => {
                write!(f, "Invalid request data: {}", e)?;
            },
            Self::TransactionConflict => {
                f.write_str("Concurrent database transaction conflict. Please retry request.")?;
            },
        };
        Ok(())
    }
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse {
        let message = format!("{}", self);

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({
                "httpCode": self.status_code().as_u16(),
                "message": message
            }))
    }
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotExisting => StatusCode::NOT_FOUND,
            Self::NotFoundOrForbidden => StatusCode::NOT_FOUND,
            Self::AlreadyExisting => StatusCode::CONFLICT,
            Self::BookingConflict(_) => StatusCode::CONFLICT,
            Self::HallClosed => StatusCode::CONFLICT,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::NoSessionToken => StatusCode::UNAUTHORIZED,
            Self::InvalidSessionToken => StatusCode::UNAUTHORIZED,
            Self::LoginNotConfigured => StatusCode::NOT_IMPLEMENTED,
            Self::LoginFailed(_) => StatusCode::FORBIDDEN,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidJson(e) => match e {
                JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                JsonPayloadError::Deserialize(json_error) if json_error.is_data() => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::InvalidData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TransactionConflict => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(error) => Self::StorageUnavailable(error),
            StoreError::QueryError(diesel_error) => Self::InternalError(format!(
                "Error while executing database query: {}",
                diesel_error
            )),
            StoreError::TransactionConflict => Self::TransactionConflict,
            StoreError::NotExisting => Self::NotExisting,
            StoreError::ConflictEntityExists => Self::AlreadyExisting,
            StoreError::BookingConflict(conflict) => Self::BookingConflict(conflict),
            StoreError::HallClosed => Self::HallClosed,
            StoreError::PermissionDenied { required_privilege } => {
                Self::PermissionDenied { required_privilege }
            }
            StoreError::InvalidInputData(e) => Self::InvalidData(e),
            StoreError::InvalidDataInDatabase(e) => Self::InternalError(format!(
                "Data queried from database could not be deserialized: {}",
                e
            )),
        }
    }
}

impl From<actix_web::error::BlockingError> for APIError {
    fn from(_e: actix_web::error::BlockingError) -> Self {
        APIError::InternalError(
            "Could not get thread from thread pool for synchronous database operation.".to_owned(),
        )
    }
}

impl From<crate::auth_session::SessionError> for APIError {
    fn from(_e: crate::auth_session::SessionError) -> Self {
        APIError::InvalidSessionToken
    }
}

const SESSION_COOKIE_NAME: &str = "tablebooking_session";
const SESSION_TOKEN_MAX_AGE: std::time::Duration = std::time::Duration::from_secs(30 * 86400);

struct SessionTokenHeader(String);

impl actix_web::http::header::TryIntoHeaderValue for SessionTokenHeader {
    type Error = actix_web::http::header::InvalidHeaderValue;

    fn try_into_value(self) -> Result<actix_web::http::header::HeaderValue, Self::Error> {
        self.0.parse()
    }
}

impl Header for SessionTokenHeader {
    fn name() -> actix_web::http::header::HeaderName {
        actix_web::http::header::HeaderName::from_static("x-session-token")
    }

    fn parse<M: actix_web::HttpMessage>(msg: &M) -> Result<Self, actix_web::error::ParseError> {
        Ok(Self(
            msg.headers()
                .get(Self::name())
                .ok_or(actix_web::error::ParseError::Header)?
                .to_str()
                .map_err(|_| actix_web::error::ParseError::Header)?
                .to_owned(),
        ))
    }
}

/// Extract the client's session token from the `X-SESSION-TOKEN` header or (if not present) the
/// session cookie and validate its signature.
fn session_token_from_request(req: &HttpRequest, secret: &str) -> Result<SessionToken, APIError> {
    let raw_token = match SessionTokenHeader::parse(req) {
        Ok(header) => header.0,
        Err(_) => req
            .cookie(SESSION_COOKIE_NAME)
            .ok_or(APIError::NoSessionToken)?
            .value()
            .to_owned(),
    };
    Ok(SessionToken::from_string(
        &raw_token,
        secret,
        SESSION_TOKEN_MAX_AGE,
    )?)
}

/// Get the [AuthToken] and user for a validated session token.
///
/// A session of a user, who has been deleted in the meantime, is treated as invalid session.
fn authenticate(
    store: &mut dyn TableBookingStoreFacade,
    session_token: &SessionToken,
) -> Result<(AuthToken, User), APIError> {
    store
        .get_auth_token_for_session(session_token)
        .map_err(|e| match e {
            StoreError::NotExisting => APIError::InvalidSessionToken,
            e => e.into(),
        })
}

fn create_session_cookie(
    session_token: &SessionToken,
    secret: &str,
) -> actix_web::cookie::Cookie<'static> {
    let mut cookie =
        actix_web::cookie::Cookie::new(SESSION_COOKIE_NAME, session_token.as_string(secret));
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(actix_web::cookie::SameSite::Lax);
    cookie.set_expires(actix_web::cookie::time::OffsetDateTime::now_utc() + SESSION_TOKEN_MAX_AGE);
    cookie
}

fn parse_date(value: &str) -> Result<NaiveDate, APIError> {
    value
        .parse()
        .map_err(|_| APIError::InvalidData(format!("'{}' is not a valid date (YYYY-MM-DD)", value)))
}

fn validate_name(name: &str) -> Result<(), APIError> {
    if name.trim().is_empty() {
        return Err(APIError::InvalidData("Name must not be empty".to_owned()));
    }
    Ok(())
}
