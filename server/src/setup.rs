use crate::booking_calendar::BookingCalendar;
use crate::data_store::{GameDeletionPolicy, LedgerPolicy};
use std::env;
use std::env::VarError;
use std::fmt::{Display, Formatter};

/// Get the database URL from the environment variable.
pub fn get_database_url_from_env() -> Result<String, SetupError> {
    env::var("DATABASE_URL").map_err(|e| SetupError::from_env_error(e, "DATABASE_URL"))
}

/// Get the cryptographic application secret for signing session tokens from the environment
/// variable.
pub fn get_secret_from_env() -> Result<String, SetupError> {
    env::var("SECRET").map_err(|e| SetupError::from_env_error(e, "SECRET"))
}

/// Get the web server TCP listening port from the environment variable
pub fn get_listen_port_from_env() -> Result<u16, SetupError> {
    env::var("LISTEN_PORT")
        .map_err(|e| SetupError::from_env_error(e, "LISTEN_PORT"))
        .and_then(|v| {
            v.parse().map_err(|_| SetupError::EnvVariableInvalid {
                variable_name: "LISTEN_PORT",
                problem: "Not a valid uint16",
            })
        })
}

/// Get the web server TCP listening interface address from the environment variable
pub fn get_listen_address_from_env() -> Result<String, SetupError> {
    env::var("LISTEN_ADDRESS").map_err(|e| SetupError::from_env_error(e, "LISTEN_ADDRESS"))
}

/// Settings for the OAuth2 login via Discord
#[derive(Clone, Debug)]
pub struct DiscordSettings {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: url::Url,
}

/// Get the Discord OAuth2 client settings from the environment variables.
///
/// Returns `Ok(None)` if none of the variables is defined, which disables login. If only some of
/// them are defined, an error is returned.
pub fn get_discord_settings_from_env() -> Result<Option<DiscordSettings>, SetupError> {
    let client_id = optional_env_var("DISCORD_CLIENT_ID")?;
    let client_secret = optional_env_var("DISCORD_CLIENT_SECRET")?;
    let callback_url = optional_env_var("DISCORD_CALLBACK_URL")?;
    match (client_id, client_secret, callback_url) {
        (None, None, None) => Ok(None),
        (Some(client_id), Some(client_secret), Some(callback_url)) => Ok(Some(DiscordSettings {
            client_id,
            client_secret,
            callback_url: callback_url
                .parse()
                .map_err(|_| SetupError::EnvVariableInvalid {
                    variable_name: "DISCORD_CALLBACK_URL",
                    problem: "Not a valid URL",
                })?,
        })),
        (None, _, _) => Err(SetupError::EnvVariableMissing {
            variable_name: "DISCORD_CLIENT_ID",
        }),
        (_, None, _) => Err(SetupError::EnvVariableMissing {
            variable_name: "DISCORD_CLIENT_SECRET",
        }),
        (_, _, None) => Err(SetupError::EnvVariableMissing {
            variable_name: "DISCORD_CALLBACK_URL",
        }),
    }
}

/// Get the external identity id (e.g. Discord user id) of the user, who shall be elevated to admin
/// on login.
pub fn get_admin_identity_from_env() -> Result<Option<String>, SetupError> {
    optional_env_var("ADMIN_IDENTITY")
}

/// Get the booking ledger's invariant policy from the environment variables
/// `BOOKING_ONE_PER_USER_PER_DAY` (default: true) and `GAME_DELETION_POLICY` (default: nullify).
///
/// When `BOOKING_ONE_PER_USER_PER_DAY` is switched on for a database with existing bookings, the
/// `serve` command adjusts these bookings on startup (see
/// [crate::data_store::TableBookingStore::apply_ledger_policy]).
pub fn get_ledger_policy_from_env() -> Result<LedgerPolicy, SetupError> {
    let one_booking_per_user_per_day = optional_env_var("BOOKING_ONE_PER_USER_PER_DAY")?
        .map(|v| parse_bool(&v, "BOOKING_ONE_PER_USER_PER_DAY"))
        .transpose()?
        .unwrap_or(true);
    let game_deletion = optional_env_var("GAME_DELETION_POLICY")?
        .map(|v| {
            v.parse().map_err(|_| SetupError::EnvVariableInvalid {
                variable_name: "GAME_DELETION_POLICY",
                problem: "must be 'nullify' or 'cascade'",
            })
        })
        .transpose()?
        .unwrap_or(GameDeletionPolicy::Nullify);
    Ok(LedgerPolicy {
        one_booking_per_user_per_day,
        game_deletion,
    })
}

/// Get the calendar of bookable days from the environment variables `BOOKING_WEEKDAYS` (default:
/// "Tue") and `TIMEZONE` (default: UTC).
pub fn get_booking_calendar_from_env() -> Result<BookingCalendar, SetupError> {
    let weekdays = optional_env_var("BOOKING_WEEKDAYS")?.unwrap_or_else(|| "Tue".to_owned());
    let timezone = optional_env_var("TIMEZONE")?
        .map(|v| {
            v.parse::<chrono_tz::Tz>()
                .map_err(|_| SetupError::EnvVariableInvalid {
                    variable_name: "TIMEZONE",
                    problem: "Not a known IANA timezone name",
                })
        })
        .transpose()?
        .unwrap_or(chrono_tz::UTC);
    BookingCalendar::from_weekday_list(&weekdays, timezone).map_err(|_| {
        SetupError::EnvVariableInvalid {
            variable_name: "BOOKING_WEEKDAYS",
            problem: "must be 'any' or a comma-separated list of weekdays (e.g. 'Tue,Thu')",
        }
    })
}

fn optional_env_var(variable_name: &'static str) -> Result<Option<String>, SetupError> {
    match env::var(variable_name) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(SetupError::from_env_error(e, variable_name)),
    }
}

fn parse_bool(value: &str, variable_name: &'static str) -> Result<bool, SetupError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SetupError::EnvVariableInvalid {
            variable_name,
            problem: "Not a valid boolean",
        }),
    }
}

#[derive(Debug)]
pub enum SetupError {
    EnvVariableMissing {
        variable_name: &'static str,
    },
    EnvVariableInvalid {
        variable_name: &'static str,
        problem: &'static str,
    },
}

impl SetupError {
    fn from_env_error(error: VarError, variable_name: &'static str) -> Self {
        match error {
            VarError::NotPresent => Self::EnvVariableMissing { variable_name },
            VarError::NotUnicode(_) => Self::EnvVariableInvalid {
                variable_name,
                problem: "no valid unicode",
            },
        }
    }
}

impl Display for SetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::EnvVariableMissing { variable_name } => {
                write!(f, "Environment variable {} must be defined", variable_name)
            }
            SetupError::EnvVariableInvalid {
                variable_name,
                problem,
            } => write!(
                f,
                "Value of environment variable {} is invalid: {}",
                variable_name, problem
            ),
        }
    }
}
