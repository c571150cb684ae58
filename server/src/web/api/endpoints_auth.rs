use crate::auth_session::{random_url_safe_string, SessionToken};
use crate::web::api::{
    authenticate, create_session_cookie, session_token_from_request, APIError,
    SESSION_COOKIE_NAME,
};
use crate::web::AppState;
use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::{info, warn};
use serde::Deserialize;

const OAUTH_STATE_COOKIE_NAME: &str = "tablebooking_oauth_state";
const OAUTH_STATE_MAX_AGE: actix_web::cookie::time::Duration =
    actix_web::cookie::time::Duration::minutes(10);

#[get("/me")]
async fn get_current_user(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    let user: tablebooking_api_types::User = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (_auth, user) = authenticate(store.as_mut(), &session_token)?;
        Ok(user)
    })
    .await??
    .into();

    Ok(web::Json(user))
}

#[post("/auth/logout")]
async fn logout() -> impl Responder {
    let mut cookie = Cookie::new(SESSION_COOKIE_NAME, "");
    cookie.set_path("/");
    cookie.make_removal();
    HttpResponse::NoContent().cookie(cookie).finish()
}

/// Start the OAuth2 login by redirecting the browser to Discord's authorization page
#[get("/login")]
async fn login(state: web::Data<AppState>) -> Result<impl Responder, APIError> {
    let identity_provider = state
        .identity_provider
        .as_ref()
        .ok_or(APIError::LoginNotConfigured)?;
    let oauth_state = random_url_safe_string()
        .map_err(|e| APIError::InternalError(format!("Could not generate state: {:?}", e)))?;
    let authorization_url = identity_provider
        .authorization_url(&oauth_state)
        .map_err(|e| APIError::InternalError(e.to_string()))?;

    let mut state_cookie = Cookie::new(OAUTH_STATE_COOKIE_NAME, oauth_state);
    state_cookie.set_path("/auth");
    state_cookie.set_http_only(true);
    state_cookie.set_same_site(actix_web::cookie::SameSite::Lax);
    state_cookie.set_max_age(OAUTH_STATE_MAX_AGE);
    Ok(HttpResponse::Found()
        .cookie(state_cookie)
        .append_header((header::LOCATION, authorization_url.to_string()))
        .finish())
}

#[derive(Deserialize)]
struct LoginCallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Redirect target of Discord's authorization page. Creates or updates the user and sets the
/// session cookie.
#[get("/callback")]
async fn login_callback(
    query: web::Query<LoginCallbackQuery>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let identity_provider = state
        .identity_provider
        .clone()
        .ok_or(APIError::LoginNotConfigured)?;
    let query = query.into_inner();
    if let Some(error) = query.error {
        return Err(APIError::LoginFailed(error));
    }
    let expected_state = req
        .cookie(OAUTH_STATE_COOKIE_NAME)
        .ok_or_else(|| APIError::LoginFailed("Login session expired".to_owned()))?;
    if query.state.as_deref() != Some(expected_state.value()) {
        return Err(APIError::LoginFailed("Invalid state parameter".to_owned()));
    }
    let code = query
        .code
        .ok_or_else(|| APIError::LoginFailed("Authorization code missing".to_owned()))?;

    let identity = identity_provider.identify(&code).await.map_err(|e| {
        warn!("Login via Discord failed: {}", e);
        APIError::LoginFailed("Could not identify user with Discord".to_owned())
    })?;
    let grant_admin = state.admin_identity.as_deref() == Some(identity.external_id.as_str());
    let store = state.store.clone();
    let user = web::block(move || -> Result<_, APIError> {
        let mut store = store.get_facade()?;
        Ok(store.upsert_user(identity, grant_admin)?)
    })
    .await??;
    if grant_admin {
        info!(
            "User '{}' ({}) logged in with the configured admin identity.",
            user.display_name, user.id
        );
    }
    info!("User '{}' ({}) logged in.", user.display_name, user.id);

    let mut state_cookie = Cookie::new(OAUTH_STATE_COOKIE_NAME, "");
    state_cookie.set_path("/auth");
    state_cookie.make_removal();
    Ok(HttpResponse::SeeOther()
        .cookie(create_session_cookie(
            &SessionToken::new(user.id),
            &state.secret,
        ))
        .cookie(state_cookie)
        .append_header((header::LOCATION, "/"))
        .finish())
}
