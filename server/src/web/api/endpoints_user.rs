use crate::web::api::{authenticate, session_token_from_request, APIError};
use crate::web::AppState;
use actix_web::{delete, get, web, HttpRequest, HttpResponse, Responder};
use log::info;

#[get("/users")]
async fn list_users(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    let users: Vec<tablebooking_api_types::User> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_users(&auth)?)
    })
    .await??
    .into_iter()
    .map(|u| u.into())
    .collect();

    Ok(web::Json(users))
}

#[delete("/users/{user_id}")]
async fn delete_user(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let user_id = path.into_inner();
    let session_token = session_token_from_request(&req, &state.secret)?;
    let admin_id = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, admin) = authenticate(store.as_mut(), &session_token)?;
        store.delete_user(&auth, user_id)?;
        Ok(admin.id)
    })
    .await??;
    info!(
        "User {} and their bookings have been deleted by admin {}",
        user_id, admin_id
    );

    Ok(HttpResponse::NoContent())
}
