use crate::data_store::models::{HallClosure, NewGame, NewHall, NewTable};
use crate::web::api::{
    authenticate, parse_date, session_token_from_request, validate_name, APIError,
};
use crate::web::AppState;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use log::info;
use tablebooking_api_types::{Game, Hall, Table};

#[get("/halls")]
async fn list_halls(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    let halls: Vec<Hall> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_halls(&auth)?)
    })
    .await??
    .into_iter()
    .map(|h| h.into())
    .collect();

    Ok(web::Json(halls))
}

#[post("/halls")]
async fn create_hall(
    data: web::Json<tablebooking_api_types::NewHall>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    validate_name(&data.name)?;
    let hall = NewHall::from(data.into_inner());
    let name = hall.name.clone();
    let id = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        Ok(store.create_hall(&auth, hall)?)
    })
    .await??;
    info!("Created hall '{}' ({})", name, id);

    Ok(HttpResponse::Created().json(Hall { id, name }))
}

#[delete("/halls/{hall_id}")]
async fn delete_hall(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let hall_id = path.into_inner();
    let session_token = session_token_from_request(&req, &state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        store.delete_hall(&auth, hall_id)?;
        Ok(())
    })
    .await??;
    info!("Deleted hall {} with its tables and their bookings", hall_id);

    Ok(HttpResponse::NoContent())
}

#[get("/halls/closures/{date}")]
async fn list_hall_closures(
    path: web::Path<String>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let date = parse_date(&path.into_inner())?;
    let session_token = session_token_from_request(&req, &state.secret)?;
    let closures: Vec<tablebooking_api_types::HallClosure> =
        web::block(move || -> Result<_, APIError> {
            let mut store = state.store.get_facade()?;
            let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
            Ok(store.get_hall_closures(&auth, date)?)
        })
        .await??
        .into_iter()
        .map(|c| c.into())
        .collect();

    Ok(web::Json(closures))
}

#[put("/halls/{hall_id}/closures/{date}")]
async fn close_hall(
    path: web::Path<(i32, String)>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let (hall_id, date) = path.into_inner();
    let closed_date = parse_date(&date)?;
    let session_token = session_token_from_request(&req, &state.secret)?;
    let created = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        Ok(store.close_hall(
            &auth,
            HallClosure {
                hall_id,
                closed_date,
            },
        )?)
    })
    .await??;

    if created {
        info!("Closed hall {} on {}", hall_id, closed_date);
        Ok(HttpResponse::Created())
    } else {
        Ok(HttpResponse::NoContent())
    }
}

#[delete("/halls/{hall_id}/closures/{date}")]
async fn reopen_hall(
    path: web::Path<(i32, String)>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let (hall_id, date) = path.into_inner();
    let closed_date = parse_date(&date)?;
    let session_token = session_token_from_request(&req, &state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        store.reopen_hall(
            &auth,
            HallClosure {
                hall_id,
                closed_date,
            },
        )?;
        Ok(())
    })
    .await??;
    info!("Reopened hall {} on {}", hall_id, closed_date);

    Ok(HttpResponse::NoContent())
}

#[get("/tables")]
async fn list_tables(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    let tables: Vec<Table> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_tables(&auth)?)
    })
    .await??
    .into_iter()
    .map(|t| t.into())
    .collect();

    Ok(web::Json(tables))
}

#[post("/tables")]
async fn create_table(
    data: web::Json<tablebooking_api_types::NewTable>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    validate_name(&data.name)?;
    let table = NewTable::from(data.into_inner());
    let (name, hall_id) = (table.name.clone(), table.hall_id);
    let id = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        Ok(store.create_table(&auth, table)?)
    })
    .await??;
    info!("Created table '{}' ({}) in hall {}", name, id, hall_id);

    Ok(HttpResponse::Created().json(Table { id, name, hall_id }))
}

#[delete("/tables/{table_id}")]
async fn delete_table(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let table_id = path.into_inner();
    let session_token = session_token_from_request(&req, &state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        store.delete_table(&auth, table_id)?;
        Ok(())
    })
    .await??;
    info!("Deleted table {} with its bookings", table_id);

    Ok(HttpResponse::NoContent())
}

#[get("/games")]
async fn list_games(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    let games: Vec<Game> = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        Ok(store.get_games(&auth)?)
    })
    .await??
    .into_iter()
    .map(|g| g.into())
    .collect();

    Ok(web::Json(games))
}

#[post("/games")]
async fn create_game(
    data: web::Json<tablebooking_api_types::NewGame>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let session_token = session_token_from_request(&req, &state.secret)?;
    validate_name(&data.name)?;
    let game = NewGame::from(data.into_inner());
    let name = game.name.clone();
    let id = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        Ok(store.create_game(&auth, game)?)
    })
    .await??;
    info!("Created game '{}' ({})", name, id);

    Ok(HttpResponse::Created().json(Game { id, name }))
}

#[delete("/games/{game_id}")]
async fn delete_game(
    path: web::Path<i32>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, APIError> {
    let game_id = path.into_inner();
    let session_token = session_token_from_request(&req, &state.secret)?;
    web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let (auth, _user) = authenticate(store.as_mut(), &session_token)?;
        store.delete_game(&auth, game_id)?;
        Ok(())
    })
    .await??;
    info!("Deleted game {}", game_id);

    Ok(HttpResponse::NoContent())
}
