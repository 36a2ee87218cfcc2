use chrono::Utc;
use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission, ensure_player_access, scope_player_filter};
use crate::db::{
    PlayerDeletion, PlayerFilter, create_player, delete_player, get_player_detail, list_players,
    resolve_player_references, update_player,
};
use crate::error::AppError;
use crate::models::{PlayerDetail, PlayerInput};
use crate::validation::JsonValidateExt;

#[derive(FromForm)]
pub struct PlayersQueryParams {
    club: Option<String>,
    include_inactive: Option<bool>,
}

#[get("/players?<params..>")]
pub async fn api_list_players(
    params: PlayersQueryParams,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<PlayerDetail>>, AppError> {
    let identity = caller.require(Permission::ViewOwnPlayer)?;
    let player_id = scope_player_filter(&identity, None)?;

    let filter = PlayerFilter {
        player_id,
        club: params.club,
        include_inactive: player_id.is_some()
            || (params.include_inactive.unwrap_or(false)
                && identity.role.has_permission(Permission::ViewAllPlayers)),
    };

    let players = list_players(db, &filter).await?;
    let details = resolve_player_references(db, players).await?;

    Ok(Json(details))
}

#[get("/players/<id>")]
pub async fn api_get_player(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PlayerDetail>, AppError> {
    let identity = caller.require(Permission::ViewOwnPlayer)?;
    ensure_player_access(&identity, id)?;

    Ok(Json(get_player_detail(db, id).await?))
}

#[post("/players", data = "<player>")]
pub async fn api_create_player(
    player: Json<PlayerInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<PlayerDetail>>, AppError> {
    caller.require(Permission::ManagePlayers)?;
    let player = player.validated()?;

    let id = create_player(db, &player).await?;
    let detail = get_player_detail(db, id).await?;

    Ok(Custom(Status::Created, Json(detail)))
}

#[put("/players/<id>", data = "<player>")]
pub async fn api_update_player(
    id: i64,
    player: Json<PlayerInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PlayerDetail>, AppError> {
    caller.require(Permission::ManagePlayers)?;
    let player = player.validated()?;

    update_player(db, id, &player).await?;

    Ok(Json(get_player_detail(db, id).await?))
}

#[delete("/players/<id>")]
pub async fn api_delete_player(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PlayerDeletion>, AppError> {
    caller.require(Permission::DeletePlayers)?;

    Ok(Json(delete_player(db, id, Utc::now()).await?))
}
