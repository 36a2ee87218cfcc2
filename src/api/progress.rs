use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission, RoleView, project_all, scope_player_filter};
use crate::db::{delete_progress, get_progress, list_progress, upsert_progress};
use crate::error::AppError;
use crate::models::{PlayerSkillProgress, ProgressInput};
use crate::validation::JsonValidateExt;

#[derive(FromForm)]
pub struct ProgressQueryParams {
    player_id: Option<i64>,
}

#[get("/progress?<params..>")]
pub async fn api_list_progress(
    params: ProgressQueryParams,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<RoleView<PlayerSkillProgress>>>, AppError> {
    let identity = caller.require(Permission::ViewOwnProgress)?;
    let player_id = scope_player_filter(&identity, params.player_id)?;

    let rows = list_progress(db, player_id).await?;
    Ok(Json(project_all(&identity, rows)))
}

/// Writes the (player, skill, sub-skill) row: 201 when a row was created,
/// 200 when an existing one was updated.
#[put("/progress", data = "<progress>")]
pub async fn api_upsert_progress(
    progress: Json<ProgressInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<PlayerSkillProgress>>, AppError> {
    caller.require(Permission::ManageProgress)?;
    let progress = progress.validated()?;

    let upsert = upsert_progress(db, &progress).await?;
    let row = get_progress(db, upsert.id).await?;
    let status = if upsert.created {
        Status::Created
    } else {
        Status::Ok
    };

    Ok(Custom(status, Json(row)))
}

#[delete("/progress/<id>")]
pub async fn api_delete_progress(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    caller.require(Permission::ManageProgress)?;

    delete_progress(db, id).await?;
    Ok(Status::NoContent)
}
