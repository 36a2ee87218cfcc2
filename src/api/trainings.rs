use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{
    Caller, Permission, RoleView, can_access_player, project, project_all, scope_player_filter,
};
use crate::db::{
    TrainingFilter, create_training, delete_training, get_training, list_trainings, update_training,
};
use crate::error::AppError;
use crate::models::{TrainingInput, TrainingSessionView};
use crate::validation::JsonValidateExt;

#[derive(FromForm)]
pub struct TrainingsQueryParams {
    player_id: Option<i64>,
}

#[get("/trainings?<params..>")]
pub async fn api_list_trainings(
    params: TrainingsQueryParams,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<RoleView<TrainingSessionView>>>, AppError> {
    let identity = caller.require(Permission::ViewOwnTrainings)?;
    let player_id = scope_player_filter(&identity, params.player_id)?;

    let sessions = list_trainings(db, &TrainingFilter { player_id }).await?;

    Ok(Json(project_all(&identity, sessions)))
}

#[get("/trainings/<id>")]
pub async fn api_get_training(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<RoleView<TrainingSessionView>>, AppError> {
    let identity = caller.require(Permission::ViewOwnTrainings)?;

    let session = get_training(db, id).await?;
    if !session
        .players
        .iter()
        .any(|player| can_access_player(&caller, player.id))
    {
        return Err(AppError::Forbidden(format!(
            "account {} did not take part in training {}",
            identity.account_id, id
        )));
    }

    Ok(Json(project(&identity, session)))
}

/// Trainer and admin callers are recorded as the session's trainer when the
/// body names none.
#[post("/trainings", data = "<training>")]
pub async fn api_create_training(
    training: Json<TrainingInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<TrainingSessionView>>, AppError> {
    let identity = caller.require(Permission::ManageTrainings)?;
    let mut training = training.validated()?;

    if training.trainer_id.is_none() && identity.role.can_coach() {
        training.trainer_id = Some(identity.account_id);
    }

    let id = create_training(db, &training).await?;

    Ok(Custom(Status::Created, Json(get_training(db, id).await?)))
}

#[put("/trainings/<id>", data = "<training>")]
pub async fn api_update_training(
    id: i64,
    training: Json<TrainingInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<TrainingSessionView>, AppError> {
    caller.require(Permission::ManageTrainings)?;
    let training = training.validated()?;

    update_training(db, id, &training).await?;

    Ok(Json(get_training(db, id).await?))
}

#[delete("/trainings/<id>")]
pub async fn api_delete_training(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    caller.require(Permission::ManageTrainings)?;

    delete_training(db, id).await?;
    Ok(Status::NoContent)
}
