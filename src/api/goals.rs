use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission, scope_player_filter};
use crate::db::{GoalFilter, create_goal, delete_goal, get_goal, list_goals, update_goal};
use crate::error::AppError;
use crate::models::{Goal, GoalInput, GoalStatus};
use crate::validation::JsonValidateExt;

#[derive(FromForm)]
pub struct GoalsQueryParams {
    player_id: Option<i64>,
    status: Option<String>,
}

/// Player callers only ever see their own goals; asking for another
/// player's goals is refused rather than silently narrowed.
#[get("/goals?<params..>")]
pub async fn api_list_goals(
    params: GoalsQueryParams,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Goal>>, AppError> {
    let identity = caller.require(Permission::ViewOwnGoals)?;
    let player_id = scope_player_filter(&identity, params.player_id)?;
    let status = params
        .status
        .as_deref()
        .map(str::parse::<GoalStatus>)
        .transpose()?;

    let goals = list_goals(db, &GoalFilter { player_id, status }).await?;
    Ok(Json(goals))
}

#[post("/goals", data = "<goal>")]
pub async fn api_create_goal(
    goal: Json<GoalInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<Goal>>, AppError> {
    let identity = caller.require(Permission::ManageGoals)?;
    let goal = goal.validated()?;

    let id = create_goal(db, &goal, Some(identity.account_id)).await?;

    Ok(Custom(Status::Created, Json(get_goal(db, id).await?)))
}

#[put("/goals/<id>", data = "<goal>")]
pub async fn api_update_goal(
    id: i64,
    goal: Json<GoalInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Goal>, AppError> {
    caller.require(Permission::ManageGoals)?;
    let goal = goal.validated()?;

    update_goal(db, id, &goal).await?;

    Ok(Json(get_goal(db, id).await?))
}

#[delete("/goals/<id>")]
pub async fn api_delete_goal(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    caller.require(Permission::ManageGoals)?;

    delete_goal(db, id).await?;
    Ok(Status::NoContent)
}
