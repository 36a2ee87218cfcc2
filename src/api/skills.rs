use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission};
use crate::db::{
    create_skill, create_sub_skill_for_skill, detach_sub_skill, get_skill_detail, list_skills,
    update_skill, update_sub_skill,
};
use crate::error::AppError;
use crate::models::{SkillDetail, SkillInput, SubSkill, SubSkillInput};
use crate::validation::JsonValidateExt;

#[derive(FromForm)]
pub struct SkillsQueryParams {
    include_inactive: Option<bool>,
}

#[get("/skills?<params..>")]
pub async fn api_list_skills(
    params: SkillsQueryParams,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<SkillDetail>>, AppError> {
    let identity = caller.require(Permission::ViewCatalog)?;
    let include_inactive = params.include_inactive.unwrap_or(false)
        && identity.role.has_permission(Permission::ManageCatalog);

    Ok(Json(list_skills(db, include_inactive).await?))
}

#[get("/skills/<id>")]
pub async fn api_get_skill(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SkillDetail>, AppError> {
    caller.require(Permission::ViewCatalog)?;

    Ok(Json(get_skill_detail(db, id).await?))
}

#[post("/skills", data = "<skill>")]
pub async fn api_create_skill(
    skill: Json<SkillInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<SkillDetail>>, AppError> {
    caller.require(Permission::ManageCatalog)?;
    let skill = skill.validated()?;

    let id = create_skill(db, &skill).await?;

    Ok(Custom(Status::Created, Json(get_skill_detail(db, id).await?)))
}

#[put("/skills/<id>", data = "<skill>")]
pub async fn api_update_skill(
    id: i64,
    skill: Json<SkillInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SkillDetail>, AppError> {
    caller.require(Permission::ManageCatalog)?;
    let skill = skill.validated()?;

    update_skill(db, id, &skill).await?;

    Ok(Json(get_skill_detail(db, id).await?))
}

/// Creates a sub-skill under `id`, reusing an existing one with the same
/// name and difficulty.
#[post("/skills/<id>/sub_skills", data = "<sub_skill>")]
pub async fn api_add_sub_skill(
    id: i64,
    sub_skill: Json<SubSkillInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<SkillDetail>>, AppError> {
    caller.require(Permission::ManageCatalog)?;
    let sub_skill = sub_skill.validated()?;

    create_sub_skill_for_skill(db, id, &sub_skill).await?;

    Ok(Custom(Status::Created, Json(get_skill_detail(db, id).await?)))
}

#[delete("/skills/<id>/sub_skills/<sub_skill_id>")]
pub async fn api_detach_sub_skill(
    id: i64,
    sub_skill_id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SkillDetail>, AppError> {
    caller.require(Permission::ManageCatalog)?;

    detach_sub_skill(db, id, sub_skill_id).await?;

    Ok(Json(get_skill_detail(db, id).await?))
}

#[put("/sub_skills/<id>", data = "<sub_skill>")]
pub async fn api_update_sub_skill(
    id: i64,
    sub_skill: Json<SubSkillInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SubSkill>, AppError> {
    caller.require(Permission::ManageCatalog)?;
    let sub_skill = sub_skill.validated()?;

    Ok(Json(update_sub_skill(db, id, &sub_skill).await?))
}
