use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission, RoleView, project_all, scope_player_filter};
use crate::db::{
    create_test, delete_test, delete_test_result, list_test_results, list_tests,
    record_test_result, update_test,
};
use crate::error::AppError;
use crate::models::{FitnessTest, FitnessTestInput, TestResult, TestResultInput};
use crate::validation::JsonValidateExt;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestDeletionResponse {
    pub deleted_test_results: u64,
}

#[get("/tests")]
pub async fn api_list_tests(
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<FitnessTest>>, AppError> {
    caller.require(Permission::ViewCatalog)?;

    Ok(Json(list_tests(db).await?))
}

#[post("/tests", data = "<test>")]
pub async fn api_create_test(
    test: Json<FitnessTestInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<CreatedResponse>>, AppError> {
    caller.require(Permission::ManageCatalog)?;
    let test = test.validated()?;

    let id = create_test(db, &test).await?;
    Ok(Custom(Status::Created, Json(CreatedResponse { id })))
}

#[put("/tests/<id>", data = "<test>")]
pub async fn api_update_test(
    id: i64,
    test: Json<FitnessTestInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    caller.require(Permission::ManageCatalog)?;
    let test = test.validated()?;

    update_test(db, id, &test).await?;
    Ok(Status::NoContent)
}

/// Deleting a test removes every result recorded against it.
#[delete("/tests/<id>")]
pub async fn api_delete_test(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<TestDeletionResponse>, AppError> {
    caller.require(Permission::ManageCatalog)?;

    let deleted_test_results = delete_test(db, id).await?;
    Ok(Json(TestDeletionResponse {
        deleted_test_results,
    }))
}

#[derive(FromForm)]
pub struct TestResultsQueryParams {
    player_id: Option<i64>,
}

#[get("/test_results?<params..>")]
pub async fn api_list_test_results(
    params: TestResultsQueryParams,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<RoleView<TestResult>>>, AppError> {
    let identity = caller.require(Permission::ViewOwnTestResults)?;
    let player_id = scope_player_filter(&identity, params.player_id)?;

    let results = list_test_results(db, player_id).await?;
    Ok(Json(project_all(&identity, results)))
}

#[post("/test_results", data = "<result>")]
pub async fn api_record_test_result(
    result: Json<TestResultInput>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<CreatedResponse>>, AppError> {
    caller.require(Permission::ManageTestResults)?;
    let result = result.validated()?;

    let id = record_test_result(db, &result).await?;
    Ok(Custom(Status::Created, Json(CreatedResponse { id })))
}

#[delete("/test_results/<id>")]
pub async fn api_delete_test_result(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    caller.require(Permission::ManageTestResults)?;

    delete_test_result(db, id).await?;
    Ok(Status::NoContent)
}
