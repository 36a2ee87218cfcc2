use rocket::State;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission};
use crate::error::AppError;
use crate::reports::{DashboardReport, build_report};

/// Day boundaries follow the server's local time zone.
#[get("/dashboard")]
pub async fn api_dashboard(
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DashboardReport>, AppError> {
    caller.require(Permission::ViewDashboard)?;

    Ok(Json(build_report(db, chrono::Local::now()).await?))
}
