use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rocket::State;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::auth::{Caller, Permission};
use crate::error::AppError;
use crate::fixtures::{
    CatalogSeedSummary, FixtureAction, FixtureOutcome, FixtureRequest, run_fixture_action,
    seed_default_catalog,
};

#[post("/admin/fixtures", data = "<request>")]
pub async fn api_run_fixtures(
    request: Json<FixtureRequest>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<FixtureOutcome>, AppError> {
    let identity = caller.require(Permission::RunFixtures)?;
    let action = FixtureAction::try_from(&*request)?;

    info!(account_id = identity.account_id, ?action, "Running fixture action");
    let mut rng = StdRng::from_os_rng();
    let outcome = run_fixture_action(db, &mut rng, action, Utc::now()).await?;

    Ok(Json(outcome))
}

#[post("/admin/catalog/seed")]
pub async fn api_seed_catalog(
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CatalogSeedSummary>, AppError> {
    caller.require(Permission::SeedCatalog)?;

    Ok(Json(seed_default_catalog(db).await?))
}
