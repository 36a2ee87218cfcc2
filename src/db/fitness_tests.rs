use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{FitnessTest, FitnessTestInput, TestResult, TestResultInput};

use super::{Referenced, ensure_exists};

const RESULT_SELECT: &str = "SELECT r.id, r.player_id, r.test_id, t.name AS test_name, t.unit,
        r.date, r.value, r.notes, r.created_at
    FROM test_results r JOIN tests t ON t.id = r.test_id";

#[instrument(skip(pool))]
pub async fn list_tests(pool: &Pool<Sqlite>) -> Result<Vec<FitnessTest>, AppError> {
    info!("Listing tests");
    let rows = sqlx::query_as::<_, FitnessTest>(
        "SELECT id, name, unit, description, created_at, updated_at FROM tests ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

async fn ensure_test_name_available(
    conn: &mut SqliteConnection,
    name: &str,
    except_test: Option<i64>,
) -> Result<(), AppError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM tests WHERE name = ? COLLATE NOCASE AND id IS NOT ?")
            .bind(name)
            .bind(except_test)
            .fetch_optional(&mut *conn)
            .await?;

    if existing.is_some() {
        return Err(AppError::validation(
            "name",
            format!("Test '{}' already exists", name),
        ));
    }

    Ok(())
}

#[instrument(skip(pool, input), fields(name = %input.name))]
pub async fn create_test(pool: &Pool<Sqlite>, input: &FitnessTestInput) -> Result<i64, AppError> {
    info!("Creating test");
    let name = input.name.trim();
    let mut conn = pool.acquire().await?;
    ensure_test_name_available(&mut conn, name, None).await?;

    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO tests (name, unit, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(input.unit.trim())
    .bind(input.description.trim())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, input))]
pub async fn update_test(
    pool: &Pool<Sqlite>,
    id: i64,
    input: &FitnessTestInput,
) -> Result<(), AppError> {
    info!("Updating test");
    let name = input.name.trim();
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, Referenced::FitnessTest, id).await?;
    ensure_test_name_available(&mut conn, name, Some(id)).await?;

    sqlx::query("UPDATE tests SET name = ?, unit = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(input.unit.trim())
        .bind(input.description.trim())
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Deletes a test together with every result recorded for it.
#[instrument(skip(pool))]
pub async fn delete_test(pool: &Pool<Sqlite>, id: i64) -> Result<u64, AppError> {
    info!("Deleting test");
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, Referenced::FitnessTest, id).await?;

    let deleted_results = sqlx::query("DELETE FROM test_results WHERE test_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM tests WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(deleted_results)
}

#[instrument(skip(pool))]
pub async fn list_test_results(
    pool: &Pool<Sqlite>,
    player_id: Option<i64>,
) -> Result<Vec<TestResult>, AppError> {
    info!("Listing test results");
    let mut query = QueryBuilder::<Sqlite>::new(RESULT_SELECT);
    if let Some(player_id) = player_id {
        query.push(" WHERE r.player_id = ").push_bind(player_id);
    }
    query.push(" ORDER BY r.date DESC, r.id DESC");

    let rows = query.build_query_as::<TestResult>().fetch_all(pool).await?;

    Ok(rows)
}

#[instrument(skip(pool, input), fields(player_id = input.player_id, test_id = input.test_id))]
pub async fn record_test_result(
    pool: &Pool<Sqlite>,
    input: &TestResultInput,
) -> Result<i64, AppError> {
    info!("Recording test result");
    if !input.value.is_finite() {
        return Err(AppError::validation("value", "Value must be a finite number"));
    }

    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, Referenced::Player, input.player_id).await?;
    ensure_exists(&mut conn, Referenced::FitnessTest, input.test_id).await?;

    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO test_results (player_id, test_id, date, value, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(input.player_id)
    .bind(input.test_id)
    .bind(input.date)
    .bind(input.value)
    .bind(input.notes.trim())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn delete_test_result(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting test result");
    let res = sqlx::query("DELETE FROM test_results WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Test result with id {} not found in database",
            id
        )));
    }

    Ok(())
}
