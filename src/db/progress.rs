use chrono::Utc;
use serde::Serialize;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{PlayerSkillProgress, ProgressInput, ProgressStatus};

use super::{Referenced, ensure_exists, ensure_skill_reference};

const PROGRESS_SELECT: &str = "SELECT psp.id, psp.player_id, psp.skill_id, s.name AS skill_name,
        psp.sub_skill_id, ss.name AS sub_skill_name, psp.planned_date, psp.done_date,
        psp.status, psp.notes, psp.created_at, psp.updated_at
    FROM player_skill_progress psp
    JOIN skills s ON s.id = psp.skill_id
    LEFT JOIN sub_skills ss ON ss.id = psp.sub_skill_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressUpsert {
    pub id: i64,
    pub created: bool,
}

#[instrument(skip(pool))]
pub async fn list_progress(
    pool: &Pool<Sqlite>,
    player_id: Option<i64>,
) -> Result<Vec<PlayerSkillProgress>, AppError> {
    info!("Listing player skill progress");
    let mut query = QueryBuilder::<Sqlite>::new(PROGRESS_SELECT);
    if let Some(player_id) = player_id {
        query.push(" WHERE psp.player_id = ").push_bind(player_id);
    }
    query.push(" ORDER BY psp.player_id, s.name, psp.sub_skill_id IS NOT NULL, ss.name");

    let rows = query
        .build_query_as::<PlayerSkillProgress>()
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn get_progress(pool: &Pool<Sqlite>, id: i64) -> Result<PlayerSkillProgress, AppError> {
    let sql = format!("{} WHERE psp.id = ?", PROGRESS_SELECT);
    let row = sqlx::query_as::<_, PlayerSkillProgress>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| {
        AppError::NotFound(format!("Progress entry with id {} not found in database", id))
    })
}

/// Writes one progress row keyed by (player, skill, sub-skill).
///
/// References are not checked here; callers that take ids from outside use
/// [`upsert_progress`]. A `done` row without a done date is stamped with
/// today.
pub async fn upsert_progress_row(
    conn: &mut SqliteConnection,
    input: &ProgressInput,
) -> Result<ProgressUpsert, AppError> {
    let now = Utc::now();
    let done_date = match (input.status, input.done_date) {
        (ProgressStatus::Done, None) => Some(now.date_naive()),
        (_, done_date) => done_date,
    };

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM player_skill_progress WHERE player_id = ? AND skill_id = ? AND sub_skill_id IS ?",
    )
    .bind(input.player_id)
    .bind(input.skill_id)
    .bind(input.sub_skill_id)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE player_skill_progress
                 SET status = ?, planned_date = ?, done_date = ?, notes = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(input.status)
            .bind(input.planned_date)
            .bind(done_date)
            .bind(&input.notes)
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await?;

            Ok(ProgressUpsert { id, created: false })
        }
        None => {
            let res = sqlx::query(
                "INSERT INTO player_skill_progress (player_id, skill_id, sub_skill_id, planned_date, done_date, status, notes, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(input.player_id)
            .bind(input.skill_id)
            .bind(input.sub_skill_id)
            .bind(input.planned_date)
            .bind(done_date)
            .bind(input.status)
            .bind(&input.notes)
            .bind(now)
            .bind(now)
            .execute(&mut *conn)
            .await?;

            Ok(ProgressUpsert {
                id: res.last_insert_rowid(),
                created: true,
            })
        }
    }
}

#[instrument(skip(pool, input), fields(player_id = input.player_id, skill_id = input.skill_id, sub_skill_id = ?input.sub_skill_id))]
pub async fn upsert_progress(
    pool: &Pool<Sqlite>,
    input: &ProgressInput,
) -> Result<ProgressUpsert, AppError> {
    info!("Upserting player skill progress");
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, Referenced::Player, input.player_id).await?;
    ensure_skill_reference(&mut tx, input.skill_id, input.sub_skill_id).await?;

    let upsert = upsert_progress_row(&mut tx, input).await?;
    tx.commit().await?;

    info!(id = upsert.id, created = upsert.created, "Progress stored");
    Ok(upsert)
}

#[instrument(skip(pool))]
pub async fn delete_progress(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting player skill progress");
    let res = sqlx::query("DELETE FROM player_skill_progress WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Progress entry with id {} not found in database",
            id
        )));
    }

    Ok(())
}
