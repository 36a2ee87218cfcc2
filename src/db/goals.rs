use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{Goal, GoalInput, GoalStatus};

use super::{Referenced, ensure_exists, ensure_skill_reference};

const GOAL_SELECT: &str = "SELECT g.id, g.player_id, g.title, g.description, g.due_date, g.status,
        g.skill_id, s.name AS skill_name, g.sub_skill_id, ss.name AS sub_skill_name,
        g.created_by, g.created_at, g.updated_at
    FROM goals g
    LEFT JOIN skills s ON s.id = g.skill_id
    LEFT JOIN sub_skills ss ON ss.id = g.sub_skill_id";

#[derive(Debug, Clone, Default)]
pub struct GoalFilter {
    pub player_id: Option<i64>,
    pub status: Option<GoalStatus>,
}

#[instrument(skip(pool))]
pub async fn list_goals(pool: &Pool<Sqlite>, filter: &GoalFilter) -> Result<Vec<Goal>, AppError> {
    info!("Listing goals");
    let mut query = QueryBuilder::<Sqlite>::new(GOAL_SELECT);
    query.push(" WHERE 1 = 1");
    if let Some(player_id) = filter.player_id {
        query.push(" AND g.player_id = ").push_bind(player_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND g.status = ").push_bind(status);
    }
    query.push(" ORDER BY g.due_date IS NULL, g.due_date, g.id");

    let rows = query.build_query_as::<Goal>().fetch_all(pool).await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn get_goal(pool: &Pool<Sqlite>, id: i64) -> Result<Goal, AppError> {
    info!("Fetching goal by ID");
    let sql = format!("{} WHERE g.id = ?", GOAL_SELECT);
    let row = sqlx::query_as::<_, Goal>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Goal with id {} not found in database", id)))
}

async fn ensure_goal_references(
    conn: &mut SqliteConnection,
    input: &GoalInput,
) -> Result<(), AppError> {
    ensure_exists(&mut *conn, Referenced::Player, input.player_id).await?;

    match (input.skill_id, input.sub_skill_id) {
        (Some(skill_id), sub_skill_id) => {
            ensure_skill_reference(&mut *conn, skill_id, sub_skill_id).await
        }
        (None, Some(_)) => Err(AppError::validation(
            "sub_skill_id",
            "A sub-skill needs its skill",
        )),
        (None, None) => Ok(()),
    }
}

/// Inserts a goal without checking its references.
pub async fn insert_goal(
    conn: &mut SqliteConnection,
    input: &GoalInput,
    created_by: Option<i64>,
) -> Result<i64, AppError> {
    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO goals (player_id, title, description, due_date, status, skill_id, sub_skill_id, created_by, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(input.player_id)
    .bind(input.title.trim())
    .bind(input.description.trim())
    .bind(input.due_date)
    .bind(input.status.unwrap_or(GoalStatus::Planned))
    .bind(input.skill_id)
    .bind(input.sub_skill_id)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, input), fields(player_id = input.player_id))]
pub async fn create_goal(
    pool: &Pool<Sqlite>,
    input: &GoalInput,
    created_by: Option<i64>,
) -> Result<i64, AppError> {
    info!("Creating goal");
    let mut conn = pool.acquire().await?;
    ensure_goal_references(&mut conn, input).await?;

    insert_goal(&mut conn, input, created_by).await
}

#[instrument(skip(pool, input))]
pub async fn update_goal(pool: &Pool<Sqlite>, id: i64, input: &GoalInput) -> Result<(), AppError> {
    info!("Updating goal");
    let mut conn = pool.acquire().await?;
    ensure_goal_references(&mut conn, input).await?;

    let res = sqlx::query(
        "UPDATE goals
         SET player_id = ?, title = ?, description = ?, due_date = ?, status = ?,
             skill_id = ?, sub_skill_id = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(input.player_id)
    .bind(input.title.trim())
    .bind(input.description.trim())
    .bind(input.due_date)
    .bind(input.status.unwrap_or(GoalStatus::Planned))
    .bind(input.skill_id)
    .bind(input.sub_skill_id)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Goal with id {} not found in database", id)));
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn delete_goal(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting goal");
    let res = sqlx::query("DELETE FROM goals WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Goal with id {} not found in database", id)));
    }

    Ok(())
}
