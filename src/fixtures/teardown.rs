use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;

use super::WipeSummary;

/// Deletes every player and everything that references one.
///
/// Sessions with any participant are deleted whole, not detached. Accounts
/// linked to a player keep existing with the link cleared. With no players
/// this is a no-op returning zero counts.
#[instrument(skip(pool))]
pub async fn wipe_all_players(
    pool: &Pool<Sqlite>,
    now: DateTime<Utc>,
) -> Result<WipeSummary, AppError> {
    let players: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM players")
        .fetch_one(pool)
        .await?;

    if players == 0 {
        info!("No players to wipe");
        return Ok(WipeSummary::default());
    }

    info!(players, "Wiping all players");
    let mut tx = pool.begin().await?;

    let deleted_training_sessions = sqlx::query(
        "DELETE FROM training_sessions
         WHERE id IN (SELECT DISTINCT session_id FROM training_session_players)",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let deleted_player_skill_progress = sqlx::query("DELETE FROM player_skill_progress")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let deleted_goals = sqlx::query("DELETE FROM goals")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let deleted_test_results = sqlx::query("DELETE FROM test_results")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let detached_accounts = sqlx::query(
        "UPDATE accounts SET player_id = NULL, updated_at = ? WHERE player_id IS NOT NULL",
    )
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query("DELETE FROM player_trainers")
        .execute(&mut *tx)
        .await?;

    let deleted_players = sqlx::query("DELETE FROM players")
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    let summary = WipeSummary {
        deleted_players,
        deleted_training_sessions,
        deleted_player_skill_progress,
        deleted_goals,
        deleted_test_results,
        detached_accounts,
    };
    info!(?summary, "Players wiped");

    Ok(summary)
}
