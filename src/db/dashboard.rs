use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{GoalStatus, PlayerRef};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportSession {
    pub id: i64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct ReportParticipant {
    pub session_id: i64,
    pub player_id: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportEntry {
    pub session_id: i64,
    pub skill_name: String,
}

/// The rows a dashboard is folded from. Each collection comes from its own
/// query, so counts taken under concurrent writes may not cross-foot.
#[derive(Debug, Clone, Default)]
pub struct ReportSnapshot {
    pub players: Vec<PlayerRef>,
    pub sessions: Vec<ReportSession>,
    pub participants: Vec<ReportParticipant>,
    pub entries: Vec<ReportEntry>,
    pub goal_statuses: Vec<GoalStatus>,
}

#[instrument(skip(pool))]
pub async fn load_report_snapshot(pool: &Pool<Sqlite>) -> Result<ReportSnapshot, AppError> {
    info!("Loading dashboard snapshot");

    let players = sqlx::query_as::<_, PlayerRef>(
        "SELECT id, first_name, last_name, club FROM players ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let sessions =
        sqlx::query_as::<_, ReportSession>("SELECT id, date FROM training_sessions ORDER BY date")
            .fetch_all(pool)
            .await?;

    let participants = sqlx::query_as::<_, ReportParticipant>(
        "SELECT session_id, player_id FROM training_session_players",
    )
    .fetch_all(pool)
    .await?;

    let entries = sqlx::query_as::<_, ReportEntry>(
        "SELECT e.session_id, s.name AS skill_name
         FROM training_entries e JOIN skills s ON s.id = e.skill_id",
    )
    .fetch_all(pool)
    .await?;

    let goal_statuses: Vec<GoalStatus> = sqlx::query_scalar("SELECT status FROM goals")
        .fetch_all(pool)
        .await?;

    Ok(ReportSnapshot {
        players,
        sessions,
        participants,
        entries,
        goal_statuses,
    })
}
