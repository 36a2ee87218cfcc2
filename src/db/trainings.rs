use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{
    AccountRef, PlayerRef, TrainingEntry, TrainingInput, TrainingSession, TrainingSessionView,
};

use super::{Referenced, ensure_exists, ensure_skill_reference};

const SESSION_COLUMNS: &str =
    "id, trainer_id, date, duration_minutes, location, notes, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct TrainingFilter {
    pub player_id: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct SessionPlayerRow {
    session_id: i64,
    #[sqlx(flatten)]
    player: PlayerRef,
}

#[instrument(skip(pool))]
pub async fn list_trainings(
    pool: &Pool<Sqlite>,
    filter: &TrainingFilter,
) -> Result<Vec<TrainingSessionView>, AppError> {
    info!("Listing training sessions");
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM training_sessions",
        SESSION_COLUMNS
    ));
    if let Some(player_id) = filter.player_id {
        query
            .push(" WHERE id IN (SELECT session_id FROM training_session_players WHERE player_id = ")
            .push_bind(player_id)
            .push(")");
    }
    query.push(" ORDER BY date DESC, id DESC");

    let sessions = query
        .build_query_as::<TrainingSession>()
        .fetch_all(pool)
        .await?;

    resolve_training_references(pool, sessions).await
}

#[instrument(skip(pool))]
pub async fn get_training(pool: &Pool<Sqlite>, id: i64) -> Result<TrainingSessionView, AppError> {
    info!("Fetching training session by ID");
    let sql = format!("SELECT {} FROM training_sessions WHERE id = ?", SESSION_COLUMNS);
    let session = sqlx::query_as::<_, TrainingSession>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Training session with id {} not found in database", id))
        })?;

    let mut views = resolve_training_references(pool, vec![session]).await?;
    views.pop().ok_or_else(|| {
        AppError::Internal(format!("Training session {} vanished while resolving", id))
    })
}

/// Embeds participants, the trainer and entry skill names into each session.
#[instrument(skip_all, fields(count = sessions.len()))]
pub async fn resolve_training_references(
    pool: &Pool<Sqlite>,
    sessions: Vec<TrainingSession>,
) -> Result<Vec<TrainingSessionView>, AppError> {
    if sessions.is_empty() {
        return Ok(Vec::new());
    }

    let mut players_query = QueryBuilder::<Sqlite>::new(
        "SELECT tsp.session_id, p.id, p.first_name, p.last_name, p.club
         FROM training_session_players tsp JOIN players p ON p.id = tsp.player_id
         WHERE tsp.session_id IN (",
    );
    let mut ids = players_query.separated(", ");
    for session in &sessions {
        ids.push_bind(session.id);
    }
    players_query.push(") ORDER BY p.last_name, p.first_name");
    let player_rows = players_query
        .build_query_as::<SessionPlayerRow>()
        .fetch_all(pool)
        .await?;

    let mut entries_query = QueryBuilder::<Sqlite>::new(
        "SELECT e.id, e.session_id, e.position, e.skill_id, s.name AS skill_name,
                e.sub_skill_id, ss.name AS sub_skill_name, e.volume, e.quality, e.notes
         FROM training_entries e
         JOIN skills s ON s.id = e.skill_id
         LEFT JOIN sub_skills ss ON ss.id = e.sub_skill_id
         WHERE e.session_id IN (",
    );
    let mut ids = entries_query.separated(", ");
    for session in &sessions {
        ids.push_bind(session.id);
    }
    entries_query.push(") ORDER BY e.session_id, e.position");
    let entry_rows = entries_query
        .build_query_as::<TrainingEntry>()
        .fetch_all(pool)
        .await?;

    let trainer_ids: BTreeSet<i64> = sessions.iter().filter_map(|s| s.trainer_id).collect();
    let mut trainers: HashMap<i64, AccountRef> = HashMap::new();
    if !trainer_ids.is_empty() {
        let mut trainers_query =
            QueryBuilder::<Sqlite>::new("SELECT id, email, display_name FROM accounts WHERE id IN (");
        let mut ids = trainers_query.separated(", ");
        for trainer_id in &trainer_ids {
            ids.push_bind(*trainer_id);
        }
        trainers_query.push(")");
        for account in trainers_query
            .build_query_as::<AccountRef>()
            .fetch_all(pool)
            .await?
        {
            trainers.insert(account.id, account);
        }
    }

    let mut players: HashMap<i64, Vec<PlayerRef>> = HashMap::new();
    for row in player_rows {
        players.entry(row.session_id).or_default().push(row.player);
    }
    let mut entries: HashMap<i64, Vec<TrainingEntry>> = HashMap::new();
    for entry in entry_rows {
        entries.entry(entry.session_id).or_default().push(entry);
    }

    Ok(sessions
        .into_iter()
        .map(|session| TrainingSessionView {
            id: session.id,
            date: session.date,
            duration_minutes: session.duration_minutes,
            location: session.location,
            notes: session.notes,
            trainer: session.trainer_id.and_then(|id| trainers.get(&id).cloned()),
            players: players.remove(&session.id).unwrap_or_default(),
            entries: entries.remove(&session.id).unwrap_or_default(),
        })
        .collect())
}

async fn ensure_training_references(
    conn: &mut SqliteConnection,
    input: &TrainingInput,
) -> Result<(), AppError> {
    for player_id in &input.player_ids {
        ensure_exists(&mut *conn, Referenced::Player, *player_id).await?;
    }

    if let Some(trainer_id) = input.trainer_id {
        ensure_exists(&mut *conn, Referenced::Account, trainer_id).await?;
        let role: Role = sqlx::query_scalar("SELECT role FROM accounts WHERE id = ?")
            .bind(trainer_id)
            .fetch_one(&mut *conn)
            .await?;
        if !role.can_coach() {
            return Err(AppError::validation(
                "trainer_id",
                format!("Account {} is not a trainer", trainer_id),
            ));
        }
    }

    for entry in &input.entries {
        ensure_skill_reference(&mut *conn, entry.skill_id, entry.sub_skill_id).await?;
    }

    Ok(())
}

async fn write_training_children(
    conn: &mut SqliteConnection,
    session_id: i64,
    input: &TrainingInput,
) -> Result<(), AppError> {
    let player_ids: BTreeSet<i64> = input.player_ids.iter().copied().collect();
    for player_id in player_ids {
        sqlx::query("INSERT INTO training_session_players (session_id, player_id) VALUES (?, ?)")
            .bind(session_id)
            .bind(player_id)
            .execute(&mut *conn)
            .await?;
    }

    for (position, entry) in input.entries.iter().enumerate() {
        sqlx::query(
            "INSERT INTO training_entries (session_id, position, skill_id, sub_skill_id, volume, quality, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(position as i64)
        .bind(entry.skill_id)
        .bind(entry.sub_skill_id)
        .bind(entry.volume)
        .bind(entry.quality)
        .bind(&entry.notes)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[instrument(skip(pool, input), fields(players = input.player_ids.len(), entries = input.entries.len()))]
pub async fn create_training(pool: &Pool<Sqlite>, input: &TrainingInput) -> Result<i64, AppError> {
    info!("Creating training session");
    if input.player_ids.is_empty() {
        return Err(AppError::validation(
            "player_ids",
            "A training needs at least one player",
        ));
    }

    let mut tx = pool.begin().await?;
    ensure_training_references(&mut tx, input).await?;

    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO training_sessions (trainer_id, date, duration_minutes, location, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(input.trainer_id)
    .bind(input.date)
    .bind(input.duration_minutes)
    .bind(input.location.trim())
    .bind(&input.notes)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let session_id = res.last_insert_rowid();

    write_training_children(&mut tx, session_id, input).await?;
    tx.commit().await?;

    Ok(session_id)
}

#[instrument(skip(pool, input))]
pub async fn update_training(
    pool: &Pool<Sqlite>,
    id: i64,
    input: &TrainingInput,
) -> Result<(), AppError> {
    info!("Updating training session");
    if input.player_ids.is_empty() {
        return Err(AppError::validation(
            "player_ids",
            "A training needs at least one player",
        ));
    }

    let mut tx = pool.begin().await?;
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM training_sessions WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound(format!(
            "Training session with id {} not found in database",
            id
        )));
    }
    ensure_training_references(&mut tx, input).await?;

    sqlx::query(
        "UPDATE training_sessions
         SET trainer_id = ?, date = ?, duration_minutes = ?, location = ?, notes = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(input.trainer_id)
    .bind(input.date)
    .bind(input.duration_minutes)
    .bind(input.location.trim())
    .bind(&input.notes)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM training_session_players WHERE session_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM training_entries WHERE session_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    write_training_children(&mut tx, id, input).await?;
    tx.commit().await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn delete_training(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting training session");
    let res = sqlx::query("DELETE FROM training_sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Training session with id {} not found in database",
            id
        )));
    }

    Ok(())
}
