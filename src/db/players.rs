use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{AccountRef, Player, PlayerDetail, PlayerInput};

use super::{Referenced, ensure_exists};

const PLAYER_COLUMNS: &str = "id, first_name, last_name, birth_date, age, club, position, dominant_foot, photo_url, active, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub player_id: Option<i64>,
    pub club: Option<String>,
    pub include_inactive: bool,
}

/// What a single-player delete removed or detached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerDeletion {
    pub deleted_training_sessions: u64,
    pub detached_training_sessions: u64,
    pub deleted_player_skill_progress: u64,
    pub deleted_goals: u64,
    pub deleted_test_results: u64,
    pub detached_accounts: u64,
}

#[derive(sqlx::FromRow)]
struct LinkedAccountRow {
    player_id: i64,
    #[sqlx(flatten)]
    account: AccountRef,
}

#[instrument(skip(pool))]
pub async fn list_players(
    pool: &Pool<Sqlite>,
    filter: &PlayerFilter,
) -> Result<Vec<Player>, AppError> {
    info!("Listing players");
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM players WHERE 1 = 1",
        PLAYER_COLUMNS
    ));

    if let Some(player_id) = filter.player_id {
        query.push(" AND id = ").push_bind(player_id);
    }
    if let Some(club) = &filter.club {
        query.push(" AND TRIM(club) = ").push_bind(club.trim().to_string());
    }
    if !filter.include_inactive {
        query.push(" AND active = TRUE");
    }
    query.push(" ORDER BY last_name, first_name, id");

    let rows = query.build_query_as::<Player>().fetch_all(pool).await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn get_player(pool: &Pool<Sqlite>, id: i64) -> Result<Player, AppError> {
    info!("Fetching player by ID");
    let sql = format!("SELECT {} FROM players WHERE id = ?", PLAYER_COLUMNS);
    let row = sqlx::query_as::<_, Player>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Player with id {} not found in database", id)))
}

#[instrument(skip(pool))]
pub async fn get_player_detail(pool: &Pool<Sqlite>, id: i64) -> Result<PlayerDetail, AppError> {
    let player = get_player(pool, id).await?;
    let mut details = resolve_player_references(pool, vec![player]).await?;

    details
        .pop()
        .ok_or_else(|| AppError::Internal(format!("Player {} vanished while resolving", id)))
}

/// Embeds trainer and linked-account references into each player.
#[instrument(skip_all, fields(count = players.len()))]
pub async fn resolve_player_references(
    pool: &Pool<Sqlite>,
    players: Vec<Player>,
) -> Result<Vec<PlayerDetail>, AppError> {
    if players.is_empty() {
        return Ok(Vec::new());
    }

    let mut trainers_query = QueryBuilder::<Sqlite>::new(
        "SELECT pt.player_id, a.id, a.email, a.display_name
         FROM player_trainers pt JOIN accounts a ON a.id = pt.trainer_id
         WHERE pt.player_id IN (",
    );
    let mut ids = trainers_query.separated(", ");
    for player in &players {
        ids.push_bind(player.id);
    }
    trainers_query.push(") ORDER BY a.display_name, a.id");
    let trainer_rows = trainers_query
        .build_query_as::<LinkedAccountRow>()
        .fetch_all(pool)
        .await?;

    let mut accounts_query = QueryBuilder::<Sqlite>::new(
        "SELECT player_id, id, email, display_name FROM accounts WHERE player_id IN (",
    );
    let mut ids = accounts_query.separated(", ");
    for player in &players {
        ids.push_bind(player.id);
    }
    accounts_query.push(")");
    let account_rows = accounts_query
        .build_query_as::<LinkedAccountRow>()
        .fetch_all(pool)
        .await?;

    let mut trainers: HashMap<i64, Vec<AccountRef>> = HashMap::new();
    for row in trainer_rows {
        trainers.entry(row.player_id).or_default().push(row.account);
    }
    let mut accounts: HashMap<i64, AccountRef> = account_rows
        .into_iter()
        .map(|row| (row.player_id, row.account))
        .collect();

    Ok(players
        .into_iter()
        .map(|player| PlayerDetail {
            trainers: trainers.remove(&player.id).unwrap_or_default(),
            account: accounts.remove(&player.id),
            player,
        })
        .collect())
}

fn validate_player_input(input: &PlayerInput, today: NaiveDate) -> Result<(), AppError> {
    if let Some(birth_date) = input.birth_date {
        if birth_date > today {
            return Err(AppError::validation(
                "birth_date",
                "Birth date cannot be in the future",
            ));
        }
    }
    Ok(())
}

/// Replaces the trainer links of a player. Every id must be a coaching account.
pub async fn set_player_trainers(
    conn: &mut SqliteConnection,
    player_id: i64,
    trainer_ids: &[i64],
) -> Result<(), AppError> {
    for trainer_id in trainer_ids {
        let role: Option<Role> = sqlx::query_scalar("SELECT role FROM accounts WHERE id = ?")
            .bind(trainer_id)
            .fetch_optional(&mut *conn)
            .await?;

        match role {
            Some(role) if role.can_coach() => {}
            Some(_) => {
                return Err(AppError::validation(
                    "trainer_ids",
                    format!("Account {} is not a trainer", trainer_id),
                ));
            }
            None => {
                return Err(AppError::NotFound(format!(
                    "Account with id {} not found in database",
                    trainer_id
                )));
            }
        }
    }

    sqlx::query("DELETE FROM player_trainers WHERE player_id = ?")
        .bind(player_id)
        .execute(&mut *conn)
        .await?;

    for trainer_id in trainer_ids {
        sqlx::query("INSERT OR IGNORE INTO player_trainers (player_id, trainer_id) VALUES (?, ?)")
            .bind(player_id)
            .bind(trainer_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub async fn insert_player(
    conn: &mut SqliteConnection,
    input: &PlayerInput,
) -> Result<i64, AppError> {
    let now = Utc::now();
    validate_player_input(input, now.date_naive())?;

    let res = sqlx::query(
        "INSERT INTO players (first_name, last_name, birth_date, age, club, position, dominant_foot, photo_url, active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(input.first_name.trim())
    .bind(input.last_name.trim())
    .bind(input.birth_date)
    .bind(input.age)
    .bind(input.club.trim())
    .bind(input.position.trim())
    .bind(input.dominant_foot.trim())
    .bind(&input.photo_url)
    .bind(input.active.unwrap_or(true))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    let player_id = res.last_insert_rowid();

    set_player_trainers(&mut *conn, player_id, &input.trainer_ids).await?;

    Ok(player_id)
}

#[instrument(skip(pool, input), fields(first_name = %input.first_name, last_name = %input.last_name))]
pub async fn create_player(pool: &Pool<Sqlite>, input: &PlayerInput) -> Result<i64, AppError> {
    info!("Creating player");
    let mut tx = pool.begin().await?;
    let player_id = insert_player(&mut tx, input).await?;
    tx.commit().await?;

    Ok(player_id)
}

#[instrument(skip(pool, input))]
pub async fn update_player(
    pool: &Pool<Sqlite>,
    id: i64,
    input: &PlayerInput,
) -> Result<(), AppError> {
    info!("Updating player");
    let now = Utc::now();
    validate_player_input(input, now.date_naive())?;

    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, Referenced::Player, id).await?;

    sqlx::query(
        "UPDATE players
         SET first_name = ?, last_name = ?, birth_date = ?, age = ?, club = ?, position = ?,
             dominant_foot = ?, photo_url = ?, active = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(input.first_name.trim())
    .bind(input.last_name.trim())
    .bind(input.birth_date)
    .bind(input.age)
    .bind(input.club.trim())
    .bind(input.position.trim())
    .bind(input.dominant_foot.trim())
    .bind(&input.photo_url)
    .bind(input.active.unwrap_or(true))
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    set_player_trainers(&mut tx, id, &input.trainer_ids).await?;

    tx.commit().await?;

    Ok(())
}

/// Deletes one player and everything that points at it.
///
/// Sessions where the player trained alone are deleted; group sessions keep
/// running without it. Linked accounts are unlinked, not deleted.
#[instrument(skip(pool))]
pub async fn delete_player(
    pool: &Pool<Sqlite>,
    id: i64,
    now: DateTime<Utc>,
) -> Result<PlayerDeletion, AppError> {
    info!("Deleting player with cascade");
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, Referenced::Player, id).await?;

    let deleted_training_sessions = sqlx::query(
        "DELETE FROM training_sessions
         WHERE id IN (SELECT session_id FROM training_session_players WHERE player_id = ?)
           AND id NOT IN (SELECT session_id FROM training_session_players WHERE player_id != ?)",
    )
    .bind(id)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let detached_training_sessions =
        sqlx::query("DELETE FROM training_session_players WHERE player_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

    let deleted_player_skill_progress =
        sqlx::query("DELETE FROM player_skill_progress WHERE player_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

    let deleted_goals = sqlx::query("DELETE FROM goals WHERE player_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let deleted_test_results = sqlx::query("DELETE FROM test_results WHERE player_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let detached_accounts =
        sqlx::query("UPDATE accounts SET player_id = NULL, updated_at = ? WHERE player_id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

    sqlx::query("DELETE FROM player_trainers WHERE player_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM players WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(PlayerDeletion {
        deleted_training_sessions,
        detached_training_sessions,
        deleted_player_skill_progress,
        deleted_goals,
        deleted_test_results,
        detached_accounts,
    })
}
