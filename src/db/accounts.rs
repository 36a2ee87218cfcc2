use chrono::Utc;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::auth::{Account, Role};
use crate::error::AppError;

use super::{Referenced, ensure_exists};

/// bcrypt work factor; tests hash with the minimum to stay fast.
pub const PASSWORD_COST: u32 = if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST };

const ACCOUNT_COLUMNS: &str = "id, email, display_name, role, player_id, password_changed, active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub role: Role,
    pub player_id: Option<i64>,
}

/// Fields an administrator may change. `None` leaves a field untouched;
/// `player_id: Some(None)` unlinks the player.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub display_name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub password: Option<String>,
    pub player_id: Option<Option<i64>>,
}

#[instrument(skip(pool))]
pub async fn get_account(pool: &Pool<Sqlite>, id: i64) -> Result<Account, AppError> {
    info!("Fetching account by ID");
    let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
    let row = sqlx::query_as::<_, Account>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Account with id {} not found in database", id)))
}

#[instrument(skip(pool))]
pub async fn find_account_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<Account>, AppError> {
    info!("Finding account by email");
    let sql = format!(
        "SELECT {} FROM accounts WHERE email = ? COLLATE NOCASE",
        ACCOUNT_COLUMNS
    );
    let row = sqlx::query_as::<_, Account>(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

#[instrument(skip(pool))]
pub async fn list_accounts(pool: &Pool<Sqlite>) -> Result<Vec<Account>, AppError> {
    info!("Listing accounts");
    let sql = format!("SELECT {} FROM accounts ORDER BY role, display_name, email", ACCOUNT_COLUMNS);
    let rows = sqlx::query_as::<_, Account>(&sql).fetch_all(pool).await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn list_accounts_by_role(
    pool: &Pool<Sqlite>,
    role: Role,
) -> Result<Vec<Account>, AppError> {
    info!(role = %role, "Listing accounts by role");
    let sql = format!(
        "SELECT {} FROM accounts WHERE role = ? AND active = TRUE ORDER BY id",
        ACCOUNT_COLUMNS
    );
    let rows = sqlx::query_as::<_, Account>(&sql)
        .bind(role)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns the account when the email and password match an active account.
#[instrument(skip_all, fields(email))]
pub async fn authenticate_account(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<Account>, AppError> {
    info!("Authenticating account");
    let hash: Option<(i64, String, bool)> = sqlx::query_as(
        "SELECT id, password, active FROM accounts WHERE email = ? COLLATE NOCASE",
    )
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    let Some((id, hash, active)) = hash else {
        return Ok(None);
    };

    if !active {
        info!(account_id = id, "Login refused for inactive account");
        return Ok(None);
    }

    match bcrypt::verify(password, &hash) {
        Ok(true) => Ok(Some(get_account(pool, id).await?)),
        _ => Ok(None),
    }
}

/// Refuses links to missing players and players already linked elsewhere.
async fn ensure_player_link_available(
    conn: &mut SqliteConnection,
    player_id: i64,
    except_account: Option<i64>,
) -> Result<(), AppError> {
    ensure_exists(&mut *conn, Referenced::Player, player_id).await?;

    let linked: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM accounts WHERE player_id = ? AND id IS NOT ?",
    )
    .bind(player_id)
    .bind(except_account)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(account_id) = linked {
        return Err(AppError::validation(
            "player_id",
            format!("Player {} is already linked to account {}", player_id, account_id),
        ));
    }

    Ok(())
}

fn ensure_link_matches_role(role: Role, player_id: Option<i64>) -> Result<(), AppError> {
    if player_id.is_some() && role != Role::Player {
        return Err(AppError::validation(
            "player_id",
            "Only player accounts can be linked to a player",
        ));
    }
    Ok(())
}

#[instrument(skip_all, fields(email = %account.email, role = %account.role))]
pub async fn create_account(pool: &Pool<Sqlite>, account: &NewAccount) -> Result<i64, AppError> {
    info!("Creating new account");

    if find_account_by_email(pool, &account.email).await?.is_some() {
        return Err(AppError::validation(
            "email",
            format!("Email '{}' already exists", account.email.trim()),
        ));
    }

    ensure_link_matches_role(account.role, account.player_id)?;

    let mut conn = pool.acquire().await?;
    if let Some(player_id) = account.player_id {
        ensure_player_link_available(&mut conn, player_id, None).await?;
    }

    let hashed_password = bcrypt::hash(&account.password, PASSWORD_COST)?;
    let now = Utc::now();

    let res = sqlx::query(
        "INSERT INTO accounts (email, display_name, role, password, player_id, password_changed, active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, FALSE, TRUE, ?, ?)",
    )
    .bind(account.email.trim().to_lowercase())
    .bind(account.display_name.trim())
    .bind(account.role)
    .bind(hashed_password)
    .bind(account.player_id)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, update))]
pub async fn update_account(
    pool: &Pool<Sqlite>,
    id: i64,
    update: &AccountUpdate,
) -> Result<Account, AppError> {
    info!("Admin updating account");
    let current = get_account(pool, id).await?;

    let role = update.role.unwrap_or(current.role);
    let player_id = match update.player_id {
        Some(player_id) => player_id,
        None if role == Role::Player => current.player_id,
        None => None,
    };
    ensure_link_matches_role(role, player_id)?;

    let mut tx = pool.begin().await?;

    if let Some(player_id) = player_id {
        ensure_player_link_available(&mut tx, player_id, Some(id)).await?;
    }

    let display_name = update
        .display_name
        .as_deref()
        .map(str::trim)
        .unwrap_or(&current.display_name)
        .to_string();
    let active = update.active.unwrap_or(current.active);

    sqlx::query(
        "UPDATE accounts SET display_name = ?, role = ?, player_id = ?, active = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&display_name)
    .bind(role)
    .bind(player_id)
    .bind(active)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(password) = &update.password {
        let hashed_password = bcrypt::hash(password, PASSWORD_COST)?;
        sqlx::query("UPDATE accounts SET password = ?, password_changed = FALSE WHERE id = ?")
            .bind(hashed_password)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    if !active {
        sqlx::query("DELETE FROM account_sessions WHERE account_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    get_account(pool, id).await
}

/// Sets a password chosen by the account owner.
#[instrument(skip_all, fields(account_id))]
pub async fn change_own_password(
    pool: &Pool<Sqlite>,
    account_id: i64,
    new_password: &str,
) -> Result<(), AppError> {
    info!("Updating account password");
    let hashed_password = bcrypt::hash(new_password, PASSWORD_COST)?;

    sqlx::query(
        "UPDATE accounts SET password = ?, password_changed = TRUE, updated_at = ? WHERE id = ?",
    )
    .bind(hashed_password)
    .bind(Utc::now())
    .bind(account_id)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn delete_account(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting account");
    let res = sqlx::query("DELETE FROM accounts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Account with id {} not found in database", id)));
    }

    Ok(())
}

/// Creates the first administrator when no active admin exists yet.
#[instrument(skip_all, fields(email))]
pub async fn ensure_bootstrap_admin(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<bool, AppError> {
    let admins: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = 'admin' AND active = TRUE")
            .fetch_one(pool)
            .await?;

    if admins > 0 {
        return Ok(false);
    }

    info!("No administrator found, creating bootstrap account");
    create_account(
        pool,
        &NewAccount {
            email: email.to_string(),
            display_name: "Administrator".to_string(),
            password: password.to_string(),
            role: Role::Admin,
            player_id: None,
        },
    )
    .await?;

    Ok(true)
}
