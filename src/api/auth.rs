use chrono::{Duration, Utc};
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::info;
use validator::Validate;

use crate::auth::{Account, AccountSession, Caller, Permission, Role, SESSION_COOKIE};
use crate::db::{
    authenticate_account, change_own_password, create_account_session, get_account,
    invalidate_session,
};
use crate::env::AppConfig;
use crate::error::AppError;
use crate::validation::JsonValidateExt;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub player_id: Option<i64>,
    pub must_change_password: bool,
    pub can_view_all_players: bool,
    pub can_view_dashboard: bool,
    pub can_manage_players: bool,
    pub can_manage_catalog: bool,
    pub can_manage_trainings: bool,
    pub can_manage_accounts: bool,
    pub can_run_fixtures: bool,
}

impl From<Account> for MeResponse {
    fn from(account: Account) -> Self {
        Self {
            can_view_all_players: account.has_permission(Permission::ViewAllPlayers),
            can_view_dashboard: account.has_permission(Permission::ViewDashboard),
            can_manage_players: account.has_permission(Permission::ManagePlayers),
            can_manage_catalog: account.has_permission(Permission::ManageCatalog),
            can_manage_trainings: account.has_permission(Permission::ManageTrainings),
            can_manage_accounts: account.has_permission(Permission::ManageAccounts),
            can_run_fixtures: account.has_permission(Permission::RunFixtures),
            must_change_password: !account.password_changed,
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            role: account.role,
            player_id: account.player_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<MeResponse>, AppError> {
    let login = login.validated()?;

    let Some(account) = authenticate_account(db, &login.email, &login.password).await? else {
        return Err(AppError::Unauthenticated(
            "invalid email or password".to_string(),
        ));
    };

    let token = AccountSession::generate_token();
    let expires_at = Utc::now() + Duration::hours(config.session_hours);
    create_account_session(db, account.id, &token, expires_at.naive_utc()).await?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .same_site(SameSite::Lax)
        .http_only(true)
        .max_age(rocket::time::Duration::hours(config.session_hours));
    cookies.add_private(cookie);

    info!(account_id = account.id, role = %account.role, "Login succeeded");
    Ok(Json(MeResponse::from(account)))
}

#[post("/logout")]
pub async fn api_logout(cookies: &CookieJar<'_>, db: &State<Pool<Sqlite>>) -> Status {
    let token = cookies
        .get_private(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        if let Err(err) = invalidate_session(db, &token).await {
            err.log_and_record("logout");
        }
    }

    cookies.remove_private(Cookie::build(SESSION_COOKIE));
    Status::NoContent
}

#[get("/me")]
pub async fn api_me(caller: Caller, db: &State<Pool<Sqlite>>) -> Result<Json<MeResponse>, AppError> {
    let identity = caller
        .identity()
        .ok_or_else(|| AppError::Unauthenticated("no active session".to_string()))?;

    let account = get_account(db, identity.account_id).await?;
    Ok(Json(MeResponse::from(account)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[post("/change-password", data = "<request>")]
pub async fn api_change_password(
    request: Json<ChangePasswordRequest>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    let identity = caller.require(Permission::ChangeOwnPassword)?;
    let request = request.validated()?;

    let account = get_account(db, identity.account_id).await?;
    if authenticate_account(db, &account.email, &request.current_password)
        .await?
        .is_none()
    {
        return Err(AppError::validation(
            "current_password",
            "Current password is incorrect",
        ));
    }

    if request.current_password == request.new_password {
        return Err(AppError::validation(
            "new_password",
            "New password must differ from the current one",
        ));
    }

    change_own_password(db, identity.account_id, &request.new_password).await?;
    Ok(Status::NoContent)
}
