use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Account, Caller, Permission, Role};
use crate::db::{
    AccountUpdate, NewAccount, create_account, delete_account, get_account, list_accounts,
    update_account,
};
use crate::error::AppError;
use crate::validation::JsonValidateExt;

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub player_id: Option<i64>,
    pub password_changed: bool,
    pub active: bool,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            role: account.role,
            player_id: account.player_id,
            password_changed: account.password_changed,
            active: account.active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, max = 80, message = "Display name is required"))]
    pub display_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: String,
    pub player_id: Option<i64>,
}

/// Distinguishes an absent `player_id` (leave as is) from an explicit
/// `null` (unlink).
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 80, message = "Display name cannot be empty"))]
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub player_id: Option<Option<i64>>,
}

#[get("/admin/accounts")]
pub async fn api_list_accounts(
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    caller.require(Permission::ManageAccounts)?;

    let accounts = list_accounts(db).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

#[post("/admin/accounts", data = "<request>")]
pub async fn api_create_account(
    request: Json<CreateAccountRequest>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<AccountResponse>>, AppError> {
    caller.require(Permission::ManageAccounts)?;
    let request = request.validated()?;
    let role = request.role.parse::<Role>()?;

    let id = create_account(
        db,
        &NewAccount {
            email: request.email,
            display_name: request.display_name,
            password: request.password,
            role,
            player_id: request.player_id,
        },
    )
    .await?;

    let account = get_account(db, id).await?;
    Ok(Custom(Status::Created, Json(AccountResponse::from(account))))
}

#[put("/admin/accounts/<id>", data = "<request>")]
pub async fn api_update_account(
    id: i64,
    request: Json<UpdateAccountRequest>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<AccountResponse>, AppError> {
    let identity = caller.require(Permission::ManageAccounts)?;
    let request = request.validated()?;
    let role = request.role.as_deref().map(str::parse::<Role>).transpose()?;

    if identity.account_id == id {
        if role.is_some_and(|role| role != Role::Admin) {
            return Err(AppError::validation("role", "You cannot change your own role"));
        }
        if request.active == Some(false) {
            return Err(AppError::validation(
                "active",
                "You cannot deactivate your own account",
            ));
        }
    }

    let account = update_account(
        db,
        id,
        &AccountUpdate {
            display_name: request.display_name,
            role,
            active: request.active,
            password: request.password,
            player_id: request.player_id,
        },
    )
    .await?;

    Ok(Json(AccountResponse::from(account)))
}

#[delete("/admin/accounts/<id>")]
pub async fn api_delete_account(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    let identity = caller.require(Permission::ManageAccounts)?;

    if identity.account_id == id {
        return Err(AppError::validation("id", "You cannot delete your own account"));
    }

    delete_account(db, id).await?;
    Ok(Status::NoContent)
}
