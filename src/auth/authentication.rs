use rocket::Request;
use rocket::catch;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use sqlx::SqlitePool;
use tracing::Instrument;

use crate::db::{get_account, get_session_by_token};
use crate::validation::{ToValidationResponse, ValidationResponse};

use super::Caller;

pub const SESSION_COOKIE: &str = "session_token";

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Caller {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        resolve_caller(request)
            .instrument(tracing::info_span!("caller_auth_guard"))
            .await
    }
}

async fn resolve_caller(request: &Request<'_>) -> Outcome<Caller, ()> {
    let token = request
        .cookies()
        .get_private(SESSION_COOKIE)
        .map(|c| c.value().to_string());

    let Some(token) = token else {
        return Outcome::Success(Caller::Anonymous);
    };

    let db = match request.rocket().state::<SqlitePool>() {
        Some(pool) => pool,
        _ => {
            tracing::error!("Database pool not found in managed state");
            return Outcome::Error((Status::InternalServerError, ()));
        }
    };

    let session = match get_session_by_token(db, &token).await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(error = ?err, "Invalid session token");
            return Outcome::Success(Caller::Anonymous);
        }
    };

    if !session.is_valid() {
        tracing::warn!(session_id = session.id, "Session token expired");
        return Outcome::Success(Caller::Anonymous);
    }

    match get_account(db, session.account_id).await {
        Ok(account) if account.active => {
            tracing::info!(
                email = %account.email,
                role = %account.role,
                "Caller authenticated via session token"
            );
            Outcome::Success(Caller::Authenticated(account.identity()))
        }
        Ok(account) => {
            tracing::warn!(account_id = account.id, "Session belongs to inactive account");
            Outcome::Success(Caller::Anonymous)
        }
        Err(err) => {
            tracing::error!(account_id = session.account_id, error = ?err, "Failed to fetch account for valid session");
            Outcome::Error((Status::InternalServerError, ()))
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::Unauthorized.to_validation_response()
}

#[catch(403)]
pub fn forbidden_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    tracing::warn!("Forbidden access attempt");
    Status::Forbidden.to_validation_response()
}

#[catch(404)]
pub fn not_found_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::NotFound.to_validation_response()
}

#[catch(422)]
pub fn unprocessable_api(_req: &Request) -> Custom<Json<ValidationResponse>> {
    Status::UnprocessableEntity.to_validation_response()
}
