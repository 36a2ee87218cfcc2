use crate::error::AppError;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ValidationResponse {
    pub status: String,
    pub kind: String,
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationResponse {
    pub fn new(kind: &str, errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            status: "error".to_string(),
            kind: kind.to_string(),
            errors,
        }
    }

    pub fn with_error(kind: &str, field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(kind, errors)
    }
}

pub trait ToValidationResponse {
    fn to_validation_response(self) -> Custom<Json<ValidationResponse>>;
}

impl ToValidationResponse for AppError {
    fn to_validation_response(self) -> Custom<Json<ValidationResponse>> {
        let status = self.status_code();
        let kind = self.kind();

        let body = match &self {
            AppError::InvalidFields(errors) => ValidationResponse::new(kind, field_messages(errors)),
            AppError::Validation { field, message } => {
                ValidationResponse::with_error(kind, field, message)
            }
            AppError::Database(sqlx::Error::RowNotFound) => {
                ValidationResponse::with_error(kind, "resource", "Not found")
            }
            AppError::Database(_) | AppError::Internal(_) => {
                ValidationResponse::with_error(kind, "server", "Internal server error")
            }
            AppError::Unauthenticated(msg) => ValidationResponse::with_error(
                kind,
                "authentication",
                &format!("Authentication required: {}", msg),
            ),
            AppError::Forbidden(msg) => ValidationResponse::with_error(
                kind,
                "permission",
                &format!("Permission denied: {}", msg),
            ),
            AppError::NotFound(msg) => {
                ValidationResponse::with_error(kind, "resource", &format!("Not found: {}", msg))
            }
            AppError::PrecursorMissing(msg) => ValidationResponse::with_error(kind, "catalog", msg),
            AppError::ReportUnavailable(msg) => {
                ValidationResponse::with_error(kind, "report", &format!("Report unavailable: {}", msg))
            }
        };

        Custom(status, Json(body))
    }
}

impl ToValidationResponse for Status {
    fn to_validation_response(self) -> Custom<Json<ValidationResponse>> {
        let (kind, field, message) = match self.code {
            403 => (
                "forbidden",
                "permission",
                "You don't have permission to perform this action",
            ),
            401 => ("unauthenticated", "authentication", "Authentication required"),
            404 => ("not_found", "resource", "Resource not found"),
            400 => ("validation_failed", "request", "Bad request"),
            422 => ("validation_failed", "request", "Malformed request body"),
            _ => ("internal_error", "server", "An error occurred"),
        };

        Custom(self, Json(ValidationResponse::with_error(kind, field, message)))
    }
}

fn field_messages(errors: &validator::ValidationErrors) -> HashMap<String, Vec<String>> {
    let mut error_map = HashMap::new();

    for (field, field_errors) in errors.field_errors() {
        let error_messages: Vec<String> = field_errors
            .iter()
            .map(|error| {
                error
                    .message
                    .clone()
                    .unwrap_or_else(|| "Invalid value".into())
                    .to_string()
            })
            .collect();

        error_map.insert(field.to_string(), error_messages);
    }

    error_map
}

/// Runs `validator` rules on a JSON body and hands the inner value back.
pub trait JsonValidateExt<T> {
    fn validated(self) -> Result<T, AppError>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    fn validated(self) -> Result<T, AppError> {
        let inner = self.into_inner();
        inner.validate()?;
        Ok(inner)
    }
}
