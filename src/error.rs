use opentelemetry_semantic_conventions::{attribute::OTEL_STATUS_CODE, trace::ERROR_TYPE};
use rocket::http::Status;
use thiserror::Error;
use tracing::{Span, error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Validation failed: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Precursor missing: {0}")]
    PrecursorMissing(String),

    #[error("Report unavailable: {0}")]
    ReportUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Validation { .. } | AppError::InvalidFields(_) => "validation_failed",
            AppError::PrecursorMissing(_) => "precursor_missing",
            AppError::ReportUnavailable(_) => "report_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn log_and_record(&self, ctx: &str) {
        let current_span = Span::current();
        let is_valid_span = !current_span.is_none();

        let message = self.to_string();
        match self {
            AppError::Database(err) => {
                error!(error = %message, context = %ctx, db_error = %err, "Database error");
            }
            AppError::Unauthenticated(msg) => {
                warn!(message = %msg, context = %ctx, "Unauthenticated request");
            }
            AppError::Forbidden(msg) => {
                warn!(message = %msg, context = %ctx, "Forbidden request");
            }
            AppError::NotFound(msg) => {
                warn!(message = %msg, context = %ctx, "Not found error");
            }
            AppError::Validation { field, message } => {
                warn!(field = %field, message = %message, context = %ctx, "Validation error");
            }
            AppError::InvalidFields(errors) => {
                warn!(errors = %errors, context = %ctx, "Request failed validation");
            }
            AppError::PrecursorMissing(msg) => {
                warn!(message = %msg, context = %ctx, "Precursor data missing");
            }
            AppError::ReportUnavailable(msg) => {
                error!(message = %msg, context = %ctx, "Report unavailable");
            }
            AppError::Internal(msg) => {
                error!(message = %msg, context = %ctx, "Internal server error");
            }
        }

        if is_valid_span {
            current_span.record("error", tracing::field::display(true));
            current_span.record(ERROR_TYPE, tracing::field::display(self.kind()));
            current_span.record("error.message", tracing::field::display(&message));

            match self {
                AppError::Database(_) | AppError::Internal(_) | AppError::ReportUnavailable(_) => {
                    current_span.record(OTEL_STATUS_CODE, tracing::field::display("ERROR"));
                }
                _ => {}
            }
        }
    }

    pub fn status_code(&self) -> Status {
        match self {
            AppError::Database(sqlx::Error::RowNotFound) => Status::NotFound,
            AppError::Database(_) => Status::InternalServerError,
            AppError::Unauthenticated(_) => Status::Unauthorized,
            AppError::Forbidden(_) => Status::Forbidden,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Validation { .. } => Status::BadRequest,
            AppError::InvalidFields(_) => Status::UnprocessableEntity,
            AppError::PrecursorMissing(_) => Status::Conflict,
            AppError::ReportUnavailable(_) => Status::ServiceUnavailable,
            AppError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        use crate::validation::ToValidationResponse;

        self.log_and_record(&format!("Request to {} {}", req.method(), req.uri()));
        self.to_validation_response().respond_to(req)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Cryptography error: {}", error))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {}", error))
    }
}
