use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use anyhow::Error;
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, PartialEq, Clone)]
pub enum AppErrorType {
    NotFoundError,
    DbError,
    AuthError,
    PayloadValidationError,
    InvalidStateError,
    ConflictError,
    InternalServerError,
    ForbiddenError,
    HashingFailed,
}

#[derive(Debug, PartialEq, Clone)]
pub struct AppError {
    pub error_type: AppErrorType,
    pub message: Option<String>,
    pub cause: Option<String>,
}

#[derive(Serialize)]
pub struct AppErrorResponse {
    pub success: bool,
    pub message: String,
}

impl AppError {
    pub fn message(&self) -> String {
        match self {
            AppError {
                message: Some(message),
                ..
            } => message.clone(),

            AppError {
                message: None,
                error_type: AppErrorType::NotFoundError,
                ..
            } => "The requested item was not found".to_string(),
            _ => "An unexpected error has occurred".to_string(),
        }
    }

    /// Storage failures keep their cause for the logs only.
    pub fn db_error(error: impl ToString) -> AppError {
        AppError {
            cause: Some(error.to_string()),
            error_type: AppErrorType::DbError,
            message: None,
        }
    }

    pub fn not_found(message: impl ToString) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::NotFoundError,
            message: Some(message.to_string()),
        }
    }

    pub fn validation_error(message: impl ToString) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::PayloadValidationError,
            message: Some(message.to_string()),
        }
    }

    pub fn invalid_state(message: impl ToString) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::InvalidStateError,
            message: Some(message.to_string()),
        }
    }

    pub fn conflict(message: impl ToString) -> AppError {
        AppError {
            cause: None,
            error_type: AppErrorType::ConflictError,
            message: Some(message.to_string()),
        }
    }

    pub fn forbidden_error(error: impl ToString) -> AppError {
        AppError {
            cause: Some(error.to_string()),
            error_type: AppErrorType::ForbiddenError,
            message: Some(error.to_string()),
        }
    }

    pub fn unauthorized(error: impl ToString) -> AppError {
        AppError {
            cause: Some(error.to_string()),
            error_type: AppErrorType::AuthError,
            message: Some(error.to_string()),
        }
    }

    pub fn internal_error(error: impl ToString) -> AppError {
        AppError {
            cause: Some(error.to_string()),
            error_type: AppErrorType::InternalServerError,
            message: None,
        }
    }

    pub fn with_cause(mut self, cause: impl ToString) -> AppError {
        self.cause = Some(cause.to_string());
        self
    }

    /// Replaces the client-facing message, keeping type and cause.
    pub fn with_message(mut self, message: impl ToString) -> AppError {
        self.message = Some(message.to_string());
        self
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: Error) -> Self {
        AppError {
            message: None,
            cause: Some(error.to_string()),
            error_type: AppErrorType::InternalServerError,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => AppError {
                cause: Some(error.to_string()),
                error_type: AppErrorType::NotFoundError,
                message: None,
            },
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => AppError {
                cause: Some(error.to_string()),
                error_type: AppErrorType::ConflictError,
                message: Some("A record with the same unique value already exists".to_string()),
            },
            _ => AppError::db_error(error),
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(error: mongodb::error::Error) -> Self {
        AppError::db_error(error)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_keys()
            .collect::<Vec<_>>()
            .join(", ");
        AppError {
            cause: Some(errors.to_string()),
            error_type: AppErrorType::PayloadValidationError,
            message: Some(format!("Invalid or missing fields: {}", fields)),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(error: argon2::password_hash::Error) -> Self {
        AppError {
            error_type: AppErrorType::HashingFailed,
            message: None,
            cause: Some(format!("Hashing failed: {}", error)),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.error_type {
            AppErrorType::AuthError => StatusCode::UNAUTHORIZED,
            AppErrorType::DbError
            | AppErrorType::HashingFailed
            | AppErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            AppErrorType::NotFoundError => StatusCode::NOT_FOUND,
            AppErrorType::PayloadValidationError | AppErrorType::InvalidStateError => {
                StatusCode::BAD_REQUEST
            }
            AppErrorType::ForbiddenError => StatusCode::FORBIDDEN,
            AppErrorType::ConflictError => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                error.cause = ?self.cause,
                error.kind = ?self.error_type,
                "request failed"
            );
        }
        HttpResponse::build(status).json(AppErrorResponse {
            success: false,
            message: self.message(),
        })
    }
}

#[derive(Serialize)]
pub struct AppSuccessResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T: Serialize> AppSuccessResponse<T> {
    pub fn new(data: T, message: impl ToString) -> Self {
        Self {
            success: true,
            data,
            message: message.to_string(),
        }
    }
}
