use actix_web::{
    http::{header::LOCATION, StatusCode},
    HttpResponse, ResponseError,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Permission denied")]
    Forbidden,

    #[error("Login required")]
    LoginRequired { next: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Login page URL that sends the user back to `next` afterwards.
pub fn login_url(next: &str) -> String {
    format!("/accounts/login/?next={}", urlencoding::encode(next))
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::LoginRequired { .. } => StatusCode::FOUND,
            AppError::Database(_) | AppError::Auth(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            AppError::LoginRequired { next } => HttpResponse::Found()
                .insert_header((LOCATION, login_url(next)))
                .finish(),
            _ if status.is_server_error() => {
                error!("Request failed: {}", self);
                HttpResponse::build(status).json(json!({ "error": "Internal server error" }))
            }
            _ => HttpResponse::build(status).json(json!({ "error": self.to_string() })),
        }
    }
}
