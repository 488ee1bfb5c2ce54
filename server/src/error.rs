use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lib_utils::crypt;
use serde_json::json;

use crate::{auth::AuthError, email::EmailClientError};

pub type AppResult<T> = Result<T, AppError>;
pub type AppJsonResult<T> = AppResult<Json<T>>;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(anyhow::Error),
    RequestTimeout,
    TooManyRequests,
    Unauthorized(String),
    /// A whole provider operation failed
    Upstream {
        message: &'static str,
        source: EmailClientError,
    },
    EncryptToken,
    DecryptToken,
}

impl AppError {
    pub fn upstream(message: &'static str) -> impl FnOnce(EmailClientError) -> AppError {
        move |source| AppError::Upstream { message, source }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(error)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        tracing::error!("Reqwest error: {:?}", error);
        match error.status() {
            Some(StatusCode::BAD_REQUEST) => AppError::BadRequest(error.to_string()),
            Some(StatusCode::REQUEST_TIMEOUT) => AppError::RequestTimeout,
            Some(StatusCode::TOO_MANY_REQUESTS) => AppError::TooManyRequests,
            _ if error.is_timeout() => AppError::RequestTimeout,
            _ => AppError::Internal(error.into()),
        }
    }
}

impl From<crypt::Error> for AppError {
    fn from(error: crypt::Error) -> Self {
        tracing::error!("Crypt error: {:?}", error);
        match error {
            crypt::Error::EncryptFailed(_) => AppError::EncryptToken,
            crypt::Error::DecryptFailed(_) => AppError::DecryptToken,
            crypt::Error::DecodeFailed(_) => AppError::DecryptToken,
            crypt::Error::StringConversionFailed(_) => AppError::DecryptToken,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        tracing::info!("Auth error: {:?}", error);
        match error {
            AuthError::MissingCredentials => AppError::Unauthorized("Not authenticated".into()),
            AuthError::InvalidToken => AppError::Unauthorized("Invalid session".into()),
            AuthError::Expired => AppError::Unauthorized("Session expired".into()),
            AuthError::RefreshFailed => {
                AppError::Unauthorized("Could not refresh access token".into())
            }
            AuthError::TokenCreation => {
                AppError::Internal(anyhow::anyhow!("Could not create session token"))
            }
        }
    }
}

fn error_body(code: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (
        code,
        Json(json!({"error": {
            "code": code.as_u16(),
            "message": message.into()
        }})),
    )
}

// This centralizes all different errors from our app in one place
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::BadRequest(error) => error_body(StatusCode::BAD_REQUEST, error),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::RequestTimeout => {
                error_body(StatusCode::REQUEST_TIMEOUT, "Request took too long")
            }
            AppError::TooManyRequests => {
                error_body(StatusCode::TOO_MANY_REQUESTS, "Too many requests")
            }
            AppError::Unauthorized(error) => error_body(StatusCode::UNAUTHORIZED, error),
            AppError::Upstream { message, source } => {
                tracing::error!("{message}: {source}");
                let code = match source {
                    EmailClientError::Unauthorized => StatusCode::UNAUTHORIZED,
                    EmailClientError::NotFound => StatusCode::NOT_FOUND,
                    EmailClientError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                error_body(code, message)
            }
            AppError::EncryptToken | AppError::DecryptToken => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Token encryption/decryption error",
            ),
        };
        if err.0.is_server_error() {
            tracing::error!("Error: {:?}", err.1);
        } else {
            tracing::debug!("Error: {:?}", err.1);
        }

        err.into_response()
    }
}
