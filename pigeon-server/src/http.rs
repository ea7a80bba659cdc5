use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pigeon_protocol::http::ErrorResponse;
use thiserror::Error;

pub type ApiResult<T> = Result<Json<T>, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing credentials")]
    MissingCredentials,
    #[error("{0}")]
    BadRequest(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Failed to generate token")]
    TokenGeneration(#[source] Box<jsonwebtoken::errors::Error>),
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::TokenGeneration(Box::new(err))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::MissingCredentials | AppError::TokenGeneration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::TokenGeneration(err) => {
                tracing::error!(?err, "Token generation failed");
                ErrorResponse::new(self.to_string()).with_details(err.to_string())
            }
            _ => {
                tracing::debug!(%status, err = %self, "Rejecting request");
                ErrorResponse::new(self.to_string())
            }
        };
        (status, Json(body)).into_response()
    }
}
