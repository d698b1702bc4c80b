use std::fmt;

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Forbidden(String),
    Conflict(String),
    Validation(String),
    Storage(String),
    NoData(String),
    UnauthorizedStream,
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn not_found<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::NotFound(t.to_string())
    }

    pub fn forbidden<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Forbidden(t.to_string())
    }

    pub fn conflict<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Conflict(t.to_string())
    }

    pub fn validation<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Validation(t.to_string())
    }

    pub fn storage<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Storage(t.to_string())
    }

    pub fn no_data<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::NoData(t.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Conflict(_) => "Conflict",
            AppError::Validation(_) => "ValidationError",
            AppError::Storage(_) => "StorageError",
            AppError::NoData(_) => "NoDataError",
            AppError::UnauthorizedStream => "UnauthorizedStream",
            AppError::InternalServerError(_) => "InternalServerError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::NoData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnauthorizedStream => StatusCode::UNAUTHORIZED,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::Validation(msg)
            | AppError::Storage(msg)
            | AppError::NoData(msg) => write!(f, "{}", msg),
            AppError::UnauthorizedStream => write!(f, "stream credential rejected"),
            AppError::InternalServerError(err) => write!(f, "{}", err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // the push path gives no hint about why a credential was refused
        if let AppError::UnauthorizedStream = self {
            return status.into_response();
        }
        let body = api::response::Error {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::validation("x").kind(), "ValidationError");
        assert_eq!(
            AppError::UnauthorizedStream.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_from_anyhow() {
        let err: AppError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(err.kind(), "InternalServerError");
        assert_eq!(err.to_string(), "disk on fire");
    }
}
