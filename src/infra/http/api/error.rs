use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::{
    accounts::{AccountError, AuthError},
    documents::DocumentError,
    error::ErrorReport,
    repos::RepoError,
    todos::TodoError,
};
use crate::domain::error::DomainError;

const SOURCE: &str = "infra::http::api";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Client-facing failure rendered as `{"error": message}`. The detail is only
/// logged through the attached [`ErrorReport`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn invalid_body(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body").with_detail(detail)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").with_detail(detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self
            .detail
            .unwrap_or_else(|| self.message.clone().into_owned());
        let body = ApiErrorBody {
            error: self.message.into_owned(),
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message(SOURCE, self.status, detail).attach(&mut response);
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } => Self::new(StatusCode::BAD_REQUEST, message),
            DomainError::NotFound { entity } => {
                Self::new(StatusCode::NOT_FOUND, format!("{entity} not found"))
            }
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::not_found("Resource not found"),
            RepoError::Duplicate { constraint } => {
                Self::new(StatusCode::CONFLICT, "Duplicate record").with_detail(constraint)
            }
            RepoError::InvalidInput { message } => {
                Self::new(StatusCode::BAD_REQUEST, "Invalid input").with_detail(message)
            }
            RepoError::Integrity { message } => {
                Self::new(StatusCode::CONFLICT, "Integrity constraint violated")
                    .with_detail(message)
            }
            RepoError::Timeout => Self::new(StatusCode::SERVICE_UNAVAILABLE, "Database timeout"),
            RepoError::Persistence(message) => Self::internal(message),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Domain(err) => err.into(),
            AccountError::Conflict => {
                Self::new(StatusCode::CONFLICT, "Username or email already registered")
            }
            AccountError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AccountError::Repo(err) => err.into(),
            err @ (AccountError::Hashing(_) | AccountError::Token(_)) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Missing => Self::unauthorized("Authorization header required"),
            AuthError::Invalid | AuthError::UnknownUser => Self::unauthorized("Invalid token"),
            AuthError::Expired => Self::unauthorized("Token expired"),
            AuthError::Repo(err) => err.into(),
        }
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Domain(err) => err.into(),
            DocumentError::NotFound => Self::not_found("Document not found"),
            DocumentError::Repo(err) => err.into(),
            err @ (DocumentError::Storage(_) | DocumentError::CorruptContent { .. }) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::Domain(err) => err.into(),
            TodoError::NotFound => Self::not_found("Todo not found"),
            TodoError::Repo(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    #[tokio::test]
    async fn renders_error_body_and_attaches_report() {
        let response = ApiError::invalid_body("expected value at line 1").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let report = response
            .extensions()
            .get::<ErrorReport>()
            .cloned()
            .expect("report attached");
        assert_eq!(report.messages, vec!["expected value at line 1".to_string()]);

        let body = response.into_body().collect().await.expect("body").to_bytes();
        assert_eq!(&body[..], br#"{"error":"Invalid request body"}"#);
    }

    #[test]
    fn validation_message_is_client_visible() {
        let err = ApiError::from(DocumentError::Domain(DomainError::validation(
            "title must not be empty",
        )));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "title must not be empty");
    }
}
