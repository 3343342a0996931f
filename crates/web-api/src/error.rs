use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use domain::DomainError;

        match error {
            ApplicationError::Domain(DomainError::InvalidArgument { field, reason }) => {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_FAILED",
                    format!("{}: {}", field, reason),
                )
            }
            ApplicationError::Domain(DomainError::InvalidParticipants) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "conversation requires one student and one advisor",
            ),
            ApplicationError::Domain(DomainError::NotRoomParticipant) => ApiError::new(
                StatusCode::FORBIDDEN,
                "ACCESS_DENIED",
                "user is not a room participant",
            ),
            ApplicationError::Domain(err) => {
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", err.to_string())
            }
            ApplicationError::Repository(err) => {
                // 网关错误只记日志，对外是笼统的失败，绝不自动重试
                tracing::error!(error = %err, "persistence gateway error");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "storage operation failed",
                )
            }
            ApplicationError::Authentication => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                "authentication failed",
            ),
            ApplicationError::AccessDenied => ApiError::new(
                StatusCode::FORBIDDEN,
                "ACCESS_DENIED",
                "not a participant of this room",
            ),
            ApplicationError::NotFoundOrForbidden => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND_OR_FORBIDDEN",
                "resource missing or not owned by requester",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
