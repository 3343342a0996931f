use domain::{DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("authentication failed")]
    Authentication,
    #[error("access denied")]
    AccessDenied,
    /// 所有权过滤更新未命中任何行。"不存在"和"不是所有者"
    /// 折叠成同一个对外错误，避免泄露资源是否存在。
    #[error("not found or forbidden")]
    NotFoundOrForbidden,
}

impl ApplicationError {
    /// 下发给客户端的稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApplicationError::Domain(DomainError::InvalidArgument { .. })
            | ApplicationError::Domain(DomainError::InvalidParticipants) => "VALIDATION_FAILED",
            ApplicationError::Domain(DomainError::NotRoomParticipant) => "ACCESS_DENIED",
            ApplicationError::Domain(_) => "VALIDATION_FAILED",
            ApplicationError::Repository(_) => "PERSISTENCE_ERROR",
            ApplicationError::Authentication => "AUTHENTICATION_FAILED",
            ApplicationError::AccessDenied => "ACCESS_DENIED",
            ApplicationError::NotFoundOrForbidden => "NOT_FOUND_OR_FORBIDDEN",
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
