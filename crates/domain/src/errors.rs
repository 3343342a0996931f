//! 领域模型错误定义
//!
//! 定义了核心领域中所有可能的错误类型，提供清晰的错误上下文。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数验证错误
    #[error("验证失败: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 聊天室参与者角色不符合要求（必须是一名学生和一名导师）
    #[error("聊天室参与者角色不符合要求")]
    InvalidParticipants,

    /// 用户不是该聊天室的参与者
    #[error("用户不是该聊天室的参与者")]
    NotRoomParticipant,

    /// 聊天室不存在
    #[error("聊天室不存在")]
    RoomNotFound,

    /// 通话会话不存在
    #[error("通话会话不存在")]
    CallNotFound,

    /// 通话状态机不允许该转换
    #[error("通话状态不允许该操作: {action}")]
    InvalidCallTransition { action: &'static str },
}

impl DomainError {
    /// 创建参数验证错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 持久化网关错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 请求的行不存在
    #[error("requested row not found")]
    NotFound,

    /// 唯一性约束冲突
    #[error("row conflicts with an existing one")]
    Conflict,

    /// 底层存储错误
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
