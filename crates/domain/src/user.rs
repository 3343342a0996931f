//! 用户实体定义
//!
//! 用户由外部身份系统管理，本核心只读取。

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// 学生
    Student,
    /// 导师
    Advisor,
    /// 管理员
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Advisor => "advisor",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(UserRole::Student),
            "advisor" => Some(UserRole::Advisor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// 用户实体（对本核心只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// 用户唯一ID
    pub id: UserId,
    /// 显示名称
    pub name: String,
    /// 角色
    pub role: UserRole,
    /// 头像引用（可选）
    pub avatar_url: Option<String>,
}

impl User {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        role: UserRole,
        avatar_url: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            avatar_url,
        }
    }

    pub fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }

    pub fn is_advisor(&self) -> bool {
        self.role == UserRole::Advisor
    }
}
