//! HTTP 层的身份解析
//!
//! Authorization: Bearer 头走和 socket authenticate 事件同一个
//! 解析器，只是取凭证的途径不同。

use axum::{extract::FromRequestParts, http::request::Parts};
use domain::User;

use crate::error::ApiError;
use crate::state::AppState;

/// 已认证的当前用户，REST 处理器的提取器。
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("expected bearer credential"))?;

        let user = state.identity.resolve(token).await?;
        Ok(CurrentUser(user))
    }
}
