use async_trait::async_trait;
use domain::User;

use crate::error::ApplicationError;

/// 身份解析器：把签名凭证解析成用户记录。
///
/// socket 层的 authenticate 事件和 HTTP 层的 Authorization 头
/// 走的是同一个解析逻辑。纯查询，没有副作用；签名无效、过期
/// 或用户已不存在都视为认证失败。
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<User, ApplicationError>;
}
