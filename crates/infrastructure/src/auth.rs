//! JWT 身份解析实现
//!
//! 把签名的 bearer 凭证解析成用户记录。socket 的 authenticate
//! 事件和 HTTP 的 Authorization 头共用这一个解析器。
//! 签名无效、已过期、或用户已不存在，一律视为认证失败。

use std::sync::Arc;

use application::{ApplicationError, IdentityResolver};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use domain::{User, UserId, UserStore};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

/// JWT 载荷
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID
    pub sub: String,
    /// 过期时间（unix 秒）
    pub exp: i64,
    /// 签发时间（unix 秒）
    pub iat: i64,
}

pub struct JwtIdentityResolver {
    config: JwtConfig,
    users: Arc<dyn UserStore>,
}

impl JwtIdentityResolver {
    pub fn new(config: JwtConfig, users: Arc<dyn UserStore>) -> Self {
        Self { config, users }
    }

    /// 为用户签发凭证。登录流程在本核心之外，这个入口主要服务于
    /// 测试和运维脚本。
    pub fn issue_token(&self, user_id: UserId) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::hours(self.config.expiration_hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, ApplicationError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            tracing::debug!(error = %err, "凭证解码失败");
            ApplicationError::Authentication
        })
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<User, ApplicationError> {
        let claims = self.decode_claims(credential)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map(UserId::from)
            .map_err(|_| ApplicationError::Authentication)?;

        // 凭证有效但用户已被删除：同样按认证失败处理
        self.users
            .find_by_id(user_id)
            .await
            .map_err(|_| ApplicationError::Authentication)?
            .ok_or(ApplicationError::Authentication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::memory::MemoryUserStore;
    use domain::UserRole;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-with-enough-length".to_string(),
            expiration_hours: 24,
        }
    }

    async fn resolver_with_user() -> (JwtIdentityResolver, UserId) {
        let users = Arc::new(MemoryUserStore::new());
        let user = User::new(
            UserId::from(Uuid::new_v4()),
            "Amina",
            UserRole::Student,
            None,
        );
        let user_id = user.id;
        users.insert(user).await;
        (JwtIdentityResolver::new(config(), users), user_id)
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let (resolver, user_id) = resolver_with_user().await;
        let token = resolver.issue_token(user_id).unwrap();

        let user = resolver.resolve(&token).await.unwrap();
        assert_eq!(user.id, user_id);
    }

    #[tokio::test]
    async fn test_garbage_token_fails() {
        let (resolver, _) = resolver_with_user().await;
        let err = resolver.resolve("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));
    }

    #[tokio::test]
    async fn test_wrong_secret_fails() {
        let (resolver, user_id) = resolver_with_user().await;
        let other = JwtIdentityResolver::new(
            JwtConfig {
                secret: "a-completely-different-secret-key".to_string(),
                expiration_hours: 24,
            },
            Arc::new(MemoryUserStore::new()),
        );
        let token = other.issue_token(user_id).unwrap();

        let err = resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));
    }

    #[tokio::test]
    async fn test_vanished_user_fails() {
        let users = Arc::new(MemoryUserStore::new());
        let resolver = JwtIdentityResolver::new(config(), users);
        // 签出的凭证有效，但用户记录不存在
        let token = resolver.issue_token(UserId::from(Uuid::new_v4())).unwrap();

        let err = resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));
    }

    #[tokio::test]
    async fn test_expired_token_fails() {
        let users = Arc::new(MemoryUserStore::new());
        let user = User::new(UserId::from(Uuid::new_v4()), "Amina", UserRole::Student, None);
        let user_id = user.id;
        users.insert(user).await;

        let resolver = JwtIdentityResolver::new(
            JwtConfig {
                secret: "test-secret-key-with-enough-length".to_string(),
                expiration_hours: -1,
            },
            users,
        );
        let token = resolver.issue_token(user_id).unwrap();

        let err = resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Authentication));
    }
}
