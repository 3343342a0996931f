//! 在线状态注册表
//!
//! 进程级的 用户 → 活动连接 映射。同一用户重复认证直接覆盖；
//! 每次上线都会递增该用户的连接代数（generation），下线时校验
//! 代数，过期连接迟到的断开处理不会把新连接标成离线。
//!
//! PresenceRecord 的持久化是尽力而为：写失败只记日志，不阻塞
//! 内存状态变更，也不阻塞上线/下线广播。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{ConnectionId, PresenceRecord, PresenceRepository, ServerEvent, UserId};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::registry::ConnectionRegistry;

struct PresenceEntry {
    connection_id: ConnectionId,
    generation: u64,
}

pub struct PresenceRegistry {
    entries: Mutex<HashMap<UserId, PresenceEntry>>,
    store: Arc<dyn PresenceRepository>,
    registry: Arc<ConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl PresenceRegistry {
    pub fn new(
        store: Arc<dyn PresenceRepository>,
        registry: Arc<ConnectionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store,
            registry,
            clock,
        }
    }

    /// 用户认证成功后登记上线，返回本次连接的代数。
    /// 重复认证是幂等覆盖：旧连接的记录被新连接顶掉。
    pub async fn register_online(&self, user_id: UserId, connection_id: ConnectionId) -> u64 {
        let generation = {
            let mut entries = self.entries.lock().await;
            let generation = entries
                .get(&user_id)
                .map(|entry| entry.generation + 1)
                .unwrap_or(1);
            entries.insert(
                user_id,
                PresenceEntry {
                    connection_id,
                    generation,
                },
            );
            generation
        };

        let now = self.clock.now();
        if let Err(err) = self.store.upsert(PresenceRecord::online(user_id, now)).await {
            tracing::warn!(error = %err, user_id = %user_id, "写入在线状态失败");
        }

        self.registry
            .broadcast_all(
                ServerEvent::UserOnline {
                    user_id: user_id.into(),
                },
                Some(connection_id),
            )
            .await;

        generation
    }

    /// 连接断开时登记下线。只有当传入的代数仍是该用户的当前
    /// 代数时才生效；被更新连接顶掉的老连接迟到断开时什么也不做。
    pub async fn register_offline(&self, user_id: UserId, generation: u64) {
        {
            let mut entries = self.entries.lock().await;
            match entries.get(&user_id) {
                Some(entry) if entry.generation == generation => {
                    entries.remove(&user_id);
                }
                _ => {
                    tracing::debug!(
                        user_id = %user_id,
                        generation,
                        "忽略过期连接的下线请求"
                    );
                    return;
                }
            }
        }

        let now = self.clock.now();
        if let Err(err) = self
            .store
            .upsert(PresenceRecord::offline(user_id, now))
            .await
        {
            tracing::warn!(error = %err, user_id = %user_id, "写入离线状态失败");
        }

        self.registry
            .broadcast_all(
                ServerEvent::UserOffline {
                    user_id: user_id.into(),
                    last_seen_at: now,
                },
                None,
            )
            .await;
    }

    /// 查询用户当前是否在线
    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.entries.lock().await.contains_key(&user_id)
    }

    /// 用户当前在线连接（测试/诊断用）
    pub async fn active_connection(&self, user_id: UserId) -> Option<ConnectionId> {
        self.entries
            .lock()
            .await
            .get(&user_id)
            .map(|entry| entry.connection_id)
    }
}
