//! 连接注册表
//!
//! 房间广播组的显式实现：一张 连接 → 发送句柄 的表，加一张
//! 房间 → 连接集合 的索引，不依赖任何传输层自带的分组原语，
//! 同样的扇出逻辑可以搬到任意长连接传输上。
//!
//! 所有发送都是 fire-and-forget：通过无界 mpsc 投递，不等待、
//! 不确认，对端已经消失时发送错误直接忽略（连接清理由断开
//! 路径负责）。

use std::collections::{HashMap, HashSet};

use domain::{ConnectionId, RoomId, ServerEvent, UserId};
use tokio::sync::{mpsc, RwLock};

/// 单个连接的出站事件通道
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

struct ConnectionHandle {
    user_id: UserId,
    sender: EventSender,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

/// 进程内的连接与房间订阅注册表
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 认证成功后登记连接
    pub async fn register(&self, connection_id: ConnectionId, user_id: UserId, sender: EventSender) {
        let mut inner = self.inner.write().await;
        inner
            .connections
            .insert(connection_id, ConnectionHandle { user_id, sender });
    }

    /// 连接断开时注销，并从所有房间索引中摘除
    pub async fn unregister(&self, connection_id: ConnectionId) {
        let mut inner = self.inner.write().await;
        inner.connections.remove(&connection_id);
        inner.rooms.retain(|_, members| {
            members.remove(&connection_id);
            !members.is_empty()
        });
    }

    /// 订阅单个房间的扇出
    pub async fn join_room(&self, connection_id: ConnectionId, room_id: RoomId) {
        let mut inner = self.inner.write().await;
        if inner.connections.contains_key(&connection_id) {
            inner.rooms.entry(room_id).or_default().insert(connection_id);
        }
    }

    /// 批量订阅（认证成功后把用户的全部房间挂上）
    pub async fn join_rooms(&self, connection_id: ConnectionId, room_ids: &[RoomId]) {
        let mut inner = self.inner.write().await;
        if !inner.connections.contains_key(&connection_id) {
            return;
        }
        for room_id in room_ids {
            inner.rooms.entry(*room_id).or_default().insert(connection_id);
        }
    }

    pub async fn leave_room(&self, connection_id: ConnectionId, room_id: RoomId) {
        let mut inner = self.inner.write().await;
        if let Some(members) = inner.rooms.get_mut(&room_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                inner.rooms.remove(&room_id);
            }
        }
    }

    /// 查询连接归属的用户
    pub async fn connection_user(&self, connection_id: ConnectionId) -> Option<UserId> {
        let inner = self.inner.read().await;
        inner
            .connections
            .get(&connection_id)
            .map(|handle| handle.user_id)
    }

    /// 发给单个连接
    pub async fn send_to_connection(&self, connection_id: ConnectionId, event: ServerEvent) {
        let inner = self.inner.read().await;
        if let Some(handle) = inner.connections.get(&connection_id) {
            let _ = handle.sender.send(event);
        }
    }

    /// 发给某个用户的全部连接
    pub async fn send_to_user(&self, user_id: UserId, event: ServerEvent) {
        let inner = self.inner.read().await;
        for handle in inner.connections.values() {
            if handle.user_id == user_id {
                let _ = handle.sender.send(event.clone());
            }
        }
    }

    /// 房间扇出，`except` 用于排除触发者自己的连接
    pub async fn broadcast_room(
        &self,
        room_id: RoomId,
        event: ServerEvent,
        except: Option<ConnectionId>,
    ) {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(&room_id) else {
            return;
        };
        for connection_id in members {
            if Some(*connection_id) == except {
                continue;
            }
            if let Some(handle) = inner.connections.get(connection_id) {
                let _ = handle.sender.send(event.clone());
            }
        }
    }

    /// 全局广播（上线/下线通知）
    pub async fn broadcast_all(&self, event: ServerEvent, except: Option<ConnectionId>) {
        let inner = self.inner.read().await;
        for (connection_id, handle) in &inner.connections {
            if Some(*connection_id) == except {
                continue;
            }
            let _ = handle.sender.send(event.clone());
        }
    }

    /// 当前登记的连接数（统计/测试用）
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }
}
