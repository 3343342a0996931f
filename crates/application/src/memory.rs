//! 内存实现的持久化网关（用于测试）
//!
//! 和 Postgres 实现遵守同样的过滤更新语义，集成测试不需要
//! 真实数据库就能跑通整条链路。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    CallId, CallSession, CallStatus, ChatRoom, ChatRoomRepository, Message, MessageId,
    MessageRepository, PresenceRecord, PresenceRepository, ReadReceipt, ReadReceiptRepository,
    RepositoryResult, RoomId, Timestamp, TypingIndicator, TypingRepository, User, UserId,
    UserStore,
};
use tokio::sync::RwLock;

/// 内存用户存储
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

/// 内存聊天室存储
#[derive(Default)]
pub struct MemoryChatRoomRepository {
    rooms: RwLock<HashMap<RoomId, ChatRoom>>,
}

impl MemoryChatRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatRoomRepository for MemoryChatRoomRepository {
    async fn create(&self, room: ChatRoom) -> RepositoryResult<ChatRoom> {
        self.rooms.write().await.insert(room.id, room.clone());
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> RepositoryResult<Option<ChatRoom>> {
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn find_by_participants(
        &self,
        student_id: UserId,
        advisor_id: UserId,
    ) -> RepositoryResult<Option<ChatRoom>> {
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .find(|room| room.student_id == student_id && room.advisor_id == advisor_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<ChatRoom>> {
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .filter(|room| room.is_participant(user_id))
            .cloned()
            .collect())
    }

    async fn touch_activity(&self, id: RoomId, at: Timestamp) -> RepositoryResult<()> {
        if let Some(room) = self.rooms.write().await.get_mut(&id) {
            room.touch(at);
        }
        Ok(())
    }
}

/// 内存消息存储
#[derive(Default)]
pub struct MemoryMessageRepository {
    messages: RwLock<HashMap<MessageId, Message>>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: MessageId) -> Option<Message> {
        self.messages.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: Message) -> RepositoryResult<Message> {
        self.messages
            .write()
            .await
            .insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn list_recent(
        &self,
        room_id: RoomId,
        limit: u32,
        before: Option<MessageId>,
    ) -> RepositoryResult<Vec<Message>> {
        let messages = self.messages.read().await;

        let cutoff = match before {
            Some(id) => messages.get(&id).map(|m| m.created_at),
            None => None,
        };

        let mut rows: Vec<Message> = messages
            .values()
            .filter(|m| m.room_id == room_id)
            .filter(|m| cutoff.map(|at| m.created_at < at).unwrap_or(true))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn update_content(
        &self,
        id: MessageId,
        sender_id: UserId,
        content: &str,
        edited_at: Timestamp,
    ) -> RepositoryResult<Option<Message>> {
        let mut messages = self.messages.write().await;
        match messages.get_mut(&id) {
            Some(message) if message.sender_id == sender_id => {
                message.content = content.to_owned();
                message.is_edited = true;
                message.edited_at = Some(edited_at);
                Ok(Some(message.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_by_sender(&self, id: MessageId, sender_id: UserId) -> RepositoryResult<bool> {
        let mut messages = self.messages.write().await;
        match messages.get(&id) {
            Some(message) if message.sender_id == sender_id => {
                messages.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_read(
        &self,
        room_id: RoomId,
        message_ids: &[MessageId],
        receiver_id: UserId,
    ) -> RepositoryResult<Vec<MessageId>> {
        let mut messages = self.messages.write().await;
        let mut flipped = Vec::new();
        for id in message_ids {
            if let Some(message) = messages.get_mut(id) {
                if message.room_id == room_id
                    && message.receiver_id == receiver_id
                    && !message.is_read
                {
                    message.mark_read();
                    flipped.push(*id);
                }
            }
        }
        Ok(flipped)
    }

    async fn mark_delivered(&self, room_id: RoomId, receiver_id: UserId) -> RepositoryResult<u64> {
        let mut messages = self.messages.write().await;
        let mut affected = 0;
        for message in messages.values_mut() {
            if message.room_id == room_id
                && message.receiver_id == receiver_id
                && !message.is_delivered
            {
                message.mark_delivered();
                affected += 1;
            }
        }
        Ok(affected)
    }
}

/// 内存已读回执存储
#[derive(Default)]
pub struct MemoryReadReceiptRepository {
    receipts: RwLock<HashMap<(MessageId, UserId), ReadReceipt>>,
}

impl MemoryReadReceiptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, message_id: MessageId, user_id: UserId) -> Option<ReadReceipt> {
        self.receipts
            .read()
            .await
            .get(&(message_id, user_id))
            .cloned()
    }

    pub async fn count(&self) -> usize {
        self.receipts.read().await.len()
    }
}

#[async_trait]
impl ReadReceiptRepository for MemoryReadReceiptRepository {
    async fn upsert_many(&self, receipts: &[ReadReceipt]) -> RepositoryResult<()> {
        let mut map = self.receipts.write().await;
        for receipt in receipts {
            map.insert((receipt.message_id, receipt.user_id), receipt.clone());
        }
        Ok(())
    }
}

/// 内存在线状态存储
#[derive(Default)]
pub struct MemoryPresenceRepository {
    records: RwLock<HashMap<UserId, PresenceRecord>>,
}

impl MemoryPresenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: UserId) -> Option<PresenceRecord> {
        self.records.read().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl PresenceRepository for MemoryPresenceRepository {
    async fn upsert(&self, record: PresenceRecord) -> RepositoryResult<()> {
        self.records.write().await.insert(record.user_id, record);
        Ok(())
    }
}

/// 内存输入状态存储
#[derive(Default)]
pub struct MemoryTypingRepository {
    rows: RwLock<HashMap<(RoomId, UserId), TypingIndicator>>,
}

impl MemoryTypingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, room_id: RoomId, user_id: UserId) -> bool {
        self.rows.read().await.contains_key(&(room_id, user_id))
    }
}

#[async_trait]
impl TypingRepository for MemoryTypingRepository {
    async fn upsert(&self, indicator: TypingIndicator) -> RepositoryResult<()> {
        self.rows
            .write()
            .await
            .insert((indicator.room_id, indicator.user_id), indicator);
        Ok(())
    }

    async fn delete(&self, room_id: RoomId, user_id: UserId) -> RepositoryResult<()> {
        self.rows.write().await.remove(&(room_id, user_id));
        Ok(())
    }

    async fn delete_for_user(&self, user_id: UserId) -> RepositoryResult<Vec<RoomId>> {
        let mut rows = self.rows.write().await;
        let rooms: Vec<RoomId> = rows
            .keys()
            .filter(|(_, uid)| *uid == user_id)
            .map(|(room_id, _)| *room_id)
            .collect();
        for room_id in &rooms {
            rows.remove(&(*room_id, user_id));
        }
        Ok(rooms)
    }
}

/// 内存通话会话存储
#[derive(Default)]
pub struct MemoryCallSessionRepository {
    sessions: RwLock<HashMap<CallId, CallSession>>,
}

impl MemoryCallSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: CallId) -> Option<CallSession> {
        self.sessions.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl domain::CallSessionRepository for MemoryCallSessionRepository {
    async fn create(&self, session: CallSession) -> RepositoryResult<CallSession> {
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: CallId) -> RepositoryResult<Option<CallSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn accept(
        &self,
        id: CallId,
        participant_id: UserId,
        started_at: Timestamp,
    ) -> RepositoryResult<Option<CallSession>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session)
                if session.status == CallStatus::Ringing
                    && session.participant_id == participant_id =>
            {
                session.status = CallStatus::Active;
                session.started_at = Some(started_at);
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn reject(&self, id: CallId, ended_at: Timestamp) -> RepositoryResult<Option<CallSession>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if session.status == CallStatus::Ringing => {
                session.status = CallStatus::Ended;
                session.ended_at = Some(ended_at);
                Ok(Some(session.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn finish(&self, updated: &CallSession) -> RepositoryResult<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&updated.id) {
            session.status = updated.status;
            session.ended_at = updated.ended_at;
            session.duration_seconds = updated.duration_seconds;
        }
        Ok(())
    }
}
