//! 持久化网关的 PostgreSQL 实现

mod call_session_repository_impl;
mod chat_room_repository_impl;
mod message_repository_impl;
mod presence_repository_impl;
mod read_receipt_repository_impl;
mod typing_repository_impl;
mod user_store_impl;

pub use call_session_repository_impl::PgCallSessionRepository;
pub use chat_room_repository_impl::PgChatRoomRepository;
pub use message_repository_impl::PgMessageRepository;
pub use presence_repository_impl::PgPresenceRepository;
pub use read_receipt_repository_impl::PgReadReceiptRepository;
pub use typing_repository_impl::PgTypingRepository;
pub use user_store_impl::PgUserStore;
