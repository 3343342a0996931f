//! 应用服务层
//!
//! 把领域模型和持久化网关、连接注册表组合成实时核心的各个子系统：
//! 房间成员管理、消息分发、输入指示、在线状态、通话信令。

pub mod calls;
pub mod chat;
pub mod clock;
pub mod error;
pub mod identity;
pub mod memory;
pub mod presence;
pub mod registry;
pub mod rooms;
pub mod typing;

pub use calls::{CallService, CallServiceDependencies};
pub use chat::{ChatService, ChatServiceDependencies, SendMessageRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ApplicationError;
pub use identity::IdentityResolver;
pub use presence::PresenceRegistry;
pub use registry::{ConnectionRegistry, EventSender};
pub use rooms::{RoomService, RoomServiceDependencies};
pub use typing::TypingTracker;
