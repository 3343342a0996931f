//! ScholarConnect 实时通信核心领域模型
//!
//! 包含聊天室、消息、在线状态、通话会话等核心实体，以及网关接口定义。

pub mod call_session;
pub mod chat_room;
pub mod errors;
pub mod events;
pub mod message;
pub mod presence;
pub mod read_receipt;
pub mod repository;
pub mod typing;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use call_session::*;
pub use chat_room::*;
pub use errors::*;
pub use events::*;
pub use message::*;
pub use presence::*;
pub use read_receipt::*;
pub use repository::*;
pub use typing::*;
pub use user::*;
pub use value_objects::*;
