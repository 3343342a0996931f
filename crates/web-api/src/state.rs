use std::sync::Arc;

use application::{
    CallService, ChatService, ConnectionRegistry, IdentityResolver, PresenceRegistry, RoomService,
    TypingTracker,
};

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityResolver>,
    pub rooms: Arc<RoomService>,
    pub chat: Arc<ChatService>,
    pub typing: Arc<TypingTracker>,
    pub calls: Arc<CallService>,
    pub presence: Arc<PresenceRegistry>,
    pub registry: Arc<ConnectionRegistry>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        rooms: Arc<RoomService>,
        chat: Arc<ChatService>,
        typing: Arc<TypingTracker>,
        calls: Arc<CallService>,
        presence: Arc<PresenceRegistry>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            identity,
            rooms,
            chat,
            typing,
            calls,
            presence,
            registry,
        }
    }
}
