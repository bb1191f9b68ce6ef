//! Conversation model -> entity mapper

use huddle_core::entities::Conversation;

use crate::models::ConversationModel;

/// Convert ConversationModel to Conversation entity
impl From<ConversationModel> for Conversation {
    fn from(model: ConversationModel) -> Self {
        Conversation::new(model.id, model.workspace_id, model.name)
    }
}
