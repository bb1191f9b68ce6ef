//! Conversation database model

use sqlx::FromRow;

/// Database model for conversations table
#[derive(Debug, Clone, FromRow)]
pub struct ConversationModel {
    pub id: i64,
    pub workspace_id: i64,
    pub name: Option<String>,
}
