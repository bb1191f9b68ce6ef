//! Conversation entity - a channel or DM inside a workspace

use serde::{Deserialize, Serialize};

use crate::value_objects::{ConversationId, WorkspaceId};

/// Conversation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub workspace_id: WorkspaceId,
    /// Display name; DMs may have none
    pub name: Option<String>,
}

impl Conversation {
    /// Create a new Conversation
    pub fn new(
        id: impl Into<ConversationId>,
        workspace_id: impl Into<WorkspaceId>,
        name: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            workspace_id: workspace_id.into(),
            name,
        }
    }
}
