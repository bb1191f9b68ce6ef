//! Directory port - membership and identity lookups
//!
//! The fan-out core never owns users, workspaces, or conversations. It asks the
//! persistence layer through this trait, live, on every check: membership can change
//! between two requests and nothing here is cached.

use async_trait::async_trait;

use crate::entities::{Conversation, User};
use crate::error::DomainError;
use crate::value_objects::{ConversationId, UserId, WorkspaceId};

/// Result type for directory operations
pub type RepoResult<T> = Result<T, DomainError>;

#[async_trait]
pub trait Directory: Send + Sync {
    /// Find a user by ID
    async fn find_user(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Resolve many users at once. Unknown ids are skipped; order follows `ids`.
    async fn find_users(&self, ids: &[UserId]) -> RepoResult<Vec<User>>;

    /// Find a conversation by ID
    async fn find_conversation(&self, id: ConversationId) -> RepoResult<Option<Conversation>>;

    /// Check whether a user is a member of a conversation.
    /// Returns `false` when the conversation does not exist.
    async fn is_conversation_member(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> RepoResult<bool>;

    /// Check whether a user is a member of a workspace.
    /// Returns `false` when the workspace does not exist.
    async fn is_workspace_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> RepoResult<bool>;

    /// All members of a workspace
    async fn workspace_members(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<User>>;

    /// All members of a conversation
    async fn conversation_members(&self, conversation_id: ConversationId)
        -> RepoResult<Vec<User>>;

    /// Workspaces the user belongs to
    async fn user_workspaces(&self, user_id: UserId) -> RepoResult<Vec<WorkspaceId>>;
}
