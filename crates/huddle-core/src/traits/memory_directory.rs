//! In-process `Directory` backed by hash maps.
//!
//! Used by single-node development setups and by tests that need to grant or
//! revoke memberships between calls.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::directory::{Directory, RepoResult};
use crate::entities::{Conversation, User};
use crate::value_objects::{ConversationId, UserId, WorkspaceId};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    conversations: HashMap<ConversationId, Conversation>,
    workspace_members: HashMap<WorkspaceId, BTreeSet<UserId>>,
    conversation_members: HashMap<ConversationId, BTreeSet<UserId>>,
}

/// Mutable in-memory directory
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    tables: RwLock<Tables>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub fn add_user(&self, user: User) {
        self.tables.write().users.insert(user.id, user);
    }

    /// Insert or replace a conversation
    pub fn add_conversation(&self, conversation: Conversation) {
        self.tables
            .write()
            .conversations
            .insert(conversation.id, conversation);
    }

    /// Add a user to a workspace
    pub fn join_workspace(&self, workspace_id: WorkspaceId, user_id: UserId) {
        self.tables
            .write()
            .workspace_members
            .entry(workspace_id)
            .or_default()
            .insert(user_id);
    }

    /// Remove a user from a workspace
    pub fn leave_workspace(&self, workspace_id: WorkspaceId, user_id: UserId) {
        if let Some(members) = self.tables.write().workspace_members.get_mut(&workspace_id) {
            members.remove(&user_id);
        }
    }

    /// Add a user to a conversation
    pub fn join_conversation(&self, conversation_id: ConversationId, user_id: UserId) {
        self.tables
            .write()
            .conversation_members
            .entry(conversation_id)
            .or_default()
            .insert(user_id);
    }

    /// Remove a user from a conversation
    pub fn leave_conversation(&self, conversation_id: ConversationId, user_id: UserId) {
        if let Some(members) = self
            .tables
            .write()
            .conversation_members
            .get_mut(&conversation_id)
        {
            members.remove(&user_id);
        }
    }

    fn resolve(tables: &Tables, ids: impl IntoIterator<Item = UserId>) -> Vec<User> {
        ids.into_iter()
            .filter_map(|id| tables.users.get(&id).cloned())
            .collect()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_user(&self, id: UserId) -> RepoResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[UserId]) -> RepoResult<Vec<User>> {
        let tables = self.tables.read();
        Ok(Self::resolve(&tables, ids.iter().copied()))
    }

    async fn find_conversation(&self, id: ConversationId) -> RepoResult<Option<Conversation>> {
        Ok(self.tables.read().conversations.get(&id).cloned())
    }

    async fn is_conversation_member(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> RepoResult<bool> {
        Ok(self
            .tables
            .read()
            .conversation_members
            .get(&conversation_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn is_workspace_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> RepoResult<bool> {
        Ok(self
            .tables
            .read()
            .workspace_members
            .get(&workspace_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn workspace_members(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<User>> {
        let tables = self.tables.read();
        let ids = tables
            .workspace_members
            .get(&workspace_id)
            .cloned()
            .unwrap_or_default();
        Ok(Self::resolve(&tables, ids))
    }

    async fn conversation_members(
        &self,
        conversation_id: ConversationId,
    ) -> RepoResult<Vec<User>> {
        let tables = self.tables.read();
        let ids = tables
            .conversation_members
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        Ok(Self::resolve(&tables, ids))
    }

    async fn user_workspaces(&self, user_id: UserId) -> RepoResult<Vec<WorkspaceId>> {
        let mut workspaces: Vec<WorkspaceId> = self
            .tables
            .read()
            .workspace_members
            .iter()
            .filter(|(_, members)| members.contains(&user_id))
            .map(|(workspace_id, _)| *workspace_id)
            .collect();
        workspaces.sort_unstable();
        Ok(workspaces)
    }
}
