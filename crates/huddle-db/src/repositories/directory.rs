//! PostgreSQL implementation of Directory

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use huddle_core::entities::{Conversation, User};
use huddle_core::traits::{Directory, RepoResult};
use huddle_core::value_objects::{ConversationId, UserId, WorkspaceId};

use crate::models::{ConversationModel, UserModel};

use super::error::map_db_error;

/// PostgreSQL implementation of Directory
///
/// Every call is a live query; nothing is cached between requests.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    /// Create a new PgDirectory
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for PgDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDirectory").finish_non_exhaustive()
    }
}

#[async_trait]
impl Directory for PgDirectory {
    #[instrument(skip(self))]
    async fn find_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, name
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_users(&self, ids: &[UserId]) -> RepoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw_ids: Vec<i64> = ids.iter().map(|id| id.into_inner()).collect();

        // Keep the caller's order; ids without a row are skipped
        let models = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT u.id, u.name
            FROM unnest($1::bigint[]) WITH ORDINALITY AS wanted(id, position)
            JOIN users u ON u.id = wanted.id
            ORDER BY wanted.position
            "#,
        )
        .bind(&raw_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(models.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_conversation(&self, id: ConversationId) -> RepoResult<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationModel>(
            r#"
            SELECT c.id, c.workspace_id, c.name
            FROM conversations c
            JOIN workspaces w ON w.id = c.workspace_id AND w.deleted_at IS NULL
            WHERE c.id = $1 AND c.deleted_at IS NULL
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Conversation::from))
    }

    #[instrument(skip(self))]
    async fn is_conversation_member(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM conversation_members cm
                JOIN conversations c ON c.id = cm.conversation_id AND c.deleted_at IS NULL
                WHERE cm.conversation_id = $1 AND cm.user_id = $2
            )
            "#,
        )
        .bind(conversation_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn is_workspace_member(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM workspace_members wm
                JOIN workspaces w ON w.id = wm.workspace_id AND w.deleted_at IS NULL
                WHERE wm.workspace_id = $1 AND wm.user_id = $2
            )
            "#,
        )
        .bind(workspace_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn workspace_members(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<User>> {
        let models = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT u.id, u.name
            FROM workspace_members wm
            JOIN users u ON u.id = wm.user_id
            WHERE wm.workspace_id = $1
            ORDER BY u.id
            "#,
        )
        .bind(workspace_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(models.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn conversation_members(
        &self,
        conversation_id: ConversationId,
    ) -> RepoResult<Vec<User>> {
        let models = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT u.id, u.name
            FROM conversation_members cm
            JOIN users u ON u.id = cm.user_id
            WHERE cm.conversation_id = $1
            ORDER BY u.id
            "#,
        )
        .bind(conversation_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(models.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self))]
    async fn user_workspaces(&self, user_id: UserId) -> RepoResult<Vec<WorkspaceId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT wm.workspace_id
            FROM workspace_members wm
            JOIN workspaces w ON w.id = wm.workspace_id AND w.deleted_at IS NULL
            WHERE wm.user_id = $1
            ORDER BY wm.workspace_id
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(WorkspaceId::new).collect())
    }
}
