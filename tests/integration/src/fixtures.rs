//! Test fixtures
//!
//! One workspace with three members and two conversations:
//!
//! | conversation | members       |
//! |--------------|---------------|
//! | 42 "general" | Alice, Bob    |
//! | 43 "random"  | Carol         |

use std::sync::Arc;

use huddle_core::{Conversation, ConversationId, MemoryDirectory, User, UserId, WorkspaceId};

/// Signing secret shared by the test server and token helpers
pub const TEST_JWT_SECRET: &str = "integration-test-secret";

pub const WORKSPACE: i64 = 1;
pub const GENERAL: i64 = 42;
pub const RANDOM: i64 = 43;

pub fn alice() -> User {
    User::new(1, "Alice")
}

pub fn bob() -> User {
    User::new(2, "Bob")
}

pub fn carol() -> User {
    User::new(3, "Carol")
}

/// Directory seeded with the fixture workspace
pub fn seeded_directory() -> Arc<MemoryDirectory> {
    let directory = Arc::new(MemoryDirectory::new());
    let workspace = WorkspaceId::new(WORKSPACE);

    for user in [alice(), bob(), carol()] {
        directory.join_workspace(workspace, user.id);
        directory.add_user(user);
    }

    directory.add_conversation(Conversation::new(GENERAL, WORKSPACE, Some("general".to_string())));
    directory.add_conversation(Conversation::new(RANDOM, WORKSPACE, Some("random".to_string())));
    directory.join_conversation(ConversationId::new(GENERAL), UserId::new(1));
    directory.join_conversation(ConversationId::new(GENERAL), UserId::new(2));
    directory.join_conversation(ConversationId::new(RANDOM), UserId::new(3));

    directory
}
