//! User entity - the slice of a user account that events carry

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// User record as resolved from the directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

impl User {
    /// Create a new User
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
