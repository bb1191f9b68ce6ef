//! Database row models
//!
//! Only the columns the directory reads are mapped.

mod conversation;
mod user;

pub use conversation::ConversationModel;
pub use user::UserModel;
