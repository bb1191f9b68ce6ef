//! Domain entities - the records the fan-out core reads, never writes

mod conversation;
mod user;

pub use conversation::Conversation;
pub use user::User;
