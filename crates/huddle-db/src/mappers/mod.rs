//! Model to entity mappers
//!
//! `From<Model> for Entity` conversions from database rows to `huddle-core` records.

mod conversation;
mod user;
