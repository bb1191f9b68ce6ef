//! Ports - interfaces the domain layer needs from infrastructure

mod directory;
mod memory_directory;

pub use directory::{Directory, RepoResult};
pub use memory_directory::MemoryDirectory;
