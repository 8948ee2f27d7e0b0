pub mod error;
pub mod hot_cache;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use store::{mutator, SessionMutator, SessionStore};
