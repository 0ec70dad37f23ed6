//! Persistent key-value slots for the music session.
//!
//! The session only ever stores three string values (access token, expiry,
//! PKCE verifier). [`SqliteStore`] keeps them in a small SQLite table under
//! the config directory; [`MemoryStore`] backs tests.

use async_trait::async_trait;

mod memory;
mod schema;
mod types;

pub use memory::MemoryStore;
pub use schema::SqliteStore;
pub use types::StoreError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
