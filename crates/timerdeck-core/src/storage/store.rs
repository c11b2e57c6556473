use async_trait::async_trait;

use crate::error::StorageError;

/// Key for the persisted category name list (JSON array of strings).
pub const CATEGORIES_KEY: &str = "ListOfCategory";

/// Key for the persisted timer collection (JSON array of timer snapshots).
pub const TIMERS_KEY: &str = "Timers";

/// Asynchronous string-keyed storage, the durable source of truth.
///
/// The engine treats the backend as opaque: values are opaque strings in,
/// opaque strings out, and a missing key reads back as `None` rather than
/// an error.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
