//! Persistence: the store contract and its implementations.

mod file;
mod memory;
mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{PersistentStore, CATEGORIES_KEY, TIMERS_KEY};

use std::path::PathBuf;

/// Returns `~/.config/timerdeck[-dev]/` based on TIMERDECK_ENV.
///
/// Set TIMERDECK_ENV=dev to use the development data directory, or
/// TIMERDECK_DATA_DIR to pin an explicit path.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var("TIMERDECK_DATA_DIR") {
        Ok(explicit) => PathBuf::from(explicit),
        Err(_) => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TIMERDECK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("timerdeck-dev")
            } else {
                base_dir.join("timerdeck")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
