//! # Timerdeck Core Library
//!
//! Core business logic for Timerdeck, a manager for named countdown timers
//! grouped into user-defined categories. The CLI binary is a thin
//! presentation layer over this library; any other frontend drives the same
//! engine the same way.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: owns the timer collection, runs per-timer tick
//!   schedules, applies start/pause/reset transitions individually and in
//!   bulk per category, and writes every state change through to storage
//! - [`CategoryRegistry`]: ordered, append-only category names, unique
//!   case-insensitively
//! - [`PersistentStore`]: asynchronous key-to-string storage contract, with
//!   a file-backed implementation for the app and an in-memory one for tests
//! - [`Event`]: state-change notifications presentation code subscribes to

pub mod category;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use category::{CategoryId, CategoryRegistry};
pub use error::{CoreError, Result, StorageError, ValidationError};
pub use events::Event;
pub use storage::{data_dir, FileStore, MemoryStore, PersistentStore, CATEGORIES_KEY, TIMERS_KEY};
pub use timer::{BulkAction, EngineSnapshot, TimerEngine, TimerRecord, TimerStatus, TICK_PERIOD};
