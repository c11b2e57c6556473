mod engine;
mod record;

pub use engine::{BulkAction, EngineSnapshot, TimerEngine, TICK_PERIOD};
pub use record::{TimerRecord, TimerStatus};
