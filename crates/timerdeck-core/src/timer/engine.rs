//! Timer lifecycle and bulk-group synchronization engine.
//!
//! The engine is the sole owner of the in-memory timer collection, the
//! category registry, and every live tick schedule. All mutation goes
//! through the transition operations here; presentation code only ever
//! holds read snapshots.
//!
//! ## State Transitions
//!
//! ```text
//! NotStarted -> InProgress -> (Paused | Completed)
//! Paused     -> InProgress
//! any        -> NotStarted   (reset)
//! ```
//!
//! Each running timer is a spawned task ticking on a one-second interval.
//! A schedule entry exists in the engine's handle map exactly while its
//! record is `InProgress`; the handles are never serialized. Every
//! transition that changes persisted fields writes the full collection
//! through to the store, serialized from live state at write time, so
//! concurrent ticks of different timers cannot clobber each other's
//! persisted values.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::warn;

use crate::category::{CategoryId, CategoryRegistry};
use crate::error::ValidationError;
use crate::events::Event;
use crate::storage::{PersistentStore, CATEGORIES_KEY, TIMERS_KEY};
use crate::timer::record::{TimerRecord, TimerStatus};

/// One countdown step per period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Transition a bulk command applies to every timer in a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Start,
    Pause,
    Reset,
}

/// Read-only view of engine state, returned by every command.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub categories: Vec<CategoryId>,
    pub timers: Vec<TimerRecord>,
}

/// The only key a schedule is ever filed under. Timer names are unique per
/// category, not globally, so bare names cannot identify a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TimerKey {
    category: CategoryId,
    name: String,
}

#[derive(Default)]
struct EngineState {
    categories: CategoryRegistry,
    timers: Vec<TimerRecord>,
    /// category -> timer names, insertion order. Maintained incrementally
    /// on add so bulk operations and per-category views need no rescans.
    by_category: HashMap<CategoryId, Vec<String>>,
    /// Live tick tasks. An entry exists iff the record is `InProgress`.
    schedules: HashMap<TimerKey, JoinHandle<()>>,
}

impl EngineState {
    fn find_mut(&mut self, key: &TimerKey) -> Option<&mut TimerRecord> {
        self.timers
            .iter_mut()
            .find(|t| t.category == key.category && t.name == key.name)
    }

    /// First record matching a bare name, in insertion order. Duplicate
    /// names across categories are allowed; ties go to the older timer.
    fn key_by_name(&self, name: &str) -> Result<TimerKey, ValidationError> {
        self.timers
            .iter()
            .find(|t| t.name == name)
            .map(|t| TimerKey {
                category: t.category.clone(),
                name: t.name.clone(),
            })
            .ok_or_else(|| ValidationError::UnknownTimer(name.to_string()))
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            categories: self.categories.names().to_vec(),
            timers: self.timers.clone(),
        }
    }

    fn rebuild_index(&mut self) {
        self.by_category.clear();
        for id in self.categories.names() {
            self.by_category.entry(id.clone()).or_default();
        }
        for t in &self.timers {
            self.by_category
                .entry(t.category.clone())
                .or_default()
                .push(t.name.clone());
        }
    }
}

struct Inner {
    state: Mutex<EngineState>,
    /// Serializes write-throughs: snapshots are taken from live state once
    /// this lock is held, so persisted writes land in acquisition order and
    /// each carries every transition applied before it.
    write_lock: Mutex<()>,
    store: Arc<dyn PersistentStore>,
    events: broadcast::Sender<Event>,
}

/// Cloneable handle to the engine. All clones share one state.
#[derive(Clone)]
pub struct TimerEngine {
    inner: Arc<Inner>,
}

impl TimerEngine {
    /// Fresh engine with no categories or timers.
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(EngineState::default()),
                write_lock: Mutex::new(()),
                store,
                events,
            }),
        }
    }

    /// Rehydrate from the store.
    ///
    /// Missing, unreadable, or undecodable payloads are logged and treated
    /// as empty -- the next successful write-through replaces them. Records
    /// persisted as `InProgress` come back `Paused`: no tick schedule
    /// survives a restart, and a running status without a schedule would
    /// break the engine's bookkeeping.
    pub async fn load(store: Arc<dyn PersistentStore>) -> Self {
        let engine = Self::new(store);
        {
            let mut state = engine.inner.state.lock().await;
            if let Some(categories) =
                read_json::<CategoryRegistry>(&*engine.inner.store, CATEGORIES_KEY).await
            {
                state.categories = categories;
                state.categories.dedup();
            }
            if let Some(timers) =
                read_json::<Vec<TimerRecord>>(&*engine.inner.store, TIMERS_KEY).await
            {
                state.timers = timers;
                for t in &mut state.timers {
                    if t.status == TimerStatus::InProgress {
                        t.status = TimerStatus::Paused;
                    }
                    // Repair out-of-range payloads rather than rejecting the
                    // whole collection.
                    if t.remaining_duration > t.total_duration {
                        t.remaining_duration = t.total_duration;
                    }
                    if t.remaining_duration == 0 {
                        t.status = TimerStatus::Completed;
                    } else if t.status == TimerStatus::Completed {
                        t.status = TimerStatus::Paused;
                    }
                }
            }
            state.rebuild_index();
        }
        engine
    }

    /// Subscribe to state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> EngineSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    pub async fn categories(&self) -> Vec<CategoryId> {
        self.inner.state.lock().await.categories.names().to_vec()
    }

    /// Timers of one category, in creation order.
    pub async fn timers_in(&self, category: &str) -> Result<Vec<TimerRecord>, ValidationError> {
        let state = self.inner.state.lock().await;
        let probe = CategoryId::new(category)?;
        let category = state
            .categories
            .canonical(&probe)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownCategory(probe.as_str().to_string()))?;
        let names = state.by_category.get(&category).cloned().unwrap_or_default();
        Ok(names
            .iter()
            .filter_map(|name| {
                state
                    .timers
                    .iter()
                    .find(|t| t.category == category && &t.name == name)
                    .cloned()
            })
            .collect())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Register a category. The name is trimmed; blank input and
    /// case-insensitive duplicates are rejected without a state change.
    pub async fn add_category(&self, name: &str) -> Result<EngineSnapshot, ValidationError> {
        let (snapshot, event) = {
            let mut state = self.inner.state.lock().await;
            let id = state.categories.add(name)?;
            state.by_category.entry(id.clone()).or_default();
            (
                state.snapshot(),
                Event::CategoryAdded {
                    category: id,
                    at: Utc::now(),
                },
            )
        };
        self.inner.emit(event);
        self.inner.persist_categories().await;
        Ok(snapshot)
    }

    /// Create a timer in an existing category. Names are unique within the
    /// category; the same name may exist in other categories.
    pub async fn add_timer(
        &self,
        name: &str,
        duration_secs: u64,
        category: &str,
    ) -> Result<EngineSnapshot, ValidationError> {
        let (snapshot, event) = {
            let mut state = self.inner.state.lock().await;
            let probe = CategoryId::new(category)?;
            let category = state
                .categories
                .canonical(&probe)
                .cloned()
                .ok_or_else(|| ValidationError::UnknownCategory(probe.as_str().to_string()))?;
            let record = TimerRecord::new(name, duration_secs, category.clone())?;
            let taken = state
                .by_category
                .get(&category)
                .is_some_and(|names| names.iter().any(|n| n == &record.name));
            if taken {
                return Err(ValidationError::DuplicateTimer {
                    category: category.as_str().to_string(),
                    name: record.name,
                });
            }
            state
                .by_category
                .entry(category.clone())
                .or_default()
                .push(record.name.clone());
            let event = Event::TimerAdded {
                category,
                name: record.name.clone(),
                duration_secs,
                at: Utc::now(),
            };
            state.timers.push(record);
            (state.snapshot(), event)
        };
        self.inner.emit(event);
        self.inner.persist_timers().await;
        Ok(snapshot)
    }

    pub async fn start_timer(&self, name: &str) -> Result<EngineSnapshot, ValidationError> {
        self.apply_by_name(name, BulkAction::Start).await
    }

    pub async fn pause_timer(&self, name: &str) -> Result<EngineSnapshot, ValidationError> {
        self.apply_by_name(name, BulkAction::Pause).await
    }

    pub async fn reset_timer(&self, name: &str) -> Result<EngineSnapshot, ValidationError> {
        self.apply_by_name(name, BulkAction::Reset).await
    }

    /// Apply one transition to every timer in a category.
    ///
    /// Uses the identical per-record helpers as the individual commands,
    /// under a single lock acquisition, so a bulk start can never race an
    /// individual start into a second schedule for the same record.
    pub async fn bulk_apply(
        &self,
        category: &str,
        action: BulkAction,
    ) -> Result<EngineSnapshot, ValidationError> {
        let (snapshot, events) = {
            let mut state = self.inner.state.lock().await;
            let probe = CategoryId::new(category)?;
            let category = state
                .categories
                .canonical(&probe)
                .cloned()
                .ok_or_else(|| ValidationError::UnknownCategory(probe.as_str().to_string()))?;
            let names = state.by_category.get(&category).cloned().unwrap_or_default();
            let mut events = Vec::new();
            for name in names {
                let key = TimerKey {
                    category: category.clone(),
                    name,
                };
                events.extend(self.inner.apply_locked(&mut state, &key, action));
            }
            (state.snapshot(), events)
        };
        let changed = !events.is_empty();
        for event in events {
            self.inner.emit(event);
        }
        if changed {
            self.inner.persist_timers().await;
        }
        Ok(snapshot)
    }

    async fn apply_by_name(
        &self,
        name: &str,
        action: BulkAction,
    ) -> Result<EngineSnapshot, ValidationError> {
        let (snapshot, event) = {
            let mut state = self.inner.state.lock().await;
            let key = state.key_by_name(name)?;
            let event = self.inner.apply_locked(&mut state, &key, action);
            (state.snapshot(), event)
        };
        if let Some(event) = event {
            self.inner.emit(event);
            self.inner.persist_timers().await;
        }
        Ok(snapshot)
    }
}

impl Inner {
    fn emit(&self, event: Event) {
        // No subscribers is fine; events are fire-and-forget.
        let _ = self.events.send(event);
    }

    fn apply_locked(
        self: &Arc<Self>,
        state: &mut EngineState,
        key: &TimerKey,
        action: BulkAction,
    ) -> Option<Event> {
        match action {
            BulkAction::Start => self.start_locked(state, key),
            BulkAction::Pause => self.pause_locked(state, key),
            BulkAction::Reset => self.reset_locked(state, key),
        }
    }

    /// Idempotent start: an `InProgress` record already owns a schedule,
    /// and a `Completed` one has nothing left to count (reset first).
    fn start_locked(
        self: &Arc<Self>,
        state: &mut EngineState,
        key: &TimerKey,
    ) -> Option<Event> {
        let record = state.find_mut(key)?;
        if matches!(record.status, TimerStatus::InProgress | TimerStatus::Completed) {
            return None;
        }
        record.status = TimerStatus::InProgress;
        let event = Event::TimerStarted {
            category: key.category.clone(),
            name: key.name.clone(),
            remaining_secs: record.remaining_duration,
            at: Utc::now(),
        };
        debug_assert!(!state.schedules.contains_key(key));
        let handle = self.spawn_schedule(key.clone());
        state.schedules.insert(key.clone(), handle);
        Some(event)
    }

    fn pause_locked(
        self: &Arc<Self>,
        state: &mut EngineState,
        key: &TimerKey,
    ) -> Option<Event> {
        let record = state.find_mut(key)?;
        if record.status != TimerStatus::InProgress {
            return None;
        }
        record.status = TimerStatus::Paused;
        let remaining = record.remaining_duration;
        if let Some(handle) = state.schedules.remove(key) {
            handle.abort();
        }
        Some(Event::TimerPaused {
            category: key.category.clone(),
            name: key.name.clone(),
            remaining_secs: remaining,
            at: Utc::now(),
        })
    }

    fn reset_locked(
        self: &Arc<Self>,
        state: &mut EngineState,
        key: &TimerKey,
    ) -> Option<Event> {
        let record = state.find_mut(key)?;
        let already_pristine = record.status == TimerStatus::NotStarted
            && record.remaining_duration == record.total_duration;
        record.remaining_duration = record.total_duration;
        record.status = TimerStatus::NotStarted;
        if let Some(handle) = state.schedules.remove(key) {
            handle.abort();
        }
        if already_pristine {
            return None;
        }
        Some(Event::TimerReset {
            category: key.category.clone(),
            name: key.name.clone(),
            at: Utc::now(),
        })
    }

    fn spawn_schedule(self: &Arc<Self>, key: TimerKey) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval(TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // An interval's first tick fires immediately; swallow it so the
            // first countdown step lands one full period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !Inner::apply_tick(&inner, &key).await {
                    break;
                }
            }
        })
    }

    /// One countdown step. Returns false when the schedule must stop.
    async fn apply_tick(inner: &Arc<Self>, key: &TimerKey) -> bool {
        let (event, keep_going) = {
            let mut state = inner.state.lock().await;
            let Some(record) = state.find_mut(key) else {
                return false;
            };
            // Liveness guard: a tick queued across a pause/reset must not
            // fire against the stale schedule.
            if record.status != TimerStatus::InProgress {
                return false;
            }
            record.remaining_duration = record.remaining_duration.saturating_sub(1);
            if record.remaining_duration == 0 {
                record.status = TimerStatus::Completed;
                let event = Event::TimerCompleted {
                    category: key.category.clone(),
                    name: key.name.clone(),
                    at: Utc::now(),
                };
                state.schedules.remove(key);
                (Some(event), false)
            } else {
                (None, true)
            }
        };
        if let Some(event) = event {
            inner.emit(event);
        }
        inner.persist_timers().await;
        keep_going
    }

    /// Full-collection write-through for the timer list.
    ///
    /// The payload is serialized from live state only once the write lock
    /// is held, so a later-acquired write always carries a later-or-equal
    /// view and writes land on the backend in lock order. A failed write is
    /// logged and dropped: in-memory state is not rolled back and the next
    /// successful write reconciles.
    async fn persist_timers(&self) {
        let _guard = self.write_lock.lock().await;
        let payload = {
            let state = self.state.lock().await;
            serde_json::to_string(&state.timers)
        };
        self.write(TIMERS_KEY, payload).await;
    }

    async fn persist_categories(&self) {
        let _guard = self.write_lock.lock().await;
        let payload = {
            let state = self.state.lock().await;
            serde_json::to_string(&state.categories)
        };
        self.write(CATEGORIES_KEY, payload).await;
    }

    async fn write(&self, key: &str, payload: serde_json::Result<String>) {
        match payload {
            Ok(payload) => {
                if let Err(e) = self.store.set(key, &payload).await {
                    warn!(key, error = %e, "write-through failed; keeping in-memory state");
                }
            }
            Err(e) => warn!(key, error = %e, "snapshot serialization failed"),
        }
    }
}

async fn read_json<T: DeserializeOwned>(store: &dyn PersistentStore, key: &str) -> Option<T> {
    match store.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "discarding corrupt payload");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "storage read failed; starting empty");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn engine() -> (Arc<MemoryStore>, TimerEngine) {
        let store = Arc::new(MemoryStore::new());
        let engine = TimerEngine::new(store.clone() as Arc<dyn PersistentStore>);
        (store, engine)
    }

    #[tokio::test]
    async fn add_timer_requires_existing_category() {
        let (_, engine) = engine().await;
        let err = engine.add_timer("Tea", 60, "Kitchen").await.unwrap_err();
        assert_eq!(err, ValidationError::UnknownCategory("Kitchen".to_string()));
    }

    #[tokio::test]
    async fn add_timer_rejects_duplicate_within_category() {
        let (_, engine) = engine().await;
        engine.add_category("Kitchen").await.unwrap();
        engine.add_timer("Tea", 60, "Kitchen").await.unwrap();
        let err = engine.add_timer("Tea", 30, "Kitchen").await.unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateTimer {
                category: "Kitchen".to_string(),
                name: "Tea".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn same_name_allowed_across_categories() {
        let (_, engine) = engine().await;
        engine.add_category("Kitchen").await.unwrap();
        engine.add_category("Office").await.unwrap();
        engine.add_timer("Tea", 60, "Kitchen").await.unwrap();
        let snapshot = engine.add_timer("Tea", 300, "Office").await.unwrap();
        assert_eq!(snapshot.timers.len(), 2);
    }

    #[tokio::test]
    async fn add_timer_matches_category_case_insensitively() {
        let (_, engine) = engine().await;
        engine.add_category("Kitchen").await.unwrap();
        let snapshot = engine.add_timer("Tea", 60, "kitchen").await.unwrap();
        assert_eq!(snapshot.timers[0].category.as_str(), "Kitchen");
    }

    #[tokio::test]
    async fn add_category_persists_full_list() {
        let (store, engine) = engine().await;
        engine.add_category("Work").await.unwrap();
        engine.add_category("Home").await.unwrap();
        assert_eq!(
            store.value(CATEGORIES_KEY).as_deref(),
            Some(r#"["Work","Home"]"#)
        );
    }

    #[tokio::test]
    async fn unknown_timer_is_a_validation_error() {
        let (_, engine) = engine().await;
        assert_eq!(
            engine.start_timer("ghost").await.unwrap_err(),
            ValidationError::UnknownTimer("ghost".to_string())
        );
    }

    #[tokio::test]
    async fn timers_in_returns_creation_order() {
        let (_, engine) = engine().await;
        engine.add_category("Kitchen").await.unwrap();
        engine.add_timer("Tea", 60, "Kitchen").await.unwrap();
        engine.add_timer("Eggs", 420, "Kitchen").await.unwrap();
        let timers = engine.timers_in("Kitchen").await.unwrap();
        let names: Vec<&str> = timers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Tea", "Eggs"]);
    }

    #[tokio::test]
    async fn validation_failure_writes_nothing() {
        let (store, engine) = engine().await;
        assert!(engine.add_category("  ").await.is_err());
        assert!(engine.add_timer("Tea", 60, "Nowhere").await.is_err());
        assert!(store.value(CATEGORIES_KEY).is_none());
        assert!(store.value(TIMERS_KEY).is_none());
    }
}
