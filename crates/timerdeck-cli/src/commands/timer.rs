use std::sync::Arc;

use clap::Subcommand;
use timerdeck_core::{BulkAction, EngineSnapshot, Event, FileStore, TimerEngine};
use tokio::sync::broadcast;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Create a timer in a category
    Add {
        name: String,
        /// Duration in seconds
        #[arg(long)]
        duration: u64,
        /// Category the timer belongs to
        #[arg(long)]
        category: String,
    },
    /// List timers, optionally scoped to one category
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Start a timer
    Start {
        name: String,
        /// Stay in the foreground and count down until completion
        #[arg(long)]
        watch: bool,
    },
    /// Pause a timer
    Pause { name: String },
    /// Reset a timer to its full duration
    Reset { name: String },
    /// Start every timer in a category
    StartAll {
        category: String,
        /// Stay in the foreground until every started timer completes
        #[arg(long)]
        watch: bool,
    },
    /// Pause every running timer in a category
    PauseAll { category: String },
    /// Reset every timer in a category
    ResetAll { category: String },
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::open_default()?);
    let engine = TimerEngine::load(store).await;

    match action {
        TimerAction::Add {
            name,
            duration,
            category,
        } => {
            let snapshot = engine.add_timer(&name, duration, &category).await?;
            print_snapshot(&snapshot)?;
        }
        TimerAction::List { category } => match category {
            Some(category) => {
                let timers = engine.timers_in(&category).await?;
                println!("{}", serde_json::to_string_pretty(&timers)?);
            }
            None => print_snapshot(&engine.snapshot().await)?,
        },
        TimerAction::Start { name, watch } => {
            let mut events = engine.subscribe();
            print_snapshot(&engine.start_timer(&name).await?)?;
            if watch {
                watch_until_idle(&engine, &mut events).await?;
            }
        }
        TimerAction::Pause { name } => print_snapshot(&engine.pause_timer(&name).await?)?,
        TimerAction::Reset { name } => print_snapshot(&engine.reset_timer(&name).await?)?,
        TimerAction::StartAll { category, watch } => {
            let mut events = engine.subscribe();
            print_snapshot(&engine.bulk_apply(&category, BulkAction::Start).await?)?;
            if watch {
                watch_until_idle(&engine, &mut events).await?;
            }
        }
        TimerAction::PauseAll { category } => {
            print_snapshot(&engine.bulk_apply(&category, BulkAction::Pause).await?)?
        }
        TimerAction::ResetAll { category } => {
            print_snapshot(&engine.bulk_apply(&category, BulkAction::Reset).await?)?
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &EngineSnapshot) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

/// Stream events until nothing is running. Ctrl-C pauses every running
/// timer first so the remaining durations land on disk before exit.
async fn watch_until_idle(
    engine: &TimerEngine,
    events: &mut broadcast::Receiver<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let running = engine.snapshot().await.timers.iter().any(|t| t.is_running());
        if !running {
            break;
        }
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                for category in engine.categories().await {
                    engine.bulk_apply(category.as_str(), BulkAction::Pause).await?;
                }
                break;
            }
        }
    }
    Ok(())
}
