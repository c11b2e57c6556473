use std::sync::Arc;

use clap::Subcommand;
use timerdeck_core::{FileStore, TimerEngine};

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Add a new category
    Add { name: String },
    /// List categories
    List,
}

pub async fn run(action: CategoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::open_default()?);
    let engine = TimerEngine::load(store).await;

    match action {
        CategoryAction::Add { name } => {
            let snapshot = engine.add_category(&name).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot.categories)?);
        }
        CategoryAction::List => {
            println!(
                "{}",
                serde_json::to_string_pretty(&engine.categories().await)?
            );
        }
    }
    Ok(())
}
