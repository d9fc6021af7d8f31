mod annotation_store;
mod app;
mod bookmarks;
pub mod db;
mod error;
mod events;
pub mod links;
mod paths;
mod scoped_access;
mod settings;
mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use log::{info, warn};

pub use annotation_store::AnnotationStore;
pub use app::{App, DocumentRequest};
pub use bookmarks::{AccessGuard, BookmarkStore, RootDirectory};
pub use db::models::Annotation;
pub use error::{AccessError, LinkError, StorageError};
pub use events::{AppEvent, EventBus};
pub use paths::PathTranslator;
pub use scoped_access::{FsScopedAccess, ResolvedBookmark, ScopedAccess};
pub use settings::{SavedRoot, SettingsStore};

const SETTINGS_ENV: &str = "NOTERLINK_SETTINGS";
const DEFAULT_SETTINGS_FILE: &str = "noterlink-settings.json";

/// Resolve each link given on the command line and print the result as JSON.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let settings_path = std::env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    info!("Using settings at {}", settings_path.display());

    let settings = Arc::new(SettingsStore::new(settings_path)?);
    let app = App::new(settings, Arc::new(FsScopedAccess));
    app.bookmarks.restore_saved_bookmarks();

    for link in std::env::args().skip(1) {
        if let Some(video) = links::parse_video_link(&link) {
            println!("{}", serde_json::to_string(&video)?);
            continue;
        }
        match app.open_link(&link) {
            Some(request) => println!("{}", serde_json::to_string(&request)?),
            None => warn!("Could not resolve {link}"),
        }
    }

    Ok(())
}
