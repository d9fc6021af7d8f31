use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use super::BookmarkStore;
use crate::{db::DATABASE_FILE_NAME, events::AppEvent};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Every non-hidden entry below `root`, directories included, in a stable order.
fn collect_entries(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let listing = fs::read_dir(&dir)
            .with_context(|| format!("failed to list {}", dir.display()))?;
        let mut children = Vec::new();
        for entry in listing {
            let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }
            if entry.file_type()?.is_dir() {
                pending.push(path.clone());
            }
            children.push(path);
        }
        children.sort();
        entries.extend(children);
    }

    Ok(entries)
}

impl BookmarkStore {
    /// Walk `root` on a blocking worker and bookmark every entry in it.
    ///
    /// A completed scan replaces the whole bookmark map. Progress is published
    /// as [`AppEvent::ScanProgress`]. A failure stops the walk and is kept in
    /// [`last_error`](Self::last_error); bookmarks created before it are added
    /// to the current map. Returns the number of bookmarked entries.
    pub async fn scan_directory(&self, root: impl Into<PathBuf>) -> Result<usize> {
        let store = self.clone();
        let root = root.into();
        tokio::task::spawn_blocking(move || store.scan_blocking(&root))
            .await
            .context("directory scan task panicked")?
    }

    fn scan_blocking(&self, root: &Path) -> Result<usize> {
        {
            let mut state = self.state();
            state.scanning = true;
            state.scan_progress = 0.0;
            state.last_error = None;
        }

        let result = self.scan_root(root);

        let mut state = self.state();
        state.scanning = false;
        if let Err(err) = &result {
            log_error!("Scan of {} failed: {err:#}", root.display());
            state.last_error = Some(format!("{err:#}"));
        }
        result
    }

    fn scan_root(&self, root: &Path) -> Result<usize> {
        // Released on every exit path below.
        let _grant = self
            .access_guard(root)
            .ok_or_else(|| anyhow!("access to {} was denied", root.display()))?;

        let database = root.join(DATABASE_FILE_NAME);
        if database.is_file() {
            log_info!("Found annotation database at {}", database.display());
            self.inner
                .events
                .emit(AppEvent::DatabaseFoundInDirectory(database));
        }

        let entries = collect_entries(root)?;
        let total = entries.len();
        log_info!("Bookmarking {total} entries under {}", root.display());

        let mut fresh = HashMap::with_capacity(total);
        if let Err(err) = self.bookmark_entries(&entries, &mut fresh) {
            log_warn!("Keeping {} bookmarks created before the failure", fresh.len());
            self.state().bookmarks.extend(fresh);
            return Err(err);
        }

        let snapshot = {
            let mut state = self.state();
            state.bookmarks = fresh;
            state.scan_progress = 1.0;
            state.bookmarks.clone()
        };
        self.inner
            .settings
            .set_bookmarks(snapshot)
            .context("failed to persist bookmarks")?;
        self.inner.events.emit(AppEvent::ScanProgress(1.0));

        Ok(total)
    }

    fn bookmark_entries(
        &self,
        entries: &[PathBuf],
        fresh: &mut HashMap<String, Vec<u8>>,
    ) -> Result<()> {
        let total = entries.len();
        for (index, entry) in entries.iter().enumerate() {
            let token = self
                .inner
                .access
                .create_bookmark(entry)
                .with_context(|| format!("failed to bookmark {}", entry.display()))?;
            fresh.insert(entry.to_string_lossy().into_owned(), token);

            let progress = (index + 1) as f32 / total as f32;
            self.state().scan_progress = progress;
            self.inner.events.emit(AppEvent::ScanProgress(progress));
        }
        Ok(())
    }
}
