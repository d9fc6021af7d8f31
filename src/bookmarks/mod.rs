//! Durable path → bookmark map and the only place scoped access is begun or
//! ended.

mod scan;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use log::{info, warn};

use crate::{
    error::AccessError,
    events::EventBus,
    scoped_access::ScopedAccess,
    settings::{SavedRoot, SettingsStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDirectory {
    pub path: PathBuf,
    pub bookmark: Vec<u8>,
}

#[derive(Default)]
struct BookmarkState {
    root_directory: Option<RootDirectory>,
    bookmarks: HashMap<String, Vec<u8>>,
    scanning: bool,
    scan_progress: f32,
    last_error: Option<String>,
}

struct BookmarkInner {
    access: Arc<dyn ScopedAccess>,
    settings: Arc<SettingsStore>,
    events: EventBus,
    state: Mutex<BookmarkState>,
}

#[derive(Clone)]
pub struct BookmarkStore {
    inner: Arc<BookmarkInner>,
}

/// Holds one scoped-access grant and releases it when dropped.
pub struct AccessGuard {
    access: Arc<dyn ScopedAccess>,
    path: Option<PathBuf>,
}

impl AccessGuard {
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Hand the grant to the caller, who must later pass the returned path to
    /// [`BookmarkStore::stop_accessing_file`].
    pub fn detach(mut self) -> PathBuf {
        self.path.take().unwrap_or_default()
    }
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            self.access.stop_accessing(&path);
        }
    }
}

impl BookmarkStore {
    pub fn new(
        access: Arc<dyn ScopedAccess>,
        settings: Arc<SettingsStore>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(BookmarkInner {
                access,
                settings,
                events,
                state: Mutex::new(BookmarkState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, BookmarkState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reload the persisted root and map. A stale root is dropped, not fatal.
    pub fn restore_saved_bookmarks(&self) {
        let bookmarks = self.inner.settings.bookmarks();
        let root = self.inner.settings.root_directory().and_then(|saved| {
            match self.inner.access.resolve_bookmark(&saved.token) {
                Ok(resolved) if !resolved.is_stale => Some(RootDirectory {
                    path: resolved.path,
                    bookmark: saved.token,
                }),
                Ok(_) => {
                    warn!("Saved root bookmark for {} is stale", saved.path);
                    None
                }
                Err(err) => {
                    warn!("Saved root bookmark for {} is unreadable: {err}", saved.path);
                    None
                }
            }
        });

        info!(
            "Restored {} bookmarks (root: {})",
            bookmarks.len(),
            root.as_ref()
                .map(|root| root.path.display().to_string())
                .unwrap_or_else(|| "none".into())
        );

        let mut state = self.state();
        state.bookmarks = bookmarks;
        state.root_directory = root;
    }

    pub fn set_root_directory(&self, path: &Path) -> Result<RootDirectory, AccessError> {
        let token = self.inner.access.create_bookmark(path)?;
        let root = RootDirectory {
            path: path.to_path_buf(),
            bookmark: token,
        };

        if let Err(err) = self.inner.settings.set_root_directory(SavedRoot {
            path: path.to_string_lossy().into_owned(),
            token: root.bookmark.clone(),
        }) {
            warn!("Failed to persist root directory {}: {err:#}", path.display());
        }

        self.state().root_directory = Some(root.clone());
        Ok(root)
    }

    pub fn root_directory(&self) -> Option<RootDirectory> {
        self.state().root_directory.clone()
    }

    /// Bookmark a single explicitly picked file.
    pub fn add_bookmark(&self, path: &Path) -> Result<(), AccessError> {
        let token = self.inner.access.create_bookmark(path)?;
        let snapshot = {
            let mut state = self.state();
            state
                .bookmarks
                .insert(path.to_string_lossy().into_owned(), token);
            state.bookmarks.clone()
        };
        if let Err(err) = self.inner.settings.set_bookmarks(snapshot) {
            warn!("Failed to persist bookmarks: {err:#}");
        }
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state().bookmarks.contains_key(path)
    }

    pub fn bookmark_count(&self) -> usize {
        self.state().bookmarks.len()
    }

    pub fn is_scanning(&self) -> bool {
        self.state().scanning
    }

    pub fn scan_progress(&self) -> f32 {
        self.state().scan_progress
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// Resolve a path through its own bookmark, or through the root's bookmark
    /// when the path lies under the root and has none of its own.
    pub fn try_resolve(&self, path: &str) -> Result<PathBuf, AccessError> {
        let (token, root) = {
            let state = self.state();
            (
                state.bookmarks.get(path).cloned(),
                state.root_directory.clone(),
            )
        };

        if let Some(token) = token {
            let resolved = self.inner.access.resolve_bookmark(&token)?;
            if resolved.is_stale {
                return Err(AccessError::Stale(path.to_string()));
            }
            return Ok(resolved.path);
        }

        match root {
            Some(root) if Path::new(path).starts_with(&root.path) => {
                let resolved = self.inner.access.resolve_bookmark(&root.bookmark)?;
                if resolved.is_stale {
                    return Err(AccessError::Stale(root.path.display().to_string()));
                }
                Ok(PathBuf::from(path))
            }
            _ => Err(AccessError::NoBookmark(path.to_string())),
        }
    }

    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        match self.try_resolve(path) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!("Could not resolve {path}: {err}");
                None
            }
        }
    }

    /// Begin scoped access. Each `Some` must be paired with exactly one
    /// [`stop_accessing_file`](Self::stop_accessing_file).
    pub fn start_accessing_file(&self, path: &str) -> Option<PathBuf> {
        let url = self.resolve(path)?;
        if self.inner.access.start_accessing(&url) {
            Some(url)
        } else {
            warn!("Access to {} was refused", url.display());
            None
        }
    }

    pub fn stop_accessing_file(&self, url: &Path) {
        self.inner.access.stop_accessing(url);
    }

    /// Begin access to a path directly, without a map lookup.
    pub(crate) fn access_guard(&self, path: &Path) -> Option<AccessGuard> {
        if self.inner.access.start_accessing(path) {
            Some(AccessGuard {
                access: Arc::clone(&self.inner.access),
                path: Some(path.to_path_buf()),
            })
        } else {
            None
        }
    }

    /// Like [`start_accessing_file`](Self::start_accessing_file), but released on drop.
    pub fn file_access_guard(&self, path: &str) -> Option<AccessGuard> {
        let url = self.resolve(path)?;
        self.access_guard(&url)
    }
}
