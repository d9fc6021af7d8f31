//! Boolean/empty-on-failure facade over the annotation database.
//!
//! Failures never propagate: each operation logs and records the error text,
//! readable afterwards through [`AnnotationStore::last_error`].

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use anyhow::anyhow;
use log::{error, info};

use crate::{
    bookmarks::BookmarkStore,
    db::{
        self,
        models::{Annotation, LastVisitedPage, SyncTime},
        Database,
    },
    error::{AccessError, StorageError},
};

struct OpenDatabase {
    db: Database,
    access: PathBuf,
}

#[derive(Default)]
enum Slot {
    #[default]
    Closed,
    /// Claimed by an open still waiting on the database thread.
    Opening,
    Open(OpenDatabase),
}

pub struct AnnotationStore {
    bookmarks: BookmarkStore,
    open: Mutex<Slot>,
    last_error: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds the `Opening` claim; returns the slot to `Closed` unless filled.
struct Reservation<'a> {
    slot: &'a Mutex<Slot>,
    filled: bool,
}

impl<'a> Reservation<'a> {
    fn claim(slot: &'a Mutex<Slot>) -> Option<Self> {
        let mut current = lock(slot);
        if !matches!(*current, Slot::Closed) {
            return None;
        }
        *current = Slot::Opening;
        Some(Self {
            slot,
            filled: false,
        })
    }

    fn fill(mut self, open: OpenDatabase) {
        *lock(self.slot) = Slot::Open(open);
        self.filled = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.filled {
            *lock(self.slot) = Slot::Closed;
        }
    }
}

impl AnnotationStore {
    pub fn new(bookmarks: BookmarkStore) -> Self {
        Self {
            bookmarks,
            open: Mutex::new(Slot::Closed),
            last_error: Mutex::new(None),
        }
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    pub fn is_open(&self) -> bool {
        matches!(*lock(&self.open), Slot::Open(_))
    }

    pub(crate) fn database(&self) -> Result<Database, StorageError> {
        match &*lock(&self.open) {
            Slot::Open(open) => Ok(open.db.clone()),
            Slot::Closed | Slot::Opening => Err(StorageError::NotOpen),
        }
    }

    async fn with_db<T, F, Fut>(&self, task: F) -> Result<T, StorageError>
    where
        F: FnOnce(Database) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let db = self.database()?;
        Ok(task(db).await?)
    }

    fn record<T>(&self, operation: &str, result: Result<T, StorageError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                let message = err.to_string();
                error!("{operation} failed: {message}");
                *lock(&self.last_error) = Some(message);
                None
            }
        }
    }

    /// Obtain scoped access to `db_path` through the bookmark store, then open
    /// it. The grant stays held until [`close_database`](Self::close_database)
    /// hands it back.
    pub async fn open_database(&self, db_path: &Path) -> bool {
        let result = self.try_open_database(db_path).await;
        self.record("open database", result).is_some()
    }

    pub async fn try_open_database(&self, db_path: &Path) -> Result<(), StorageError> {
        let reservation = Reservation::claim(&self.open)
            .ok_or_else(|| anyhow!("a database is already open; close it first"))?;

        let key = db_path.to_string_lossy().into_owned();
        let guard = self
            .bookmarks
            .file_access_guard(&key)
            .ok_or_else(|| AccessError::Denied(key.clone()))?;

        let path = guard.path().to_path_buf();
        let opened = tokio::task::spawn_blocking(move || Database::open(path))
            .await
            .map_err(|err| anyhow!("database open task failed: {err}"))??;

        info!("Annotation database ready at {}", opened.path().display());
        reservation.fill(OpenDatabase {
            db: opened,
            access: guard.detach(),
        });
        Ok(())
    }

    /// Close the connection. Returns the path whose scoped access is still
    /// held; the caller releases it with
    /// [`BookmarkStore::stop_accessing_file`].
    pub fn close_database(&self) -> Option<PathBuf> {
        let mut slot = lock(&self.open);
        if !matches!(*slot, Slot::Open(_)) {
            return None;
        }
        match std::mem::take(&mut *slot) {
            Slot::Open(OpenDatabase { db, access }) => {
                drop(db);
                Some(access)
            }
            Slot::Closed | Slot::Opening => None,
        }
    }

    pub async fn try_query_annotations(&self) -> Result<Vec<Annotation>, StorageError> {
        Ok(self.database()?.get_annotations().await?)
    }

    pub async fn query_annotations(&self) -> Vec<Annotation> {
        let result = self.try_query_annotations().await;
        self.record("query annotations", result).unwrap_or_default()
    }

    pub async fn annotations_for_page(&self, file: &str, page: u32) -> Vec<Annotation> {
        let result = self
            .with_db(|db| async move { db.get_annotations_for_page(file, page).await })
            .await;
        self.record("query page annotations", result)
            .unwrap_or_default()
    }

    pub async fn add_annotation(&self, annotation: &Annotation) -> bool {
        let result = self
            .with_db(|db| async move { db.insert_annotation(annotation).await })
            .await;
        self.record("add annotation", result).is_some()
    }

    pub async fn update_annotation(&self, annotation: &Annotation) -> bool {
        let result = self
            .with_db(|db| async move { db.update_annotation(annotation).await })
            .await;
        self.record("update annotation", result).is_some()
    }

    pub async fn delete_annotation(&self, id: &str) -> bool {
        let result = self
            .with_db(|db| async move { db.delete_annotation(id).await })
            .await;
        self.record("delete annotation", result).is_some()
    }

    /// All-or-nothing: if any delete fails, none of `ids` are removed.
    pub async fn delete_annotations(&self, ids: &[String]) -> bool {
        let result = self
            .with_db(|db| async move { db.delete_annotations(ids).await })
            .await;
        self.record("delete annotations", result).is_some()
    }

    pub async fn get_file_path_by_title(&self, title: &str) -> Option<String> {
        let result = self
            .with_db(|db| async move { db.get_file_path_by_title(title).await })
            .await;
        self.record("file lookup by title", result).flatten()
    }

    /// Look a note file up by node id in a different, externally supplied
    /// database. That file is opened read-only for this call only.
    pub async fn get_file_path_by_node_id(
        &self,
        node_id: &str,
        external_db_path: &Path,
    ) -> Option<String> {
        let node_id = node_id.to_string();
        let external = external_db_path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || db::file_path_by_node_id(&node_id, &external))
            .await
            .map_err(|err| anyhow!("node lookup task failed: {err}"))
            .and_then(|lookup| lookup)
            .map_err(StorageError::from);
        self.record("file lookup by node id", result).flatten()
    }

    pub async fn upsert_file(&self, file: &str, title: &str) -> bool {
        let result = self
            .with_db(|db| async move { db.upsert_file(file, title).await })
            .await;
        self.record("record file", result).is_some()
    }

    pub async fn set_last_sync_time(&self, file: &str, last_sync_time: &str) -> bool {
        let result = self
            .with_db(|db| async move { db.set_last_sync_time(file, last_sync_time).await })
            .await;
        self.record("record sync time", result).is_some()
    }

    pub async fn get_last_sync_time(&self, file: &str) -> Option<SyncTime> {
        let result = self
            .with_db(|db| async move { db.get_last_sync_time(file).await })
            .await;
        self.record("read sync time", result).flatten()
    }

    pub async fn save_last_visited_page(&self, path: &str, page: u32) -> bool {
        let result = self
            .with_db(|db| async move { db.save_last_visited_page(path, page).await })
            .await;
        self.record("save last visited page", result).is_some()
    }

    pub async fn get_last_visited_page(&self, path: &str) -> Option<u32> {
        let result = self
            .with_db(|db| async move { db.get_last_visited_page(path).await })
            .await;
        self.record("read last visited page", result)
            .flatten()
            .map(|visited: LastVisitedPage| visited.last_page)
    }
}
