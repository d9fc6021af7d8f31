use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use helpers::{decode_timestamp, encode_timestamp};
pub use repositories::nodes::file_path_by_node_id;

use migrations::run_migrations;

/// Name of the annotation database expected directly under the root directory.
pub const DATABASE_FILE_NAME: &str = "pdf-annotations.db";

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

/// Handle to the single connection. All work runs on one dedicated thread in
/// submission order; clones share that thread.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    /// Open (creating if needed) the database at `db_path` and bring its schema
    /// up to date. Blocks until the worker thread reports readiness.
    pub fn open(db_path: PathBuf) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("noterlink-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                // Rows written by the desktop side do not always have a
                // matching `files` entry.
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "OFF") {
                    error!("Failed to disable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                let init_failed = init_result.is_err();
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }
                if init_failed {
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        let ready = ready_rx
            .recv()
            .context("database worker exited before signaling readiness")
            .and_then(|result| result);
        if let Err(err) = ready {
            if let Err(join_err) = worker.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
            return Err(err);
        }

        info!("Database opened at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_applies_schema() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join(DATABASE_FILE_NAME)).unwrap();

        let tables = db
            .execute(|conn| {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                Ok(rows.filter_map(|row| row.ok()).collect::<Vec<_>>())
            })
            .await
            .unwrap();

        for table in ["annotations", "files", "pdf_last_visited", "sync_times"] {
            assert!(tables.iter().any(|name| name == table), "missing {table}");
        }
    }

    #[tokio::test]
    async fn tasks_run_in_submission_order() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join(DATABASE_FILE_NAME)).unwrap();

        let write = db.execute(|conn| {
            conn.execute("INSERT INTO files (file, title) VALUES ('/a.pdf', 'A')", [])?;
            Ok(())
        });
        let read = db.execute(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get::<_, i64>(0))?)
        });
        let (written, count) = tokio::join!(write, read);

        written.unwrap();
        assert_eq!(count.unwrap(), 1);
    }

    #[test]
    fn open_fails_for_unwritable_location() {
        let dir = TempDir::new().unwrap();
        let missing_parent = dir.path().join("missing").join(DATABASE_FILE_NAME);
        assert!(Database::open(missing_parent).is_err());
    }
}
