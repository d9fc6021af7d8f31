use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::db::{helpers::table_exists, models::SyncTime, Database};

impl Database {
    pub async fn get_file_path_by_title(&self, title: &str) -> Result<Option<String>> {
        let title = title.to_string();
        self.execute(move |conn| {
            if !table_exists(conn, "files")? {
                return Ok(None);
            }
            let file = conn
                .query_row(
                    "SELECT file FROM files WHERE title = ?1 LIMIT 1",
                    params![title],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(file)
        })
        .await
    }

    pub async fn upsert_file(&self, file: &str, title: &str) -> Result<()> {
        let file = file.to_string();
        let title = title.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO files (file, title) VALUES (?1, ?2)
                 ON CONFLICT(file) DO UPDATE SET title = excluded.title",
                params![file, title],
            )
            .with_context(|| format!("failed to record file {file}"))?;
            Ok(())
        })
        .await
    }

    pub async fn set_last_sync_time(&self, file: &str, last_sync_time: &str) -> Result<()> {
        let file = file.to_string();
        let last_sync_time = last_sync_time.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sync_times (file, last_sync_time) VALUES (?1, ?2)
                 ON CONFLICT(file) DO UPDATE SET last_sync_time = excluded.last_sync_time",
                params![file, last_sync_time],
            )
            .with_context(|| format!("failed to record sync time for {file}"))?;
            Ok(())
        })
        .await
    }

    pub async fn get_last_sync_time(&self, file: &str) -> Result<Option<SyncTime>> {
        let file = file.to_string();
        self.execute(move |conn| {
            if !table_exists(conn, "sync_times")? {
                return Ok(None);
            }
            let record = conn
                .query_row(
                    "SELECT file, last_sync_time FROM sync_times WHERE file = ?1",
                    params![file],
                    |row| {
                        Ok(SyncTime {
                            file: row.get(0)?,
                            last_sync_time: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
        .await
    }
}
