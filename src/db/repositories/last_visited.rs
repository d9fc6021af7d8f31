use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{helpers::to_u32, models::LastVisitedPage, Database};

// The table may be missing from databases created by the desktop side.
fn ensure_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("../schemas/schema_v2.sql"))
        .context("failed to create pdf_last_visited")
}

impl Database {
    pub async fn save_last_visited_page(&self, pdf_path: &str, page: u32) -> Result<()> {
        let pdf_path = pdf_path.to_string();
        self.execute(move |conn| {
            ensure_table(conn)?;
            conn.execute(
                "INSERT INTO pdf_last_visited (pdf_path, last_page, last_accessed)
                 VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(pdf_path) DO UPDATE
                 SET last_page = excluded.last_page,
                     last_accessed = CURRENT_TIMESTAMP",
                params![pdf_path, page],
            )
            .with_context(|| format!("failed to save last page for {pdf_path}"))?;
            Ok(())
        })
        .await
    }

    pub async fn get_last_visited_page(&self, pdf_path: &str) -> Result<Option<LastVisitedPage>> {
        let pdf_path = pdf_path.to_string();
        self.execute(move |conn| {
            ensure_table(conn)?;
            let row = conn
                .query_row(
                    "SELECT pdf_path, last_page, last_accessed FROM pdf_last_visited
                     WHERE pdf_path = ?1",
                    params![pdf_path],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(pdf_path, last_page, last_accessed)| -> Result<LastVisitedPage> {
                Ok(LastVisitedPage {
                    pdf_path,
                    last_page: to_u32(last_page, "last_page")?,
                    last_accessed,
                })
            })
            .transpose()
        })
        .await
    }
}
