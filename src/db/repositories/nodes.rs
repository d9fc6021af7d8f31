//! Lookups against the desktop's note-graph database (org-roam style `nodes`
//! table), which is a separate file opened only for the duration of a query.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::db::helpers::{strip_lisp_quotes, table_exists};

/// File path of the note whose node id is `node_id`. Ids and paths in that
/// table are stored with Lisp string quotes, so both forms are matched.
pub fn file_path_by_node_id(node_id: &str, external_db: &Path) -> Result<Option<String>> {
    let conn = Connection::open_with_flags(
        external_db,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open {}", external_db.display()))?;

    if !table_exists(&conn, "nodes")? {
        return Ok(None);
    }

    let quoted = format!("\"{node_id}\"");
    let file = conn
        .query_row(
            "SELECT file FROM nodes WHERE id = ?1 OR id = ?2 LIMIT 1",
            params![node_id, quoted],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("failed to query nodes")?;

    Ok(file.map(|file| strip_lisp_quotes(&file)))
}
