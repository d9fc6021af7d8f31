use std::cmp::Reverse;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{decode_timestamp, table_exists, to_u32},
    models::Annotation,
    Database,
};

const ANNOTATION_COLUMNS: &str =
    "id, file, page, edges, type, color, contents, subject, created, modified, outlines";

fn row_to_annotation(row: &Row) -> Result<Annotation> {
    Ok(Annotation {
        id: row.get("id")?,
        file: row.get("file")?,
        page: to_u32(row.get("page")?, "page")?,
        edges: row.get("edges")?,
        kind: row.get("type")?,
        color: row.get("color")?,
        contents: row.get::<_, Option<String>>("contents")?.unwrap_or_default(),
        subject: row.get::<_, Option<String>>("subject")?.unwrap_or_default(),
        created: row.get("created")?,
        modified: row.get("modified")?,
        outlines: row.get::<_, Option<String>>("outlines")?.unwrap_or_default(),
    })
}

// `created` is the text pair "(high low)", which does not sort as a string.
// Undecodable timestamps go last.
fn sort_newest_first(annotations: &mut [Annotation]) {
    annotations.sort_by_key(|annotation| Reverse(decode_timestamp(&annotation.created)));
}

impl Database {
    /// All annotations, newest first. Empty when the table does not exist yet.
    pub async fn get_annotations(&self) -> Result<Vec<Annotation>> {
        self.execute(|conn| {
            if !table_exists(conn, "annotations")? {
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(&format!(
                "SELECT {ANNOTATION_COLUMNS} FROM annotations"
            ))?;
            let mut rows = stmt.query([])?;
            let mut annotations = Vec::new();
            while let Some(row) = rows.next()? {
                annotations.push(row_to_annotation(row)?);
            }
            sort_newest_first(&mut annotations);
            Ok(annotations)
        })
        .await
    }

    pub async fn get_annotations_for_page(&self, file: &str, page: u32) -> Result<Vec<Annotation>> {
        let file = file.to_string();
        self.execute(move |conn| {
            if !table_exists(conn, "annotations")? {
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(&format!(
                "SELECT {ANNOTATION_COLUMNS} FROM annotations
                 WHERE file = ?1 AND page = ?2"
            ))?;
            let mut rows = stmt.query(params![file, page])?;
            let mut annotations = Vec::new();
            while let Some(row) = rows.next()? {
                annotations.push(row_to_annotation(row)?);
            }
            sort_newest_first(&mut annotations);
            Ok(annotations)
        })
        .await
    }

    pub async fn insert_annotation(&self, annotation: &Annotation) -> Result<()> {
        let record = annotation.clone();
        self.execute(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO annotations ({ANNOTATION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    record.id,
                    record.file,
                    record.page,
                    record.edges,
                    record.kind,
                    record.color,
                    record.contents,
                    record.subject,
                    record.created,
                    record.modified,
                    record.outlines,
                ],
            )
            .with_context(|| format!("failed to insert annotation {}", record.id))?;
            Ok(())
        })
        .await
    }

    pub async fn update_annotation(&self, annotation: &Annotation) -> Result<()> {
        let record = annotation.clone();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE annotations
                     SET file = ?1,
                         page = ?2,
                         edges = ?3,
                         type = ?4,
                         color = ?5,
                         contents = ?6,
                         subject = ?7,
                         created = ?8,
                         modified = ?9,
                         outlines = ?10
                     WHERE id = ?11",
                    params![
                        record.file,
                        record.page,
                        record.edges,
                        record.kind,
                        record.color,
                        record.contents,
                        record.subject,
                        record.created,
                        record.modified,
                        record.outlines,
                        record.id,
                    ],
                )
                .with_context(|| format!("failed to update annotation {}", record.id))?;

            if rows_affected == 0 {
                bail!("annotation {} not found", record.id);
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_annotation(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM annotations WHERE id = ?1", params![id])
                .with_context(|| format!("failed to delete annotation {id}"))?;
            Ok(())
        })
        .await
    }

    /// Delete every id in one transaction; any failure rolls back the batch.
    pub async fn delete_annotations(&self, ids: &[String]) -> Result<()> {
        let ids = ids.to_vec();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open delete transaction")?;
            {
                let mut stmt = tx.prepare("DELETE FROM annotations WHERE id = ?1")?;
                for id in &ids {
                    // Returning early drops `tx`, which rolls it back.
                    stmt.execute(params![id])
                        .with_context(|| format!("failed to delete annotation {id}"))?;
                }
            }
            tx.commit().context("failed to commit delete transaction")?;
            Ok(())
        })
        .await
    }
}
