use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::{
    annotation_store::AnnotationStore,
    bookmarks::BookmarkStore,
    db::{models::Annotation, DATABASE_FILE_NAME},
    events::{AppEvent, EventBus},
    links::{extract_link_target, format_annotation_for_noter_page, parse_noter_page_link},
    paths::PathTranslator,
    scoped_access::ScopedAccess,
    settings::SettingsStore,
};

/// Where a link lands when it carries no coordinates.
const DEFAULT_PAGE: u32 = 1;
const DEFAULT_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub path: PathBuf,
    pub page: u32,
    pub x: f64,
    pub y: f64,
}

/// Wires the services together along the link → document and tap → link flows.
pub struct App {
    pub settings: Arc<SettingsStore>,
    pub events: EventBus,
    pub paths: PathTranslator,
    pub bookmarks: BookmarkStore,
    pub annotations: AnnotationStore,
}

impl App {
    pub fn new(settings: Arc<SettingsStore>, access: Arc<dyn ScopedAccess>) -> Self {
        let events = EventBus::new();
        let paths = PathTranslator::new(Arc::clone(&settings));
        let bookmarks = BookmarkStore::new(access, Arc::clone(&settings), events.clone());
        let annotations = AnnotationStore::new(bookmarks.clone());
        Self {
            settings,
            events,
            paths,
            bookmarks,
            annotations,
        }
    }

    fn current_root(&self) -> Option<String> {
        self.bookmarks
            .root_directory()
            .map(|root| root.path.to_string_lossy().into_owned())
    }

    /// Choose a new root directory and bookmark everything inside it.
    pub async fn select_root_directory(&self, root: &Path) -> Result<usize> {
        self.bookmarks
            .set_root_directory(root)
            .with_context(|| format!("failed to bookmark root {}", root.display()))?;
        self.bookmarks.scan_directory(root).await
    }

    /// Open `pdf-annotations.db` from the current root directory.
    pub async fn open_root_database(&self) -> bool {
        match self.bookmarks.root_directory() {
            Some(root) => {
                self.annotations
                    .open_database(&root.path.join(DATABASE_FILE_NAME))
                    .await
            }
            None => {
                log::warn!("No root directory selected; cannot open annotation database");
                false
            }
        }
    }

    /// Close the annotation database and release its access grant.
    pub fn close_database(&self) {
        if let Some(grant) = self.annotations.close_database() {
            self.bookmarks.stop_accessing_file(&grant);
        }
    }

    /// Resolve a NOTERPAGE link (bare or org-bracketed) to a local document and
    /// announce it with [`AppEvent::OpenDocumentRequested`].
    pub fn open_link(&self, link: &str) -> Option<DocumentRequest> {
        let parsed = parse_noter_page_link(extract_link_target(link))?;
        let root = self.current_root();
        let local = self.paths.convert(&parsed.pdf_path, root.as_deref());
        let path = self.bookmarks.resolve(&local)?;

        let request = DocumentRequest {
            path,
            page: parsed.page.unwrap_or(DEFAULT_PAGE).max(1),
            x: parsed.x.unwrap_or(DEFAULT_RATIO),
            y: parsed.y.unwrap_or(DEFAULT_RATIO),
        };
        self.events.emit(AppEvent::OpenDocumentRequested {
            path: request.path.clone(),
            page: request.page,
            x: request.x,
            y: request.y,
        });
        Some(request)
    }

    pub async fn load_annotations(&self) -> Vec<Annotation> {
        let annotations = self.annotations.query_annotations().await;
        self.events
            .emit(AppEvent::AnnotationsLoaded(annotations.clone()));
        annotations
    }

    /// Store a note for a tap on `local_pdf` and return the link text to paste
    /// into the desktop notes.
    pub async fn record_tap(
        &self,
        local_pdf: &Path,
        page: u32,
        x: f64,
        y: f64,
        contents: &str,
        outlines: &str,
    ) -> Option<String> {
        let root = self.current_root();
        let file = self
            .paths
            .raw_path_from_local(&local_pdf.to_string_lossy(), root.as_deref());
        let annotation = Annotation::new(file, page, x, y, contents, outlines, Utc::now());

        if self.annotations.add_annotation(&annotation).await {
            Some(format_annotation_for_noter_page(&annotation))
        } else {
            None
        }
    }
}
