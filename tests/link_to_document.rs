use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use noterlink_lib::{
    db::DATABASE_FILE_NAME,
    links::{
        convert_time_to_seconds, extract_link_target, format_annotation_for_noter_page,
        parse_noter_page_link, parse_video_link,
    },
    AccessError, Annotation, App, FsScopedAccess, ResolvedBookmark, ScopedAccess, SettingsStore,
};
use tempfile::TempDir;

/// Scoped access that remembers how many grants are open per path.
#[derive(Default)]
struct PairingAccess {
    inner: FsScopedAccess,
    open: Mutex<HashMap<PathBuf, i64>>,
    started: Mutex<usize>,
}

impl PairingAccess {
    fn balanced(&self) -> bool {
        self.open.lock().unwrap().values().all(|count| *count == 0)
    }
}

impl ScopedAccess for PairingAccess {
    fn create_bookmark(&self, path: &Path) -> Result<Vec<u8>, AccessError> {
        self.inner.create_bookmark(path)
    }

    fn resolve_bookmark(&self, token: &[u8]) -> Result<ResolvedBookmark, AccessError> {
        self.inner.resolve_bookmark(token)
    }

    fn start_accessing(&self, path: &Path) -> bool {
        *self.started.lock().unwrap() += 1;
        *self.open.lock().unwrap().entry(path.to_path_buf()).or_default() += 1;
        true
    }

    fn stop_accessing(&self, path: &Path) {
        *self.open.lock().unwrap().entry(path.to_path_buf()).or_default() -= 1;
    }
}

fn desktop_layout(dir: &TempDir) -> PathBuf {
    let root = dir.path().join("Sandbox").join("Notes");
    std::fs::create_dir_all(root.join("books")).unwrap();
    std::fs::write(root.join("books").join("sicp.pdf"), b"%PDF-1.7").unwrap();
    std::fs::write(root.join(DATABASE_FILE_NAME), b"").unwrap();
    root
}

#[test]
fn noter_page_examples() {
    let link = parse_noter_page_link("noterpage:/x.pdf#(3 0.25 . 0.75)").unwrap();
    assert_eq!((link.page, link.y, link.x), (Some(3), Some(0.25), Some(0.75)));

    let partial = parse_noter_page_link("noterpage:/a/b.pdf").unwrap();
    assert_eq!(partial.pdf_path, "/a/b.pdf");
    assert!(partial.page.is_none() && partial.x.is_none() && partial.y.is_none());
}

#[test]
fn video_examples() {
    assert_eq!(convert_time_to_seconds("1:02:03"), Some(3723));
    assert_eq!(convert_time_to_seconds("2:05"), Some(125));
    assert_eq!(convert_time_to_seconds("45"), Some(45));
    assert_eq!(convert_time_to_seconds("bad"), None);

    let video = parse_video_link("video:https://e.com/v?id=1#0:10-0:20").unwrap();
    assert_eq!(video.url, "https://e.com/v?id=1&t=10");
    assert_eq!(video.start.as_deref(), Some("0:10"));
    assert_eq!(video.end.as_deref(), Some("0:20"));
}

#[test]
fn formatted_annotations_parse_back() {
    let now = chrono::Utc::now();
    for (page, x, y) in [(1, 0.0, 0.0), (12, 0.333, 0.9), (250, 1.0, 0.0625)] {
        let annotation = Annotation::new("/Users/me/Notes/a b.pdf", page, x, y, "n", "", now);
        let text = format_annotation_for_noter_page(&annotation);
        let link = parse_noter_page_link(extract_link_target(&text)).unwrap();
        assert_eq!(link.page, Some(page));
        assert!((link.x.unwrap() - x).abs() < 1e-9);
        assert!((link.y.unwrap() - y).abs() < 1e-9);
    }
}

#[tokio::test]
async fn desktop_link_opens_sandbox_document() {
    let dir = TempDir::new().unwrap();
    let root = desktop_layout(&dir);

    let settings = SettingsStore::new(dir.path().join("settings.json")).unwrap();
    settings.set_original_path("/Users/me/Notes").unwrap();
    let access = Arc::new(PairingAccess::default());
    let app = App::new(Arc::new(settings), access.clone());

    let count = app.select_root_directory(&root).await.unwrap();
    assert_eq!(count, 3);
    assert_eq!(app.bookmarks.scan_progress(), 1.0);

    let request = app
        .open_link("NOTERPAGE:/Users/me/Notes/books/sicp.pdf#(42 0.1 . 0.2)")
        .unwrap();
    assert_eq!(request.path, root.join("books").join("sicp.pdf"));
    assert_eq!(request.page, 42);

    assert!(app.open_root_database().await);
    assert!(app.annotations.save_last_visited_page(&request.path.to_string_lossy(), 42).await);
    assert_eq!(
        app.annotations
            .get_last_visited_page(&request.path.to_string_lossy())
            .await,
        Some(42)
    );
    app.close_database();

    assert!(*access.started.lock().unwrap() >= 2);
    assert!(access.balanced());
}

#[tokio::test]
async fn translation_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let root = desktop_layout(&dir);
    let settings_path = dir.path().join("settings.json");

    {
        let settings = SettingsStore::new(settings_path.clone()).unwrap();
        settings.set_original_path("/Users/me/Notes/").unwrap();
        let app = App::new(Arc::new(settings), Arc::new(FsScopedAccess));
        app.select_root_directory(&root).await.unwrap();
        app.open_link("NOTERPAGE:/Users/me/Notes/books/sicp.pdf").unwrap();
    }

    let settings = Arc::new(SettingsStore::new(settings_path).unwrap());
    let app = App::new(Arc::clone(&settings), Arc::new(FsScopedAccess));
    app.bookmarks.restore_saved_bookmarks();

    let converted = app.paths.convert("/Users/me/Notes/books/sicp.pdf", None);
    assert_eq!(
        PathBuf::from(&converted),
        root.join("books").join("sicp.pdf")
    );
    assert!(app.open_link("NOTERPAGE:/Users/me/Notes/books/sicp.pdf").is_some());
}
