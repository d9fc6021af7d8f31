use std::sync::Arc;

use crate::settings::SettingsStore;

/// Maps desktop-side document paths onto the local sandbox root and back.
///
/// Substitution is a plain substring replace: an occurrence of the original
/// root anywhere inside a path is rewritten, not only a leading one.
#[derive(Clone)]
pub struct PathTranslator {
    settings: Arc<SettingsStore>,
}

impl PathTranslator {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    fn original_root(&self) -> String {
        let original = self.settings.original_path();
        match original.strip_suffix('/') {
            Some(trimmed) => trimmed.to_string(),
            None => original,
        }
    }

    /// Translate a desktop path into the local root. A supplied root is cached
    /// for later calls that have none; with neither, the path is returned as is.
    pub fn convert(&self, path: &str, current_root_path: Option<&str>) -> String {
        let original = self.original_root();

        let root = match current_root_path {
            Some(root) => {
                if let Err(err) = self.settings.set_last_successful_root_path(root) {
                    log::warn!("Failed to cache root path {root}: {err:#}");
                }
                root.to_string()
            }
            None => match self.settings.last_successful_root_path() {
                Some(cached) => cached,
                None => return path.to_string(),
            },
        };

        if original.is_empty() {
            return path.to_string();
        }
        path.replace(&original, &root)
    }

    /// Inverse of [`convert`](Self::convert), for displaying or storing a
    /// canonical path. Never used while resolving a link.
    pub fn raw_path_from_local(&self, path: &str, current_root_path: Option<&str>) -> String {
        let original = self.original_root();
        let root = match current_root_path {
            Some(root) => root.to_string(),
            None => match self.settings.last_successful_root_path() {
                Some(cached) => cached,
                None => return path.to_string(),
            },
        };

        if root.is_empty() || original.is_empty() {
            return path.to_string();
        }
        path.replace(&root, &original)
    }
}
