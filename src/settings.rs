use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Opaque token bytes, stored as base64 so the settings file stays readable.
mod token_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

mod token_map_base64 {
    use std::collections::HashMap;

    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        map: &HashMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: HashMap<&String, String> = map
            .iter()
            .map(|(path, token)| (path, STANDARD.encode(token)))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, Vec<u8>>, D::Error> {
        let encoded = HashMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(path, token)| {
                STANDARD
                    .decode(token.as_bytes())
                    .map(|bytes| (path, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRoot {
    pub path: String,
    #[serde(with = "token_base64")]
    pub token: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PersistedState {
    /// Desktop-side document root that links are written against.
    original_path: String,
    last_successful_root_path: Option<String>,
    root_directory: Option<SavedRoot>,
    #[serde(with = "token_map_base64")]
    bookmarks: HashMap<String, Vec<u8>>,
    last_selected_root: Option<String>,
    search_text: HashMap<String, String>,
}

/// Process-wide persisted state. Every setter writes the whole file back.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PersistedState>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings at {}: {err}", path.display());
                PersistedState::default()
            })
        } else {
            PersistedState::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, PersistedState> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PersistedState> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update(&self, apply: impl FnOnce(&mut PersistedState)) -> Result<()> {
        let mut guard = self.write();
        apply(&mut guard);
        self.persist(&guard)
    }

    pub fn original_path(&self) -> String {
        self.read().original_path.clone()
    }

    pub fn set_original_path(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.update(|state| state.original_path = path)
    }

    pub fn last_successful_root_path(&self) -> Option<String> {
        self.read().last_successful_root_path.clone()
    }

    pub fn set_last_successful_root_path(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.update(|state| state.last_successful_root_path = Some(path))
    }

    pub fn root_directory(&self) -> Option<SavedRoot> {
        self.read().root_directory.clone()
    }

    pub fn set_root_directory(&self, root: SavedRoot) -> Result<()> {
        self.update(|state| {
            state.last_selected_root = Some(root.path.clone());
            state.root_directory = Some(root);
        })
    }

    pub fn bookmarks(&self) -> HashMap<String, Vec<u8>> {
        self.read().bookmarks.clone()
    }

    pub fn set_bookmarks(&self, bookmarks: HashMap<String, Vec<u8>>) -> Result<()> {
        self.update(|state| state.bookmarks = bookmarks)
    }

    pub fn last_selected_root(&self) -> Option<String> {
        self.read().last_selected_root.clone()
    }

    pub fn search_text(&self, document: &str) -> Option<String> {
        self.read().search_text.get(document).cloned()
    }

    pub fn set_search_text(&self, document: &str, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.update(|state| {
            if text.is_empty() {
                state.search_text.remove(document);
            } else {
                state.search_text.insert(document.to_string(), text);
            }
        })
    }

    fn persist(&self, data: &PersistedState) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: PersistedState = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store.set_original_path("/Users/me/Documents/").unwrap();
        store.set_last_successful_root_path("/private/var/root").unwrap();
        store
            .set_root_directory(SavedRoot {
                path: "/private/var/root".into(),
                token: vec![0, 1, 2, 255],
            })
            .unwrap();
        let mut bookmarks = HashMap::new();
        bookmarks.insert("/private/var/root/a.pdf".to_string(), vec![9, 8, 7]);
        store.set_bookmarks(bookmarks.clone()).unwrap();
        store.set_search_text("/a.pdf", "entropy").unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.original_path(), "/Users/me/Documents/");
        assert_eq!(
            reopened.last_successful_root_path().as_deref(),
            Some("/private/var/root")
        );
        assert_eq!(reopened.root_directory().unwrap().token, vec![0, 1, 2, 255]);
        assert_eq!(
            reopened.last_selected_root().as_deref(),
            Some("/private/var/root")
        );
        assert_eq!(reopened.bookmarks(), bookmarks);
        assert_eq!(reopened.search_text("/a.pdf").as_deref(), Some("entropy"));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.original_path(), "");
        assert!(store.bookmarks().is_empty());
    }

    #[test]
    fn empty_search_text_clears_entry() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("s.json")).unwrap();
        store.set_search_text("/a.pdf", "x").unwrap();
        store.set_search_text("/a.pdf", "").unwrap();
        assert_eq!(store.search_text("/a.pdf"), None);
    }
}
