//! Bridge to the platform's security-scoped bookmark facility.
//!
//! A bookmark is an opaque token that can be persisted and later resolved back
//! to a path. Access to the resolved path is only granted between a successful
//! `start_accessing` and its matching `stop_accessing`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AccessError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBookmark {
    pub path: PathBuf,
    pub is_stale: bool,
}

pub trait ScopedAccess: Send + Sync {
    fn create_bookmark(&self, path: &Path) -> Result<Vec<u8>, AccessError>;

    fn resolve_bookmark(&self, token: &[u8]) -> Result<ResolvedBookmark, AccessError>;

    /// Returns `false` when the grant is refused; nothing needs releasing then.
    fn start_accessing(&self, path: &Path) -> bool;

    fn stop_accessing(&self, path: &Path);
}

#[derive(Serialize, Deserialize)]
struct TokenRecord {
    path: PathBuf,
    created_at: i64,
}

/// Scoped access for platforms without a sandbox: tokens record the path they
/// were made for and go stale once that path disappears.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsScopedAccess;

impl ScopedAccess for FsScopedAccess {
    fn create_bookmark(&self, path: &Path) -> Result<Vec<u8>, AccessError> {
        if !path.exists() {
            return Err(AccessError::Bookmark(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let record = TokenRecord {
            path: path.to_path_buf(),
            created_at: chrono::Utc::now().timestamp(),
        };
        serde_json::to_vec(&record).map_err(|err| AccessError::Bookmark(err.to_string()))
    }

    fn resolve_bookmark(&self, token: &[u8]) -> Result<ResolvedBookmark, AccessError> {
        let record: TokenRecord =
            serde_json::from_slice(token).map_err(|err| AccessError::Bookmark(err.to_string()))?;
        let is_stale = !record.path.exists();
        Ok(ResolvedBookmark {
            path: record.path,
            is_stale,
        })
    }

    fn start_accessing(&self, path: &Path) -> bool {
        path.exists()
    }

    fn stop_accessing(&self, path: &Path) {
        log::trace!("released access to {}", path.display());
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn token_goes_stale_when_target_disappears() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        let access = FsScopedAccess;
        let token = access.create_bookmark(&file).unwrap();
        let resolved = access.resolve_bookmark(&token).unwrap();
        assert_eq!(resolved.path, file);
        assert!(!resolved.is_stale);

        std::fs::remove_file(&file).unwrap();
        assert!(access.resolve_bookmark(&token).unwrap().is_stale);
    }

    #[test]
    fn garbage_token_is_an_error() {
        assert!(matches!(
            FsScopedAccess.resolve_bookmark(b"nope"),
            Err(AccessError::Bookmark(_))
        ));
    }
}
