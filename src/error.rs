use thiserror::Error;

/// Link text that could not be read as a NOTERPAGE or video link.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("link '{0}' has no scheme separator")]
    MissingSchemeSeparator(String),
    #[error("link '{0}' is not a video link")]
    NotVideoLink(String),
}

/// Scoped filesystem access could not be obtained.
///
/// Every variant means the caller should ask the user to pick the root
/// directory again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("no bookmark stored for {0}")]
    NoBookmark(String),
    #[error("bookmark for {0} is stale")]
    Stale(String),
    #[error("access to {0} was denied")]
    Denied(String),
    #[error("bookmark could not be created or read: {0}")]
    Bookmark(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no annotation database is open")]
    NotOpen,
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("{0:#}")]
    Database(#[from] anyhow::Error),
}
