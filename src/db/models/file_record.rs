//! Bookkeeping rows kept next to the annotations. Both are keyed by file path
//! and overwritten on every write.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTime {
    pub file: String,
    pub last_sync_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastVisitedPage {
    pub pdf_path: String,
    pub last_page: u32,
    pub last_accessed: Option<String>,
}
