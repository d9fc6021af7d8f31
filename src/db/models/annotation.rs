//! Annotation rows as shared with the desktop side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::helpers::encode_timestamp;

pub const DEFAULT_ANNOTATION_TYPE: &str = "text";

/// One note anchored to a point on a PDF page.
///
/// `edges` is `"(x y)"`: ratios of page width and height measured from the
/// top-left corner. `created`/`modified` use the `"(high low)"` timestamp pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub file: String,
    pub page: u32,
    pub edges: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
    pub contents: String,
    pub subject: String,
    pub created: String,
    pub modified: String,
    pub outlines: String,
}

impl Annotation {
    /// New text annotation at ratio position (`x`, `y`) on 1-based `page`.
    pub fn new(
        file: impl Into<String>,
        page: u32,
        x: f64,
        y: f64,
        contents: impl Into<String>,
        outlines: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let file = file.into();
        let seconds = now.timestamp();
        let stamp = encode_timestamp(seconds);
        Self {
            id: format!("{file}#{seconds}"),
            file,
            page: page.max(1),
            edges: format!("({x} {y})"),
            kind: DEFAULT_ANNOTATION_TYPE.to_string(),
            color: String::new(),
            contents: contents.into(),
            subject: String::new(),
            created: stamp.clone(),
            modified: stamp,
            outlines: outlines.into(),
        }
    }

    /// The `(x, y)` ratios stored in `edges`. Rows written with four edges
    /// (left top right bottom) yield their top-left corner.
    pub fn ratios(&self) -> Option<(f64, f64)> {
        let mut parts = self
            .edges
            .trim()
            .trim_matches(|c| c == '(' || c == ')')
            .split_whitespace();
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        Some((x, y))
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.modified = encode_timestamp(now.timestamp());
    }
}
