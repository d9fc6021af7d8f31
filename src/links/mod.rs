//! Text protocols shared with the desktop note-taking side.
//!
//! Two grammars are understood:
//! - `NOTERPAGE:<path>#(<page> <yRatio> . <xRatio>)` deep links into a PDF page
//! - `video:<url>#<start>-<end>` links into a time range of a video
//!
//! Everything here is pure string work; nothing touches the filesystem.

pub mod noter_page;
pub mod video;

pub use noter_page::{
    extract_link_target, format_annotation_for_noter_page, parse_noter_page_link, NoterPageLink,
};
pub use video::{convert_time_to_seconds, parse_video_link, VideoLink};
