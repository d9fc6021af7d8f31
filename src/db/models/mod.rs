pub mod annotation;
pub mod file_record;

pub use annotation::Annotation;
pub use file_record::{LastVisitedPage, SyncTime};
