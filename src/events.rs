use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::models::Annotation;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum AppEvent {
    DatabaseFoundInDirectory(PathBuf),
    ScanProgress(f32),
    AnnotationsLoaded(Vec<Annotation>),
    #[serde(rename_all = "camelCase")]
    OpenDocumentRequested {
        path: PathBuf,
        page: u32,
        x: f64,
        y: f64,
    },
}

/// Typed fan-out of [`AppEvent`]s. Dropping a receiver unsubscribes it.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Publishing with no subscribers is not an error.
    pub fn emit(&self, event: AppEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("event dropped: no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
