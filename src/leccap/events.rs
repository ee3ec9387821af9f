use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedSender;

use super::recordings::Section;

/// Where a course/section run currently is. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Locating,
    Enumerating,
    FetchingMetadata,
    PersistingMetadata,
    DownloadingMedia,
    Done,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Stage {
        course: String,
        section: Section,
        stage: Stage,
    },
    RecordingsFound {
        count: usize,
    },
    MetadataFetched {
        index: usize,
        total: usize,
        slug: String,
    },
    MetadataWritten {
        path: PathBuf,
    },
    VideoStarted {
        index: usize,
        total: usize,
        name: String,
        content_length: Option<u64>,
    },
    VideoProgress {
        written: u64,
    },
    VideoWritten {
        path: PathBuf,
        bytes: u64,
    },
    SubtitlesWritten {
        path: PathBuf,
    },
}

/// Receiver of pipeline progress. The core never renders anything itself.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl EventSink for UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        // a closed front end must not abort a download
        let _ = self.send(event);
    }
}
