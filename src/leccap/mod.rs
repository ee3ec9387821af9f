pub mod browser;
pub mod events;
pub mod fetch;
pub mod locator;
pub mod media;
pub mod metadata;
pub mod naming;
pub mod recordings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use browser::BrowserSession;
use events::{EventSink, ProgressEvent, Stage};
use fetch::{DirectFetch, Fetchers, InPageFetch};
use locator::{Course, CourseLocator};
use media::{MediaDownloader, MediaFiles};
use recordings::Section;

#[derive(Debug, thiserror::Error)]
pub enum LeccapError {
    #[error("cannot pick the {section} section from {found} matching course link(s)")]
    SectionPrecondition { section: Section, found: usize },
    #[error("recording metadata has no usable `{field}`")]
    MalformedMetadata { field: &'static str },
    #[error("navigation did not complete within {waited:?} (browser still at {last_url})")]
    NavigationTimeout { waited: Duration, last_url: String },
    #[error("no element matches {0:?}")]
    MissingElement(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("in-page script failed: {0}")]
    Script(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = LeccapError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub course: String,
    pub section: Section,
    pub metadata: Vec<PathBuf>,
    pub media: Vec<MediaFiles>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(Summary),
    NotFound,
}

pub struct LeccapClient {
    session: Arc<dyn BrowserSession>,
    fetchers: Fetchers,
    config: Config,
    events: Arc<dyn EventSink>,
}

impl LeccapClient {
    pub fn new(session: Arc<dyn BrowserSession>, fetchers: Fetchers, config: Config, events: Arc<dyn EventSink>) -> Self {
        Self {
            session,
            fetchers,
            config,
            events,
        }
    }

    /// Session-gated endpoints go through the browser, the video file
    /// through a plain reqwest client.
    pub fn with_default_transports(
        session: Arc<dyn BrowserSession>,
        config: Config,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let fetchers = Fetchers::new(
            Arc::new(InPageFetch::new(session.clone())),
            Arc::new(DirectFetch::new(client)),
        );
        Ok(Self::new(session, fetchers, config, events))
    }

    pub fn section_dir(&self, course: &Course, section: Section) -> PathBuf {
        self.config
            .download_dir
            .join(&course.folder)
            .join(section.dir_name())
    }

    /// Locates `course_name`, then fetches and persists the metadata of every
    /// recording in `section` before downloading any media.
    pub async fn run(&self, course_name: &str, section: Section) -> Result<Outcome> {
        let course = Course::new(course_name);
        let enter = |stage: Stage| {
            info!("{} / {section}: {stage:?}", course.name);
            self.events.emit(ProgressEvent::Stage {
                course: course.name.clone(),
                section,
                stage,
            });
        };

        enter(Stage::Locating);
        let locator = CourseLocator::new(self.session.as_ref(), &self.config);
        let Some(links) = locator.locate(&course).await? else {
            enter(Stage::NotFound);
            return Ok(Outcome::NotFound);
        };
        let link = section.pick(&links)?;

        enter(Stage::Enumerating);
        let stubs = recordings::enumerate(self.session.as_ref(), link, &self.config).await?;
        let total = stubs.len();
        self.events.emit(ProgressEvent::RecordingsFound { count: total });

        enter(Stage::FetchingMetadata);
        let mut records = Vec::with_capacity(total);
        for (i, stub) in stubs.iter().enumerate() {
            records.push(metadata::fetch(&self.fetchers, &self.config, &stub.slug).await?);
            self.events.emit(ProgressEvent::MetadataFetched {
                index: i + 1,
                total,
                slug: stub.slug.clone(),
            });
        }

        enter(Stage::PersistingMetadata);
        let names = records
            .iter()
            .enumerate()
            .map(|(i, record)| naming::base_name(record, i + 1))
            .collect::<Result<Vec<_>>>()?;
        let section_dir = self.section_dir(&course, section);
        let json_dir = section_dir.join("json");
        tokio::fs::create_dir_all(&json_dir).await?;

        let mut metadata_paths = Vec::with_capacity(total);
        for (name, record) in names.iter().zip(&records) {
            let path = json_dir.join(format!("{name}.json"));
            tokio::fs::write(&path, serde_json::to_vec(record)?).await?;
            self.events.emit(ProgressEvent::MetadataWritten { path: path.clone() });
            metadata_paths.push(path);
        }

        enter(Stage::DownloadingMedia);
        let videos_dir = section_dir.join("videos");
        tokio::fs::create_dir_all(&videos_dir).await?;
        let downloader = MediaDownloader::new(&self.fetchers, &self.config, self.events.as_ref());

        let mut media = Vec::with_capacity(total);
        for (i, (name, record)) in names.iter().zip(records).enumerate() {
            media.push(downloader.download(&record, name, &videos_dir, (i + 1, total)).await?);
        }

        enter(Stage::Done);
        Ok(Outcome::Done(Summary {
            course: course.name.clone(),
            section,
            metadata: metadata_paths,
            media,
        }))
    }
}
