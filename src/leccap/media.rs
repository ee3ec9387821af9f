use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::events::{EventSink, ProgressEvent};
use super::fetch::{Body, Endpoint, Fetchers};
use super::metadata::Metadata;
use super::Result;
use crate::config::Config;

/// Capacity of the write buffer in front of each video file.
pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFiles {
    pub video: PathBuf,
    pub subtitles: PathBuf,
    pub video_bytes: u64,
}

pub struct MediaDownloader<'a> {
    fetchers: &'a Fetchers,
    config: &'a Config,
    events: &'a dyn EventSink,
}

impl<'a> MediaDownloader<'a> {
    pub fn new(fetchers: &'a Fetchers, config: &'a Config, events: &'a dyn EventSink) -> Self {
        Self {
            fetchers,
            config,
            events,
        }
    }

    /// Writes `<name>.mp4` then `<name>.vtt` into `dir`. The video finishes
    /// before the subtitles are requested.
    pub async fn download(&self, record: &Metadata, name: &str, dir: &Path, position: (usize, usize)) -> Result<MediaFiles> {
        let video_url = record.video_url()?;
        let video = dir.join(format!("{name}.mp4"));
        let subtitles = dir.join(format!("{name}.vtt"));

        debug!("downloading {video_url} to {}", video.display());
        let body = self.fetchers.for_endpoint(Endpoint::Video).stream(&video_url).await?;
        self.events.emit(ProgressEvent::VideoStarted {
            index: position.0,
            total: position.1,
            name: name.to_string(),
            content_length: body.content_length,
        });
        let expected = body.content_length;
        let video_bytes = self.write_stream(body, &video).await?;
        if let Some(expected) = expected.filter(|&n| n != video_bytes) {
            warn!(
                "{}: wrote {video_bytes} bytes, server announced {expected}",
                video.display()
            );
        }
        self.events.emit(ProgressEvent::VideoWritten {
            path: video.clone(),
            bytes: video_bytes,
        });

        let vtt_url = self.config.subtitles_url(&record.recording_key()?)?;
        let text = self.fetchers.for_endpoint(Endpoint::Subtitles).text(&vtt_url).await?;
        tokio::fs::write(&subtitles, text).await?;
        self.events.emit(ProgressEvent::SubtitlesWritten {
            path: subtitles.clone(),
        });

        Ok(MediaFiles {
            video,
            subtitles,
            video_bytes,
        })
    }

    /// Truncates `path` and streams `body` into it.
    async fn write_stream(&self, mut body: Body, path: &Path) -> Result<u64> {
        let file = tokio::fs::File::create(path).await?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut written = 0u64;

        while let Some(chunk) = body.chunks.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
            self.events.emit(ProgressEvent::VideoProgress { written });
        }
        writer.flush().await?;

        Ok(written)
    }
}
