use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use leccap_downloader::leccap::browser::ChromeSession;
use leccap_downloader::leccap::events::{ProgressEvent, Stage};
use leccap_downloader::leccap::recordings::Section;
use leccap_downloader::{Config, LeccapClient, Outcome};

#[derive(Debug, Parser)]
#[command(version, about = "Download lecture recordings, subtitles and metadata from the lecture-capture portal")]
struct Cli {
    /// Newline-delimited file of course names; prompts for one when omitted
    courses: Option<PathBuf>,

    /// Section(s) to download for every course
    #[arg(short, long = "section", value_enum, default_values_t = [Section::Lecture])]
    sections: Vec<Section>,

    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Chrome profile directory holding the logged-in session
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Stop walking back through year pages at this year
    #[arg(long)]
    min_year: Option<u32>,

    #[arg(long)]
    headless: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("LECCAP_LOG").unwrap_or_else(|_| EnvFilter::new("leccap_downloader=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_courses(cli: &Cli) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let raw = match &cli.courses {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            print!("[?] Enter course name > ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line
        }
    };

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Draws progress bars for the event stream until the sender is dropped.
async fn render_progress(mut events: UnboundedReceiver<ProgressEvent>) {
    let count_style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let bytes_style = ProgressStyle::with_template("{msg} [{bar:40}] {bytes}/{total_bytes} {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    let bars = MultiProgress::new();
    let mut recordings = 0u64;
    let mut metadata_bar: Option<ProgressBar> = None;
    let mut media_bar: Option<ProgressBar> = None;
    let mut video_bar: Option<ProgressBar> = None;

    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::Stage {
                stage: Stage::DownloadingMedia,
                ..
            } => {
                if let Some(bar) = metadata_bar.take() {
                    bar.finish_and_clear();
                }
                info!("downloading media, this may take a very long time");
                let bar = ProgressBar::new(recordings)
                    .with_style(count_style.clone())
                    .with_message("media");
                media_bar = Some(bars.add(bar));
            }
            ProgressEvent::Stage {
                stage: Stage::Done | Stage::NotFound,
                ..
            } => {
                for bar in [metadata_bar.take(), media_bar.take(), video_bar.take()].into_iter().flatten() {
                    bar.finish_and_clear();
                }
            }
            ProgressEvent::Stage { .. } => {}
            ProgressEvent::RecordingsFound { count } => {
                recordings = count as u64;
                let bar = ProgressBar::new(recordings)
                    .with_style(count_style.clone())
                    .with_message("metadata");
                metadata_bar = Some(bars.add(bar));
            }
            ProgressEvent::MetadataFetched { .. } => {
                if let Some(bar) = &metadata_bar {
                    bar.inc(1);
                }
            }
            ProgressEvent::MetadataWritten { .. } => {}
            ProgressEvent::VideoStarted {
                index,
                total,
                name,
                content_length,
            } => {
                let bar = ProgressBar::new(content_length.unwrap_or(0))
                    .with_style(bytes_style.clone())
                    .with_message(format!("[{index}/{total}] {name}"));
                video_bar = Some(bars.add(bar));
            }
            ProgressEvent::VideoProgress { written } => {
                if let Some(bar) = &video_bar {
                    bar.set_position(written);
                }
            }
            ProgressEvent::VideoWritten { .. } => {
                if let Some(bar) = video_bar.take() {
                    bar.finish_and_clear();
                }
            }
            ProgressEvent::SubtitlesWritten { path } => {
                if let Some(bar) = &media_bar {
                    bar.inc(1);
                }
                info!("saved {}", path.display());
            }
        }
    }
}

async fn run_batch(client: &LeccapClient, courses: &[String], sections: &[Section]) -> Result<(), Box<dyn std::error::Error>> {
    for course in courses {
        for &section in sections {
            match client.run(course, section).await? {
                Outcome::Done(summary) => info!(
                    "{} / {}: {} recording(s) saved",
                    summary.course,
                    summary.section,
                    summary.media.len()
                ),
                Outcome::NotFound => warn!("course {course:?} not found, skipping"),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = &cli.download_dir {
        config.download_dir = dir.clone();
    }
    if let Some(dir) = &cli.profile_dir {
        config.profile_dir = dir.clone();
    }
    if let Some(year) = cli.min_year {
        config.min_year = year;
    }
    config.headless |= cli.headless;

    let courses = read_courses(&cli).await?;
    if courses.is_empty() {
        warn!("no course names given");
        return Ok(());
    }
    info!(
        "course files will be saved under {}",
        config.download_dir.display()
    );

    let session = Arc::new(ChromeSession::launch(&config.profile_dir, config.headless).await?);
    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(render_progress(rx));

    let client = LeccapClient::with_default_transports(session.clone(), config, Arc::new(tx))?;
    let result = run_batch(&client, &courses, &cli.sections).await;
    drop(client);
    let _ = renderer.await;

    if let Ok(session) = Arc::try_unwrap(session) {
        session.close().await?;
    }

    if let Err(e) = &result {
        error!("aborting: {e}");
    }
    result
}
