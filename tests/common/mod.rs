#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use serde_json::json;
use url::Url;

use leccap_downloader::config::Selectors;
use leccap_downloader::leccap::browser::{extract_links, BrowserSession, Link};
use leccap_downloader::leccap::events::{EventSink, ProgressEvent};
use leccap_downloader::leccap::fetch::{Body, Fetch, Fetchers, InPageFetch};
use leccap_downloader::leccap::{LeccapError, Result};
use leccap_downloader::{Config, LeccapClient};

pub const ROOT: &str = "https://leccap.test";

/// Shared record of every navigation and network call, in order.
pub type Log = Arc<Mutex<Vec<String>>>;

pub struct FakeSite {
    pages: HashMap<String, String>,
    api: HashMap<String, String>,
    current: Mutex<String>,
    log: Log,
}

impl FakeSite {
    pub fn new(log: Log) -> Self {
        Self {
            pages: HashMap::new(),
            api: HashMap::new(),
            current: Mutex::new("about:blank".to_string()),
            log,
        }
    }

    pub fn page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(format!("{ROOT}{path}"), html.to_string());
        self
    }

    pub fn api(mut self, path_and_query: &str, body: &str) -> Self {
        self.api.insert(format!("{ROOT}{path_and_query}"), body.to_string());
        self
    }
}

#[async_trait]
impl BrowserSession for FakeSite {
    async fn navigate(&self, url: &str) -> Result<()> {
        if !self.pages.contains_key(url) {
            return Err(LeccapError::Script(format!("no page at {url}")));
        }
        self.log.lock().unwrap().push(format!("navigate {url}"));
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Link>> {
        let current = self.current.lock().unwrap().clone();
        let html = self.pages.get(&current).cloned().unwrap_or_default();
        extract_links(&html, &current, selector)
    }

    async fn fetch_in_page(&self, url: &str) -> Result<String> {
        self.log.lock().unwrap().push(format!("in-page {url}"));
        self.api
            .get(url)
            .cloned()
            .ok_or_else(|| LeccapError::Script(format!("HTTP 404 for {url}")))
    }
}

/// What the fake video server announces as `content-length`.
#[derive(Debug, Clone, Copy)]
pub enum Announce {
    Exact,
    Missing,
    Wrong(u64),
}

/// Serves every video as a few fixed chunks.
pub struct FakeMedia {
    log: Log,
    announce: Announce,
    fail_on: Option<usize>,
    served: Mutex<usize>,
}

impl FakeMedia {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            announce: Announce::Exact,
            fail_on: None,
            served: Mutex::new(0),
        }
    }

    pub fn announcing(mut self, announce: Announce) -> Self {
        self.announce = announce;
        self
    }

    /// The `n`th video request (1-based) fails like a dropped connection.
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn content_for(url: &str) -> Vec<u8> {
        format!("video bytes of {url}").repeat(50).into_bytes()
    }
}

#[async_trait]
impl Fetch for FakeMedia {
    async fn text(&self, url: &str) -> Result<String> {
        Err(LeccapError::Script(format!("unexpected text fetch of {url}")))
    }

    async fn stream(&self, url: &str) -> Result<Body> {
        self.log.lock().unwrap().push(format!("video {url}"));
        let served = {
            let mut served = self.served.lock().unwrap();
            *served += 1;
            *served
        };
        if self.fail_on == Some(served) {
            return Err(LeccapError::Script(format!("connection reset fetching {url}")));
        }

        let content = Self::content_for(url);
        let chunks: Vec<Result<Bytes>> = content
            .chunks(100)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let content_length = match self.announce {
            Announce::Exact => Some(content.len() as u64),
            Announce::Missing => None,
            Announce::Wrong(n) => Some(n),
        };
        Ok(Body {
            content_length,
            chunks: stream::iter(chunks).boxed(),
        })
    }
}

#[derive(Default)]
pub struct Collect(pub Mutex<Vec<ProgressEvent>>);

impl EventSink for Collect {
    fn emit(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

pub fn config(download_dir: &Path) -> Config {
    Config {
        root_url: Url::parse(ROOT).unwrap(),
        download_dir: download_dir.to_path_buf(),
        profile_dir: download_dir.join("profile"),
        min_year: 2016,
        nav_timeout: Duration::from_secs(1),
        login_timeout: Duration::from_secs(1),
        poll_interval: Duration::from_millis(1),
        headless: true,
        selectors: Selectors::default(),
    }
}

fn course_list(links: &[(&str, &str)], previous: Option<&str>) -> String {
    let items: String = links
        .iter()
        .map(|(href, text)| format!(r#"<li><a href="{href}">{text}</a></li>"#))
        .collect();
    let previous = previous
        .map(|year| format!(r#"<a class="previous-year" href="/leccap/year/{year}">&laquo; {year}</a>"#))
        .unwrap_or_default();
    format!(r#"<html><body><ul class="course-list">{items}</ul>{previous}</body></html>"#)
}

fn play_list(slugs: &[&str]) -> String {
    let rows: String = slugs
        .iter()
        .map(|slug| {
            format!(r#"<div class="recording"><span class="play-link"><a class="btn" href="/leccap/player/r/{slug}">Play</a></span></div>"#)
        })
        .collect();
    format!("<html><body>{rows}</body></html>")
}

pub fn product(slug: &str, date: &str, title: &str) -> String {
    json!({
        "date": date,
        "title": title,
        "mediaPrefix": "//media.test/leccap/",
        "sitekey": format!("site-{slug}"),
        "recordingkey": format!("key-{slug}"),
        "info": { "products": [{ "movie_exported_name": format!("movie-{slug}") }] }
    })
    .to_string()
}

/// Current year 2024 lists MATH 215; 2023 lists both EECS 482 sections;
/// 2022 is the oldest page.
pub fn site(log: Log) -> FakeSite {
    FakeSite::new(log)
        .page("/leccap/", r#"<html><body><a href="/leccap/year">Browse by year</a></body></html>"#)
        .page(
            "/leccap/year",
            &course_list(&[("/leccap/site/math", "MATH 215 Calculus III")], Some("2023")),
        )
        .page(
            "/leccap/year/2023",
            &course_list(
                &[
                    ("/leccap/site/stats", "STATS 250"),
                    ("/leccap/site/eecs-lec", "EECS 482 Lecture"),
                    ("/leccap/site/eecs-dis", "EECS 482 Discussion"),
                ],
                Some("2022"),
            ),
        )
        .page(
            "/leccap/year/2022",
            &course_list(&[("/leccap/site/old", "PHYS 140")], None),
        )
        .page("/leccap/site/math", &play_list(&["m1"]))
        .page("/leccap/site/eecs-lec", &play_list(&["r1", "r2", "r3"]))
        .page("/leccap/site/eecs-dis", &play_list(&["d1"]))
        .api("/leccap/player/api/product/?rk=m1", &product("m1", "01/10/2024", "Vectors"))
        .api("/leccap/player/api/product/?rk=r1", &product("r1", "09/14/2023", "Intro: Lecture #1!"))
        .api("/leccap/player/api/product/?rk=r2", &product("r2", "09/19/2023", "Threads & Locks"))
        .api("/leccap/player/api/product/?rk=r3", &product("r3", "09/21/2023", "Condition variables"))
        .api("/leccap/player/api/product/?rk=d1", &product("d1", "09/15/2023", "Discussion 1"))
        .api("/leccap/player/api/webvtt/?rk=key-m1", "WEBVTT\n\nm1")
        .api("/leccap/player/api/webvtt/?rk=key-r1", "WEBVTT\n\nr1")
        .api("/leccap/player/api/webvtt/?rk=key-r2", "WEBVTT\n\nr2")
        .api("/leccap/player/api/webvtt/?rk=key-r3", "WEBVTT\n\nr3")
        .api("/leccap/player/api/webvtt/?rk=key-d1", "WEBVTT\n\nd1")
}

pub fn client(site: FakeSite, log: Log, config: Config, events: Arc<Collect>) -> LeccapClient {
    client_with_media(site, FakeMedia::new(log), config, events)
}

pub fn client_with_media(site: FakeSite, media: FakeMedia, config: Config, events: Arc<Collect>) -> LeccapClient {
    let session: Arc<dyn BrowserSession> = Arc::new(site);
    let fetchers = Fetchers::new(Arc::new(InPageFetch::new(session.clone())), Arc::new(media));
    LeccapClient::new(session, fetchers, config, events)
}
