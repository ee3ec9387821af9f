use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use super::browser::BrowserSession;
use super::{LeccapError, Result};

/// A response body delivered incrementally.
pub struct Body {
    pub content_length: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes>>,
}

/// One way of retrieving a URL.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn text(&self, url: &str) -> Result<String>;

    async fn stream(&self, url: &str) -> Result<Body>;
}

/// Fetches through the browser page, carrying the logged-in session.
pub struct InPageFetch {
    session: Arc<dyn BrowserSession>,
}

impl InPageFetch {
    pub fn new(session: Arc<dyn BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Fetch for InPageFetch {
    async fn text(&self, url: &str) -> Result<String> {
        self.session.fetch_in_page(url).await
    }

    async fn stream(&self, url: &str) -> Result<Body> {
        let text = self.session.fetch_in_page(url).await?;
        let bytes = Bytes::from(text);
        Ok(Body {
            content_length: Some(bytes.len() as u64),
            chunks: stream::once(async move { Ok(bytes) }).boxed(),
        })
    }
}

/// Plain HTTP, no session attached.
pub struct DirectFetch {
    client: reqwest::Client,
}

impl DirectFetch {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for DirectFetch {
    async fn text(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn stream(&self, url: &str) -> Result<Body> {
        debug!("GET {url} (streaming)");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(Body {
            content_length: response.content_length(),
            chunks: response.bytes_stream().map_err(LeccapError::from).boxed(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    InPage,
    Direct,
}

/// The site endpoints this tool consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Product,
    Subtitles,
    Video,
}

impl Endpoint {
    /// Product and subtitle APIs are session-gated; the video file is public
    /// once its URL is known.
    pub fn transport(self) -> Transport {
        match self {
            Endpoint::Product | Endpoint::Subtitles => Transport::InPage,
            Endpoint::Video => Transport::Direct,
        }
    }
}

#[derive(Clone)]
pub struct Fetchers {
    in_page: Arc<dyn Fetch>,
    direct: Arc<dyn Fetch>,
}

impl Fetchers {
    pub fn new(in_page: Arc<dyn Fetch>, direct: Arc<dyn Fetch>) -> Self {
        Self { in_page, direct }
    }

    pub fn for_endpoint(&self, endpoint: Endpoint) -> &dyn Fetch {
        match endpoint.transport() {
            Transport::InPage => self.in_page.as_ref(),
            Transport::Direct => self.direct.as_ref(),
        }
    }
}
