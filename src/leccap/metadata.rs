use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::fetch::{Endpoint, Fetchers};
use super::{LeccapError, Result};
use crate::config::Config;

/// The product JSON of one recording, kept as the site returned it.
///
/// Nothing is validated on fetch; each accessor fails with
/// `MalformedMetadata` when its field is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(Value);

impl Metadata {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    fn field(&self, pointer: &'static str) -> Result<String> {
        match self.0.pointer(pointer) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(LeccapError::MalformedMetadata { field: pointer }),
        }
    }

    pub fn date(&self) -> Result<String> {
        self.field("/date")
    }

    pub fn title(&self) -> Result<String> {
        self.field("/title")
    }

    pub fn media_prefix(&self) -> Result<String> {
        self.field("/mediaPrefix")
    }

    pub fn site_key(&self) -> Result<String> {
        self.field("/sitekey")
    }

    pub fn recording_key(&self) -> Result<String> {
        self.field("/recordingkey")
    }

    pub fn movie_exported_name(&self) -> Result<String> {
        self.field("/info/products/0/movie_exported_name")
    }

    /// `mediaPrefix` is protocol-relative (`//host/path/`).
    pub fn video_url(&self) -> Result<String> {
        Ok(format!(
            "https:{}{}/{}.mp4",
            self.media_prefix()?,
            self.site_key()?,
            self.movie_exported_name()?
        ))
    }
}

pub async fn fetch(fetchers: &Fetchers, config: &Config, slug: &str) -> Result<Metadata> {
    let url = config.product_url(slug)?;
    debug!("fetching metadata for {slug}");
    let body = fetchers.for_endpoint(Endpoint::Product).text(&url).await?;
    Ok(Metadata(serde_json::from_str(&body)?))
}
