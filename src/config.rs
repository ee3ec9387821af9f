use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::leccap::{LeccapError, Result};

pub const DEFAULT_ROOT_URL: &str = "https://leccap.engin.umich.edu";
pub const LISTING_PATH: &str = "/leccap/";
pub const PRODUCT_API_PATH: &str = "/leccap/player/api/product/";
pub const WEBVTT_API_PATH: &str = "/leccap/player/api/webvtt/";

/// CSS selectors for the one site layout this tool understands.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub by_year: String,
    pub course_link: String,
    pub previous_year: String,
    pub play_link: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            by_year: r#"a[href^="/leccap/year"]"#.to_string(),
            course_link: r#".course-list a[href^="/leccap/site/"]"#.to_string(),
            previous_year: "a.previous-year".to_string(),
            play_link: r#".play-link>a.btn[href^="/leccap/player/r/"]"#.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub root_url: Url,
    pub download_dir: PathBuf,
    pub profile_dir: PathBuf,
    /// Year pages at or below this one are never visited.
    pub min_year: u32,
    pub nav_timeout: Duration,
    pub login_timeout: Duration,
    pub poll_interval: Duration,
    pub headless: bool,
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_url: Url::parse(DEFAULT_ROOT_URL).expect("default root url is valid"),
            download_dir: PathBuf::from("downloads"),
            profile_dir: PathBuf::from("chrome-data"),
            min_year: 2016,
            nav_timeout: Duration::from_secs(60),
            login_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(1000),
            headless: false,
            selectors: Selectors::default(),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| LeccapError::Config(format!("{key}={raw:?}: {e}"))),
        _ => Ok(default),
    }
}

impl Config {
    /// Reads `.env` and `LECCAP_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let root: String = env_or("LECCAP_ROOT_URL", DEFAULT_ROOT_URL.to_string())?;
        Ok(Self {
            root_url: Url::parse(&root)?,
            download_dir: env_or("LECCAP_DOWNLOAD_DIR", defaults.download_dir)?,
            profile_dir: env_or("LECCAP_PROFILE_DIR", defaults.profile_dir)?,
            min_year: env_or("LECCAP_MIN_YEAR", defaults.min_year)?,
            nav_timeout: Duration::from_secs(env_or("LECCAP_NAV_TIMEOUT_SECS", defaults.nav_timeout.as_secs())?),
            login_timeout: Duration::from_secs(env_or(
                "LECCAP_LOGIN_TIMEOUT_SECS",
                defaults.login_timeout.as_secs(),
            )?),
            poll_interval: Duration::from_millis(env_or("LECCAP_POLL_MS", 1000u64)?),
            headless: env_or("LECCAP_HEADLESS", defaults.headless)?,
            selectors: defaults.selectors,
        })
    }

    pub fn listing_url(&self) -> Result<Url> {
        Ok(self.root_url.join(LISTING_PATH)?)
    }

    pub fn product_url(&self, slug: &str) -> Result<String> {
        let mut url = self.root_url.join(PRODUCT_API_PATH)?;
        url.query_pairs_mut().append_pair("rk", slug);
        Ok(url.into())
    }

    pub fn subtitles_url(&self, recording_key: &str) -> Result<String> {
        let mut url = self.root_url.join(WEBVTT_API_PATH)?;
        url.query_pairs_mut().append_pair("rk", recording_key);
        Ok(url.into())
    }
}
