use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use scraper::{Html, Selector};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use super::{LeccapError, Result};

/// Snapshot of an anchor element: its visible text and resolved target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: Option<String>,
}

/// An authenticated, JavaScript-capable browsing context.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn find_elements(&self, selector: &str) -> Result<Vec<Link>>;

    /// Runs `fetch(url)` inside the current page so the logged-in session's
    /// cookies apply, and returns the response body as text.
    async fn fetch_in_page(&self, url: &str) -> Result<String>;
}

/// Polls the session URL until `predicate` accepts it or `timeout` elapses.
pub async fn wait_until<F>(
    session: &dyn BrowserSession,
    predicate: F,
    timeout: Duration,
    poll: Duration,
) -> Result<String>
where
    F: Fn(&str) -> bool + Send,
{
    let deadline = Instant::now() + timeout;
    loop {
        let current = session.current_url().await?;
        if predicate(&current) {
            return Ok(current);
        }
        if Instant::now() >= deadline {
            return Err(LeccapError::NavigationTimeout {
                waited: timeout,
                last_url: current,
            });
        }
        tokio::time::sleep(poll).await;
    }
}

/// Navigates to `url` and waits until the browser reports being there.
pub async fn visit(session: &dyn BrowserSession, url: &str, timeout: Duration, poll: Duration) -> Result<String> {
    session.navigate(url).await?;
    wait_until(session, |current| current.contains(url), timeout, poll).await
}

/// Collects the anchors matching `selector` in `html`, resolving each href
/// against `base`.
pub fn extract_links(html: &str, base: &str, selector: &str) -> Result<Vec<Link>> {
    let selector =
        Selector::parse(selector).map_err(|e| LeccapError::Script(format!("bad selector {selector:?}: {e}")))?;
    let base = Url::parse(base).ok();
    let document = Html::parse_document(html);

    let links = document
        .select(&selector)
        .map(|element| {
            let text = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
            let href = element.value().attr("href").map(|raw| match &base {
                Some(base) => base.join(raw).map(String::from).unwrap_or_else(|_| raw.to_string()),
                None => raw.to_string(),
            });
            Link { text, href }
        })
        .collect();

    Ok(links)
}

pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    /// Launches Chrome on the persistent profile in `profile_dir`, so an
    /// earlier login is reused.
    pub async fn launch(profile_dir: &Path, headless: bool) -> Result<Self> {
        tokio::fs::create_dir_all(profile_dir).await?;

        let builder = BrowserConfig::builder().user_data_dir(profile_dir);
        let builder = if headless { builder } else { builder.with_head() };
        let config = builder.build().map_err(LeccapError::Config)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("browser handler error: {e}");
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("navigating to {url}");
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Link>> {
        let html = self.page.content().await?;
        let base = self.current_url().await?;
        extract_links(&html, &base, selector)
    }

    async fn fetch_in_page(&self, url: &str) -> Result<String> {
        let target = serde_json::to_string(url)?;
        let script = format!(
            r#"fetch({target}, {{ credentials: "same-origin" }})
                .then(res => {{
                    if (!res.ok) throw new Error("HTTP " + res.status + " for " + res.url);
                    return res.text();
                }})"#
        );
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(LeccapError::Script)?;

        debug!("in-page fetch {url}");
        let body: String = self.page.evaluate_expression(params).await?.into_value()?;
        Ok(body)
    }
}
