use std::fmt;

use clap::ValueEnum;
use tracing::debug;

use super::browser::{visit, BrowserSession, Link};
use super::{LeccapError, Result};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Section {
    Lecture,
    Discussion,
}

impl Section {
    pub fn dir_name(self) -> &'static str {
        match self {
            Section::Lecture => "lecture",
            Section::Discussion => "discussion",
        }
    }

    /// Picks this section's link. Lecture is the first of one or two links,
    /// discussion the second of exactly two.
    pub fn pick(self, links: &[Link]) -> Result<&Link> {
        let (index, allowed) = match self {
            Section::Lecture => (0, 1..=2),
            Section::Discussion => (1, 2..=2),
        };
        if !allowed.contains(&links.len()) {
            return Err(LeccapError::SectionPrecondition {
                section: self,
                found: links.len(),
            });
        }
        Ok(&links[index])
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A playable recording as listed on the section page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingStub {
    pub slug: String,
}

/// Opens the section page and lists its recordings in page order.
pub async fn enumerate(session: &dyn BrowserSession, section_link: &Link, config: &Config) -> Result<Vec<RecordingStub>> {
    let target = section_link
        .href
        .as_deref()
        .ok_or_else(|| LeccapError::MissingElement(config.selectors.course_link.clone()))?;
    visit(session, target, config.nav_timeout, config.poll_interval).await?;

    let stubs: Vec<RecordingStub> = session
        .find_elements(&config.selectors.play_link)
        .await?
        .into_iter()
        .filter_map(|link| link.href)
        .filter_map(|href| {
            href.trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|slug| !slug.is_empty())
                .map(|slug| RecordingStub { slug: slug.to_string() })
        })
        .collect();

    debug!("{} recording(s) on {target}", stubs.len());
    Ok(stubs)
}
