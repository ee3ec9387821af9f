use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::browser::{visit, BrowserSession, Link};
use super::{LeccapError, Result};
use crate::config::Config;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());

/// Lowercases and drops all whitespace, so "CS 101" and " cs101 " agree.
pub fn fuzzy_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A course as requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub name: String,
    pub key: String,
    pub folder: String,
}

impl Course {
    pub fn new(raw: &str) -> Self {
        let name = raw.trim().to_string();
        Self {
            key: fuzzy_key(&name),
            folder: name.replace(['/', '\\'], "_"),
            name,
        }
    }

    /// Prefix match on normalized text. "cs10" also matches "cs101".
    pub fn matches(&self, link_text: &str) -> bool {
        fuzzy_key(link_text).starts_with(&self.key)
    }
}

fn year_of(label: &str) -> Option<u32> {
    YEAR_RE.find(label).and_then(|m| m.as_str().parse().ok())
}

pub struct CourseLocator<'a> {
    session: &'a dyn BrowserSession,
    config: &'a Config,
}

impl<'a> CourseLocator<'a> {
    pub fn new(session: &'a dyn BrowserSession, config: &'a Config) -> Self {
        Self { session, config }
    }

    /// Finds the links for `course`, walking back one year page at a time.
    /// `None` means the course was not listed on any page above the year
    /// cutoff.
    pub async fn locate(&self, course: &Course) -> Result<Option<Vec<Link>>> {
        let selectors = &self.config.selectors;
        let listing = self.config.listing_url()?;

        // The first visit can bounce through the login page.
        visit(self.session, listing.as_str(), self.config.login_timeout, self.config.poll_interval).await?;

        let by_year = self.first_href(&selectors.by_year).await?;
        visit(self.session, &by_year, self.config.nav_timeout, self.config.poll_interval).await?;

        loop {
            let matches: Vec<Link> = self
                .session
                .find_elements(&selectors.course_link)
                .await?
                .into_iter()
                .filter(|link| course.matches(&link.text))
                .collect();
            if !matches.is_empty() {
                info!("found {} link(s) for {:?}", matches.len(), course.name);
                return Ok(Some(matches));
            }

            let previous = self.session.find_elements(&selectors.previous_year).await?.into_iter().next();
            let Some(previous) = previous else {
                debug!("no previous-year control, giving up on {:?}", course.name);
                return Ok(None);
            };
            match year_of(&previous.text) {
                Some(year) if year > self.config.min_year => {}
                _ => {
                    debug!("previous year {:?} is past the cutoff", previous.text);
                    return Ok(None);
                }
            }
            let href = previous
                .href
                .ok_or_else(|| LeccapError::MissingElement(selectors.previous_year.clone()))?;
            debug!("{:?} not on this page, trying {:?}", course.name, previous.text);
            visit(self.session, &href, self.config.nav_timeout, self.config.poll_interval).await?;
        }
    }

    async fn first_href(&self, selector: &str) -> Result<String> {
        self.session
            .find_elements(selector)
            .await?
            .into_iter()
            .find_map(|link| link.href)
            .ok_or_else(|| LeccapError::MissingElement(selector.to_string()))
    }
}
