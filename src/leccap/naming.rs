use std::sync::LazyLock;

use regex::Regex;

use super::metadata::Metadata;
use super::{LeccapError, Result};

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// `MM/DD/YYYY` to `YYYY-MM-DD`. Anything past the third `/` is ignored and
/// each part is reduced to word characters.
pub fn iso_date(raw: &str) -> Result<String> {
    let parts: Vec<String> = raw
        .trim()
        .split('/')
        .map(|part| NON_WORD_RE.replace_all(part, "_").into_owned())
        .collect();
    match parts.as_slice() {
        [month, day, year, ..] => Ok(format!("{year}-{month}-{day}")),
        _ => Err(LeccapError::MalformedMetadata { field: "/date" }),
    }
}

/// Shared base name of the json, video and subtitle files of one recording,
/// e.g. `003-2023-09-14_Intro_Lecture_1_`.
pub fn base_name(record: &Metadata, sequence: usize) -> Result<String> {
    let date = iso_date(&record.date()?)?;
    let title = NON_WORD_RE.replace_all(&format!(" {}", record.title()?), "_").into_owned();
    Ok(format!("{sequence:03}-{date}{title}"))
}
