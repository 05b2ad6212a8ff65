use once_cell::sync::Lazy;
use regex::Regex;
use url::{ParseError, Url};

use crate::error::{Error, Result};

const VIDEO_PATH: &str = "/video/";
const SEASON_PATH: &str = "/bangumi/play/";

static VIDEO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"BV[a-zA-Z0-9]+").unwrap());
static SEASON_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"ss(\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    SingleVideo,
    Collection,
}

/// Parses `raw_url`, assuming https when the scheme was left out.
fn parse_lenient(raw_url: &str) -> Result<Url> {
    match Url::parse(raw_url) {
        Err(ParseError::RelativeUrlWithoutBase) => Ok(Url::parse(&format!("https://{}", raw_url))?),
        parsed => Ok(parsed?),
    }
}

pub fn classify(raw_url: &str) -> Result<UrlKind> {
    let url = parse_lenient(raw_url.trim())?;
    let path = url.path();

    if path.contains(VIDEO_PATH) {
        Ok(UrlKind::SingleVideo)
    } else if path.contains(SEASON_PATH) {
        Ok(UrlKind::Collection)
    } else {
        Err(Error::UnsupportedUrl(raw_url.to_string()))
    }
}

/// Extracts the `BV...` id of a video URL.
pub fn extract_single_id(raw_url: &str) -> Result<String> {
    VIDEO_ID
        .find(raw_url)
        .map(|found| found.as_str().to_string())
        .ok_or_else(|| Error::IdentifierNotFound("BV id".to_string()))
}

/// Extracts the numeric season id following `ss`.
pub fn extract_collection_id(raw_url: &str) -> Result<String> {
    SEASON_ID
        .captures(raw_url)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_string())
        .ok_or_else(|| Error::IdentifierNotFound("season id".to_string()))
}
