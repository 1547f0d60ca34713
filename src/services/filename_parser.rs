//! Filename parser for library folders and episode files
//!
//! Parses names like:
//! - "The Matrix (1999)" / "The.Matrix.1999.1080p.BluRay"
//! - "Chicago Fire S14E08 1080p WEB h264-ETHEL"
//! - "Corner Gas 6x12 Super Sensitive"

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

static SXXEXX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)\s*S(\d{1,2})\s*E(\d{1,3})").expect("valid regex"));
static NXNN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*?)\s*\b(\d{1,2})x(\d{2,3})\b").expect("valid regex"));
static VERBOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.*?)\s*Season\s*(\d+).*?Episode\s*(\d+)").expect("valid regex")
});
static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[]?\b(19\d{2}|20\d{2})\b[\)\]]?").expect("valid regex"));
static QUALITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(2160p|1080p|720p|576p|480p|4k|bluray|blu-ray|web-?dl|webrip|hdtv|dvdrip|remux|x264|x265|h264|h265|hevc)\b")
        .expect("valid regex")
});
static REGION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\b(US|UK|AU|NZ)\s*$").expect("valid regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Parsed episode information from a filename
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedEpisode {
    pub show_name: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

/// Title and year parsed from a movie or series folder name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTitle {
    pub title: String,
    pub year: Option<u32>,
}

/// Replace scene separators with spaces
fn separators_to_spaces(name: &str) -> String {
    name.replace(['.', '_'], " ")
}

/// Strip the extension from a filename if it looks like one
fn strip_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => stem,
        _ => filename,
    }
}

/// Parse a filename to extract season and episode numbers
pub fn parse_episode(filename: &str) -> ParsedEpisode {
    let cleaned = separators_to_spaces(strip_extension(filename));

    let caps = SXXEXX_RE
        .captures(&cleaned)
        .or_else(|| NXNN_RE.captures(&cleaned))
        .or_else(|| VERBOSE_RE.captures(&cleaned));

    let Some(caps) = caps else {
        return ParsedEpisode::default();
    };

    let show_name = caps
        .get(1)
        .map(|m| clean_show_name(m.as_str().trim_end_matches('-')))
        .filter(|name| !name.is_empty());

    ParsedEpisode {
        show_name,
        season: caps.get(2).and_then(|m| m.as_str().parse().ok()),
        episode: caps.get(3).and_then(|m| m.as_str().parse().ok()),
    }
}

/// Parse a library folder name into a display title and optional year.
///
/// Anything after the year or the first quality tag is treated as release
/// noise and dropped.
pub fn parse_title(folder: &str) -> ParsedTitle {
    let cleaned = separators_to_spaces(folder);

    let mut cut = cleaned.len();
    let mut year = None;

    // The last plausible release year wins, so "Blade Runner 2049 2017" keeps
    // its title. A year at the very start is the title itself ("1917") and a
    // year past next year cannot be a release year ("Blade Runner 2049").
    let latest_release = OffsetDateTime::now_utc().year() + 1;
    if let Some(caps) = YEAR_RE
        .captures_iter(&cleaned)
        .filter(|c| c.get(0).is_some_and(|m| m.start() > 0))
        .filter(|c| {
            c.get(1)
                .and_then(|y| y.as_str().parse::<i32>().ok())
                .is_some_and(|y| y <= latest_release)
        })
        .last()
    {
        if let (Some(whole), Some(y)) = (caps.get(0), caps.get(1)) {
            cut = whole.start();
            year = y.as_str().parse().ok();
        }
    }
    if let Some(m) = QUALITY_RE.find(&cleaned) {
        if m.start() > 0 && m.start() < cut {
            cut = m.start();
        }
    }

    let title = SPACE_RE
        .replace_all(cleaned[..cut].trim_end_matches([' ', '-', '(', '[']), " ")
        .trim()
        .to_string();

    ParsedTitle { title, year }
}

/// Clean up the show name
fn clean_show_name(name: &str) -> String {
    let mut cleaned = parse_title(name).title;
    cleaned = REGION_RE.replace(&cleaned, "").to_string();
    SPACE_RE.replace_all(&cleaned, " ").trim().to_string()
}

/// Returns true if the filename has a video extension we recognise
pub fn is_video_file(filename: &str) -> bool {
    const VIDEO_EXTENSIONS: &[&str] = &[
        "mkv", "mp4", "avi", "m4v", "mov", "wmv", "flv", "webm", "mpeg", "mpg", "ts", "m2ts",
    ];

    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
