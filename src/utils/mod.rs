//! Utility functions and helpers.

pub mod http;

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a displayed count such as "1,204" or " 37 ". Anything unparsable is 0.
pub fn parse_count(text: &str) -> u32 {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Upload date and size pulled from a listing description line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Description {
    pub uploaded: String,
    pub size: String,
}

/// Extract upload date and size from text like
/// "Uploaded 03-14 2019, Size 1.2 GiB, ULed by someone".
pub fn parse_description(text: &str) -> Description {
    static UPLOADED: OnceLock<Option<Regex>> = OnceLock::new();
    static SIZE: OnceLock<Option<Regex>> = OnceLock::new();

    let text = normalize_whitespace(&text.replace('\u{a0}', " "));
    let capture = |re: &Option<Regex>| {
        re.as_ref()
            .and_then(|re| re.captures(&text))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };

    Description {
        uploaded: capture(UPLOADED.get_or_init(|| Regex::new(r"(?i)uploaded\s+([^,]+)").ok())),
        size: capture(SIZE.get_or_init(|| Regex::new(r"(?i)size\s+([^,]+)").ok())),
    }
}
