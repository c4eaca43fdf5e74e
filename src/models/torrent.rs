//! Torrent listing data structure.

use serde::{Deserialize, Serialize};

/// A single torrent row scraped from an upstream listing page.
///
/// Served to clients exactly as scraped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Torrent {
    /// Torrent title
    pub name: String,

    /// Detail page URL (absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Magnet URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet: Option<String>,

    /// Size as displayed upstream (e.g. "1.4 GiB")
    #[serde(default)]
    pub size: String,

    /// Upload date as displayed upstream
    #[serde(default)]
    pub uploaded: String,

    #[serde(default)]
    pub seeders: u32,

    #[serde(default)]
    pub leechers: u32,
}

impl Torrent {
    /// Create a torrent with only a name; remaining fields are empty.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: None,
            magnet: None,
            size: String::new(),
            uploaded: String::new(),
            seeders: 0,
            leechers: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_links_are_not_serialized() {
        let json = serde_json::to_value(Torrent::named("ubuntu.iso")).unwrap();
        assert_eq!(json["name"], "ubuntu.iso");
        assert!(json.get("magnet").is_none());
        assert!(json.get("link").is_none());
        assert_eq!(json["seeders"], 0);
    }
}
