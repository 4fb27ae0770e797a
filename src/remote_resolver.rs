//! Remote recording-database lookup with progressive query relaxation.
//!
//! Queries MusicBrainz by (title, artist) or title only, then the Cover
//! Art Archive for release front art. Exact-match queries fail often on
//! messy consumer filenames, so the title-only path strips decorations
//! and retries with a shortened query; relaxation trades precision for
//! recall, which is acceptable because results stay user-correctable.
//! Every call goes through the shared [`RateLimitedFetcher`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::protocol::{MetadataResult, UNKNOWN_ARTIST};
use crate::rate_limiter::RateLimitedFetcher;

const MUSICBRAINZ_RECORDING_URL: &str = "https://musicbrainz.org/ws/2/recording";
const COVERART_BASE_URL: &str = "https://coverartarchive.org";

/// Parenthetical/bracketed decorations stripped for relaxed retries.
static TITLE_DECORATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\s*\([^)]*\)").unwrap(),
        Regex::new(r"\s*\[[^\]]*\]").unwrap(),
        Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring)\s+.*$").unwrap(),
    ]
});

/// Resolves track metadata against the external recording database.
pub struct RemoteMetadataResolver {
    fetcher: RateLimitedFetcher,
}

impl RemoteMetadataResolver {
    pub fn new(fetcher: RateLimitedFetcher) -> Self {
        Self { fetcher }
    }

    /// Looks up a recording by title, and by artist when one is known.
    ///
    /// Takes the first search result only (database relevance ranking).
    /// Network failures, non-2xx statuses, and empty result sets all
    /// come back as `None`.
    pub fn resolve(&self, title: &str, artist: &str) -> Option<MetadataResult> {
        let query = if artist_is_usable(artist) {
            format!("recording:\"{title}\" AND artist:\"{artist}\"")
        } else {
            format!("recording:\"{title}\"")
        };
        let url = format!(
            "{MUSICBRAINZ_RECORDING_URL}?query={}&limit=1&fmt=json",
            urlencoding::encode(&query)
        );

        let payload = self.fetcher.get_json(&url)?;
        let recording = payload.get("recordings")?.as_array()?.first()?;

        let release = recording
            .get("releases")
            .and_then(|releases| releases.as_array())
            .and_then(|releases| releases.first());
        let release_id = release
            .and_then(|release| release.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let cover_art = release_id
            .as_deref()
            .and_then(|id| self.resolve_cover_art(id));

        // The query echo fills any field the response omits.
        Some(MetadataResult {
            title: recording
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(title)
                .to_string(),
            artist: recording
                .get("artist-credit")
                .and_then(|credit| credit.as_array())
                .and_then(|credit| credit.first())
                .and_then(|credit| credit.get("name"))
                .and_then(Value::as_str)
                .unwrap_or(artist)
                .to_string(),
            album: release
                .and_then(|release| release.get("title"))
                .and_then(Value::as_str)
                .map(str::to_string),
            year: release
                .and_then(|release| release.get("date"))
                .and_then(Value::as_str)
                .and_then(year_from_date),
            cover_art,
            source_id: recording
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string),
            release_id,
        })
    }

    /// Second-chance path after a failed title+artist query.
    ///
    /// Strips decorations and retries title-only; when the cleaned title
    /// still carries more than three significant words, retries once
    /// more with just the first three.
    pub fn resolve_by_title_only(&self, title: &str) -> Option<MetadataResult> {
        let cleaned = simplify_title(title);
        if cleaned.is_empty() {
            return None;
        }

        if let Some(result) = self.resolve(&cleaned, "") {
            return Some(result);
        }

        let significant_words: Vec<&str> = cleaned
            .split_whitespace()
            .filter(|word| word.len() > 2)
            .collect();
        if significant_words.len() > 3 {
            let shortened = significant_words[..3].join(" ");
            return self.resolve(&shortened, "");
        }

        None
    }

    /// Picks a cover-art URL for a release.
    ///
    /// Prefers the front image's 500px thumbnail, then large, 250px, and
    /// the raw image; when the archive lookup fails entirely, falls back
    /// to the deterministic front-250 URL instead of returning nothing.
    fn resolve_cover_art(&self, release_id: &str) -> Option<String> {
        if let Some(payload) = self
            .fetcher
            .get_json(&format!("{COVERART_BASE_URL}/release/{release_id}"))
        {
            if let Some(url) = front_image_url(&payload) {
                return Some(url);
            }
        }
        Some(format!("{COVERART_BASE_URL}/release/{release_id}/front-250"))
    }
}

fn artist_is_usable(artist: &str) -> bool {
    let trimmed = artist.trim();
    !trimmed.is_empty() && trimmed != UNKNOWN_ARTIST
}

fn year_from_date(date: &str) -> Option<String> {
    let year: String = date.chars().take(4).collect();
    if year.chars().count() == 4 {
        Some(year)
    } else {
        None
    }
}

fn front_image_url(payload: &Value) -> Option<String> {
    let front = payload
        .get("images")?
        .as_array()?
        .iter()
        .find(|image| image.get("front").and_then(Value::as_bool) == Some(true))?;

    let thumbnails = front.get("thumbnails");
    let candidates = [
        thumbnails.and_then(|t| t.get("500")),
        thumbnails.and_then(|t| t.get("large")),
        thumbnails.and_then(|t| t.get("250")),
        front.get("image"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|value| value.as_str())
        .map(str::to_string)
}

/// Strips parenthetical/bracketed content and feat. suffixes.
fn simplify_title(title: &str) -> String {
    let mut cleaned = title.to_string();
    for pattern in TITLE_DECORATIONS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artist_is_usable() {
        assert!(artist_is_usable("Neon Pulse"));
        assert!(!artist_is_usable(""));
        assert!(!artist_is_usable("   "));
        assert!(!artist_is_usable("Unknown Artist"));
    }

    #[test]
    fn test_year_from_date() {
        assert_eq!(year_from_date("1998-10-31").as_deref(), Some("1998"));
        assert_eq!(year_from_date("1998").as_deref(), Some("1998"));
        assert_eq!(year_from_date("99"), None);
    }

    #[test]
    fn test_simplify_title_strips_decorations() {
        assert_eq!(
            simplify_title("Song Name (Remastered) [Live] feat. Someone"),
            "Song Name"
        );
        assert_eq!(simplify_title("Song ft. Other Artist"), "Song");
        assert_eq!(simplify_title("Plain Song"), "Plain Song");
    }

    #[test]
    fn test_front_image_url_preference_order() {
        let payload = json!({
            "images": [
                { "front": false, "image": "ignored" },
                {
                    "front": true,
                    "image": "raw-url",
                    "thumbnails": { "500": "url-500", "large": "url-large", "250": "url-250" }
                }
            ]
        });
        assert_eq!(front_image_url(&payload).as_deref(), Some("url-500"));

        let payload = json!({
            "images": [{ "front": true, "image": "raw-url", "thumbnails": { "large": "url-large" } }]
        });
        assert_eq!(front_image_url(&payload).as_deref(), Some("url-large"));

        let payload = json!({
            "images": [{ "front": true, "image": "raw-url" }]
        });
        assert_eq!(front_image_url(&payload).as_deref(), Some("raw-url"));

        let payload = json!({ "images": [{ "front": false, "image": "back" }] });
        assert_eq!(front_image_url(&payload), None);
    }
}
