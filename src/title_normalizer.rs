//! Filename-derived title cleanup.
//!
//! Consumer-sourced audio files carry titles polluted by downloader
//! prefixes, quality tags, and video-site ids. `normalize` strips the
//! known noise patterns in a fixed order; every step is a no-op when its
//! pattern is absent, and the whole chain is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Bracketed/parenthetical source annotations, both bracket styles.
static NOISE_ANNOTATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(
            r"(?i)\s[\(\[](?:official\s+(?:music\s+)?video|official\s+audio|audio|lyric\s+video|lyrics|music\s+video|hq|hd|audio\s+only)[\)\]]",
        )
        .unwrap(),
        // Dash-form quality tags: " - HQ", " - HD"
        Regex::new(r"(?i)\s-\s(?:hq|hd)\b").unwrap(),
    ]
});

/// Leading track numbers: "01 - ", "2. ", "07 "
static TRACK_NUMBER_PREFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{1,2}\s*-\s*").unwrap(),
        Regex::new(r"^\d{1,2}\.\s*").unwrap(),
        Regex::new(r"^\d{1,2}\s+").unwrap(),
    ]
});

static DOWNLOADER_SITE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^y2mate\.com\s*-\s*").unwrap());

/// Trailing bracketed fragment, e.g. a pasted video id: " [dQw4w9WgXcQ]"
static TRAILING_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\[[^\]]*\]$").unwrap());

/// Bitrate/resolution annotations: "(320 kbps)", "[320kbps]", "- 1080p", "(720p)"
static QUALITY_ANNOTATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\s*\(\s*\d+\s*kbp?s\s*\)").unwrap(),
        Regex::new(r"(?i)\s*\[\s*\d+\s*kbp?s\s*\]").unwrap(),
        Regex::new(r"(?i)\s*-\s*\d{3,4}p\b").unwrap(),
        Regex::new(r"(?i)\s*\(\s*\d{3,4}p?\s*\)").unwrap(),
    ]
});

/// Trailing downloader-style id: exactly 11 url-safe chars after "-" or "_".
static TRAILING_VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[-_]\s*[A-Za-z0-9_-]{11}\s*$").unwrap());

/// Stray standalone number left floating at the end of the string.
static TRAILING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\d+\s*$").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strips known noise patterns from a raw filename-derived title.
///
/// Pure and panic-free; returns an empty string for empty input. The
/// steps are order-sensitive: track-number prefixes must go before
/// underscore normalization collapses the "01 - " shape. A single pass
/// can expose a pattern for an earlier step (underscore replacement
/// uncovers "05 " prefixes), so passes repeat until the output settles.
pub fn normalize(raw_title: &str) -> String {
    let mut cleaned = raw_title.to_string();
    // Every step only deletes text or rewrites underscores, so the
    // fixpoint exists; the bound is a guard, not a tuning knob.
    for _ in 0..8 {
        let next = normalize_pass(&cleaned);
        if next == cleaned {
            break;
        }
        cleaned = next;
    }
    cleaned
}

fn normalize_pass(raw_title: &str) -> String {
    if raw_title.is_empty() {
        return String::new();
    }

    let mut cleaned = raw_title.to_string();

    for pattern in NOISE_ANNOTATIONS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }

    for pattern in TRACK_NUMBER_PREFIXES.iter() {
        cleaned = pattern.replace(&cleaned, "").into_owned();
    }

    cleaned = DOWNLOADER_SITE_PREFIX.replace(&cleaned, "").into_owned();
    cleaned = TRAILING_BRACKET.replace(&cleaned, "").into_owned();

    for pattern in QUALITY_ANNOTATIONS.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }

    cleaned = TRAILING_VIDEO_ID.replace(&cleaned, "").into_owned();
    cleaned = TRAILING_NUMBER.replace(&cleaned, "").into_owned();

    cleaned = WHITESPACE_RUN.replace_all(&cleaned, " ").into_owned();
    cleaned = cleaned.replace("_-_", " - ");
    cleaned = cleaned.replace('_', " ");

    cleaned.trim().to_string()
}
