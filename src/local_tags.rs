//! Embedded tag and cover-art extraction backed by `lofty`.
//!
//! Any read failure is reported as `None`; the enrichment pipeline
//! treats that the same as a file with no usable tags.

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};

/// Tag values found inside an audio file, all optional.
#[derive(Debug, Clone, Default)]
pub struct ExtractedTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    /// Raw embedded cover-art bytes, authoritative for this file.
    pub embedded_art: Option<Vec<u8>>,
}

impl ExtractedTags {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.year.is_none()
            && self.embedded_art.is_none()
    }
}

fn first_non_empty_value<F>(
    primary_tag: Option<&Tag>,
    tags: &[Tag],
    mut extractor: F,
) -> Option<String>
where
    F: FnMut(&Tag) -> Option<String>,
{
    if let Some(tag) = primary_tag {
        if let Some(value) = extractor(tag) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    for tag in tags {
        if let Some(value) = extractor(tag) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    None
}

fn derive_year_from_date(date: &str) -> Option<String> {
    let year: String = date.chars().take(4).collect();
    if year.chars().count() == 4 {
        Some(year)
    } else {
        None
    }
}

/// Reads embedded tags and cover art from an audio file.
///
/// Returns `None` when the file cannot be read or carries nothing
/// usable; never propagates an error into the pipeline.
pub fn extract(path: &Path) -> Option<ExtractedTags> {
    let tagged_file = read_from_path(path).ok()?;
    let primary_tag = tagged_file.primary_tag();
    let tags = tagged_file.tags();

    let title = first_non_empty_value(primary_tag, tags, |tag| {
        tag.title().map(|value| value.into_owned())
    });
    let artist = first_non_empty_value(primary_tag, tags, |tag| {
        tag.artist().map(|value| value.into_owned())
    });
    let album = first_non_empty_value(primary_tag, tags, |tag| {
        tag.album().map(|value| value.into_owned())
    });
    let year = first_non_empty_value(primary_tag, tags, |tag| {
        tag.get_string(ItemKey::Year).map(str::to_string)
    })
    .or_else(|| {
        first_non_empty_value(primary_tag, tags, |tag| {
            tag.get_string(ItemKey::RecordingDate)
                .or_else(|| tag.get_string(ItemKey::OriginalReleaseDate))
                .map(str::to_string)
        })
        .as_deref()
        .and_then(derive_year_from_date)
    });

    let embedded_art = primary_tag
        .and_then(|tag| tag.pictures().first())
        .or_else(|| tags.iter().find_map(|tag| tag.pictures().first()))
        .map(|picture| picture.data().to_vec());

    let extracted = ExtractedTags {
        title,
        artist,
        album,
        year,
        embedded_art,
    };
    if extracted.is_empty() {
        None
    } else {
        Some(extracted)
    }
}
