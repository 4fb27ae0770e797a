//! File-system audio-asset enumeration.
//!
//! Walks configured library folders for supported audio files and
//! builds provisional [`Track`] records: stable path-derived id,
//! filename-derived title, authoritative duration and file size, and a
//! format tag from the extension. Everything else is filled in later by
//! the enrichment pipeline.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use lofty::file::AudioFile;
use lofty::read_from_path;
use log::debug;

use crate::protocol::{Track, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use crate::quality_estimator;

pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 9] =
    ["mp3", "wav", "ogg", "flac", "aac", "m4a", "aiff", "opus", "wma"];

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_AUDIO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn collect_audio_files_from_folder(folder_path: &Path) -> Vec<PathBuf> {
    let mut pending_directories = vec![folder_path.to_path_buf()];
    let mut files = Vec::new();

    while let Some(directory) = pending_directories.pop() {
        let entries = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Scan: failed to read {}: {}", directory.display(), err);
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(
                        "Scan: failed to read an entry in {}: {}",
                        directory.display(),
                        err
                    );
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    debug!("Scan: failed to inspect {}: {}", path.display(), err);
                    continue;
                }
            };

            if file_type.is_dir() {
                pending_directories.push(path);
                continue;
            }

            if file_type.is_file() && is_supported_audio_file(&path) {
                files.push(path);
            }
        }
    }

    files.sort_unstable();
    files
}

/// Stable track id derived from the file path.
pub fn stable_track_id(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("trk-{:x}", hasher.finish())
}

fn provisional_title(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    let title = stem.replace('_', " ").trim().to_string();
    if title.is_empty() {
        "Unknown Title".to_string()
    } else {
        title
    }
}

/// Builds a provisional track for one audio file.
///
/// Duration comes from the container header when readable, zero
/// otherwise; the estimator's zero-duration fallback covers that case.
pub fn provisional_track_from_path(path: &Path) -> Track {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();

    let duration_secs = match read_from_path(path) {
        Ok(tagged_file) => tagged_file.properties().duration().as_secs_f64(),
        Err(err) => {
            debug!("Scan: failed to probe {}: {}", path.display(), err);
            0.0
        }
    };
    let file_size_bytes = std::fs::metadata(path).ok().map(|meta| meta.len());

    Track {
        id: stable_track_id(path),
        uri: path.to_string_lossy().to_string(),
        title: provisional_title(&filename),
        artist: UNKNOWN_ARTIST.to_string(),
        album: UNKNOWN_ALBUM.to_string(),
        duration_secs,
        artwork: None,
        bitrate_kbps: None,
        sample_rate_hz: None,
        channels: None,
        bit_depth: None,
        file_size_bytes,
        filename: filename.clone(),
        format: quality_estimator::format_from_filename(&filename),
        metadata_fetched: false,
    }
}

/// Enumerates all configured folders into provisional tracks, deduped
/// by path and ordered by path for a stable discovery order.
pub fn scan_folders(folders: &[String]) -> Vec<Track> {
    let mut paths = BTreeSet::new();
    for folder in folders {
        for path in collect_audio_files_from_folder(Path::new(folder)) {
            paths.insert(path);
        }
    }
    paths
        .iter()
        .map(|path| provisional_track_from_path(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_supported_extensions_case_insensitive() {
        assert!(is_supported_audio_file(Path::new("/music/a.mp3")));
        assert!(is_supported_audio_file(Path::new("/music/a.FLAC")));
        assert!(!is_supported_audio_file(Path::new("/music/a.txt")));
        assert!(!is_supported_audio_file(Path::new("/music/noext")));
    }

    #[test]
    fn test_stable_track_id_is_deterministic() {
        let a = stable_track_id(Path::new("/music/a.mp3"));
        let b = stable_track_id(Path::new("/music/a.mp3"));
        let c = stable_track_id(Path::new("/music/b.mp3"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("trk-"));
    }

    #[test]
    fn test_provisional_title_from_filename() {
        assert_eq!(provisional_title("midnight_drive.mp3"), "midnight drive");
        assert_eq!(provisional_title("Plain Song.flac"), "Plain Song");
        assert_eq!(provisional_title(".mp3"), "Unknown Title");
    }

    #[test]
    fn test_scan_folders_builds_provisional_tracks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.mp3"), b"not really audio").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("two.flac"), b"also not audio").unwrap();

        let tracks = scan_folders(&[dir.path().to_string_lossy().to_string()]);
        assert_eq!(tracks.len(), 2);

        let one = tracks
            .iter()
            .find(|track| track.filename == "one.mp3")
            .unwrap();
        assert_eq!(one.format, "MP3");
        assert_eq!(one.title, "one");
        assert_eq!(one.artist, "Unknown Artist");
        assert_eq!(one.duration_secs, 0.0);
        assert!(one.file_size_bytes.unwrap() > 0);
        assert!(!one.metadata_fetched);

        let two = tracks
            .iter()
            .find(|track| track.filename == "two.flac")
            .unwrap();
        assert_eq!(two.format, "FLAC");
    }

    #[test]
    fn test_scan_missing_folder_yields_nothing() {
        let missing = PathBuf::from("/definitely/not/here");
        let tracks = scan_folders(&[missing.to_string_lossy().to_string()]);
        assert!(tracks.is_empty());
    }
}
