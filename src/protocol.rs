//! Event-bus protocol shared by all runtime components.
//!
//! This module defines the data model for scanned tracks and the message
//! payloads exchanged between library scanning, metadata enrichment, and
//! playback handlers.

/// Repeat behavior applied when navigating beyond the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum RepeatMode {
    Off, // Stop after reaching the end of the queue
    All, // Wrap around to the beginning of the queue
    One, // Repeat the current track
}

impl RepeatMode {
    /// Advances to the next mode in the off -> all -> one cycle.
    pub fn cycled(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Library(LibraryMessage),
    Enrichment(EnrichmentMessage),
    Playback(PlaybackMessage),
}

/// One playable audio item with identity, file attributes, and
/// progressively enrichable metadata.
///
/// `duration_secs` and `filename` are fixed at scan time. The four
/// quality fields are either all unset or all set together; the
/// estimator and the cache both produce complete quadruples.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Stable track id derived from the underlying file path.
    pub id: String,
    /// Playable locator. Empty for synthetic demo tracks.
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Authoritative duration in seconds, from the file at scan time.
    pub duration_secs: f64,
    /// Local artwork file reference, if materialized.
    pub artwork: Option<String>,
    pub bitrate_kbps: Option<u32>,
    pub sample_rate_hz: Option<u32>,
    pub channels: Option<u16>,
    pub bit_depth: Option<u16>,
    pub file_size_bytes: Option<u64>,
    pub filename: String,
    /// Format tag derived from the filename extension at scan time.
    pub format: String,
    /// True once the enrichment pipeline has made its final attempt for
    /// this track, successful or not. Guards against re-fetching tracks
    /// whose lookup permanently failed.
    pub metadata_fetched: bool,
}

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Best-effort record produced by a remote recording-database lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataResult {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Four-digit year taken from the release date, when present.
    pub year: Option<String>,
    /// Cover-art image URL, remote.
    pub cover_art: Option<String>,
    /// Recording id in the external database.
    pub source_id: Option<String>,
    /// Release id used for cover-art lookups.
    pub release_id: Option<String>,
}

/// Library-domain commands and notifications.
#[derive(Debug, Clone)]
pub enum LibraryMessage {
    RequestScan,
    ScanStarted,
    ScanCompleted { tracks: Vec<Track> },
    /// No configured folder was readable; the demo library was installed
    /// instead. Carries the folders that failed.
    ScanUnavailable { folders: Vec<String> },
    ScanFailed(String),
}

/// Enrichment-domain commands and notifications.
#[derive(Debug, Clone)]
pub enum EnrichmentMessage {
    /// Request background enrichment for the given tracks. Ignored if a
    /// run is already in flight.
    EnrichTracks(Vec<Track>),
    /// One batch finished; carries the updated track values to merge
    /// into the canonical list.
    TracksEnriched(Vec<Track>),
    /// The whole run finished; every input track now has
    /// `metadata_fetched == true`.
    EnrichmentCompleted { resolved: usize, failed: usize },
}

/// Playback-domain commands and notifications.
#[derive(Debug, Clone)]
pub enum PlaybackMessage {
    PlayTrackById(String),
    /// Replace the queue with an album's tracks and start the first.
    PlayAlbumById(String),
    TogglePlayPause,
    SkipNext,
    SkipPrevious,
    Seek(f64),
    /// The engine reported natural end of the current track.
    TrackFinished,
    ToggleShuffle,
    ToggleRepeat,
    PlaybackProgress { position_secs: f64, duration_secs: f64 },
}
