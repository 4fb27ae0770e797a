//! Built-in demo track set.
//!
//! Installed when no configured library folder yields any audio files,
//! so the library, enrichment, and playback paths always have data to
//! operate on. Demo tracks have empty uris (nothing to decode) and
//! arrive fully described, so the enrichment pipeline skips them.

use crate::protocol::Track;

fn demo_track(
    id: &str,
    title: &str,
    artist: &str,
    album: &str,
    duration_secs: f64,
    bitrate_kbps: u32,
    format: &str,
    sample_rate_hz: u32,
    bit_depth: u16,
    file_size_bytes: u64,
    filename: &str,
) -> Track {
    Track {
        id: id.to_string(),
        uri: String::new(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: album.to_string(),
        duration_secs,
        artwork: None,
        bitrate_kbps: Some(bitrate_kbps),
        sample_rate_hz: Some(sample_rate_hz),
        channels: Some(2),
        bit_depth: Some(bit_depth),
        file_size_bytes: Some(file_size_bytes),
        filename: filename.to_string(),
        format: format.to_string(),
        metadata_fetched: true,
    }
}

/// The twelve built-in tracks, spanning several artists, albums, and
/// quality tiers.
pub fn demo_tracks() -> Vec<Track> {
    vec![
        demo_track("1", "Midnight Drive", "Neon Pulse", "After Dark", 234.0, 320, "MP3", 44_100, 16, 9_360_000, "midnight_drive.mp3"),
        demo_track("2", "Ocean Waves", "Ambient Flow", "Serenity", 312.0, 1411, "FLAC", 44_100, 24, 55_000_000, "ocean_waves.flac"),
        demo_track("3", "Electric Soul", "Neon Pulse", "After Dark", 198.0, 256, "AAC", 48_000, 16, 6_336_000, "electric_soul.m4a"),
        demo_track("4", "Dawn Chorus", "Ambient Flow", "Serenity", 276.0, 1411, "FLAC", 96_000, 24, 48_800_000, "dawn_chorus.flac"),
        demo_track("5", "City Lights", "Synthwave Radio", "Retro Future", 245.0, 320, "MP3", 44_100, 16, 9_800_000, "city_lights.mp3"),
        demo_track("6", "Neon Rain", "Synthwave Radio", "Retro Future", 289.0, 320, "MP3", 44_100, 16, 11_560_000, "neon_rain.mp3"),
        demo_track("7", "Deep Blue", "Ambient Flow", "Horizons", 420.0, 2116, "FLAC", 96_000, 24, 111_000_000, "deep_blue.flac"),
        demo_track("8", "Pulse", "Neon Pulse", "Velocity", 210.0, 256, "AAC", 44_100, 16, 6_720_000, "pulse.m4a"),
        demo_track("9", "Starlight", "Cosmic Drift", "Nebula", 356.0, 1411, "FLAC", 44_100, 16, 62_600_000, "starlight.flac"),
        demo_track("10", "Solar Wind", "Cosmic Drift", "Nebula", 298.0, 128, "MP3", 44_100, 16, 4_768_000, "solar_wind.mp3"),
        demo_track("11", "Gravity", "Cosmic Drift", "Event Horizon", 267.0, 320, "MP3", 44_100, 16, 10_680_000, "gravity.mp3"),
        demo_track("12", "Echoes", "Synthwave Radio", "Digital Dreams", 332.0, 192, "AAC", 44_100, 16, 7_968_000, "echoes.m4a"),
    ]
}
