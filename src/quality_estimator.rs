//! Heuristic audio-quality estimation.
//!
//! True bitrate/sample-rate extraction needs binary header parsing; this
//! module trades that precision for zero extra I/O at scan time. When
//! file size and duration are known, the effective bitrate is computed
//! from them; otherwise a per-format default table applies. Local tag
//! extraction may later replace these values with real ones.

const LOSSLESS_FORMATS: [&str; 4] = ["FLAC", "WAV", "AIFF", "ALAC"];
const CD_QUALITY_BITRATE_KBPS: u32 = 1411;

/// Complete estimated quality quadruple. Never produced partially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityEstimate {
    pub bitrate_kbps: u32,
    pub sample_rate_hz: u32,
    pub bit_depth: u16,
    pub channels: u16,
}

/// Coarse quality classification used for UI badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Lossless,
    High,
    Standard,
    Low,
}

impl QualityTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Lossless => "LOSSLESS",
            Self::High => "HI-RES",
            Self::Standard => "HIGH",
            Self::Low => "STANDARD",
        }
    }
}

/// Derives an estimated quality quadruple for a track.
///
/// Pure; always returns all four fields. `format` is the uppercase tag
/// derived from the filename extension at scan time.
pub fn estimate(
    format: &str,
    duration_secs: f64,
    file_size_bytes: Option<u64>,
) -> QualityEstimate {
    let format_tag = format.to_ascii_uppercase();

    if let Some(size) = file_size_bytes {
        if duration_secs > 0.0 {
            let computed_kbps = ((size as f64 * 8.0) / (duration_secs * 1000.0)).round() as u32;
            return if LOSSLESS_FORMATS.contains(&format_tag.as_str()) {
                lossless_estimate(computed_kbps)
            } else {
                QualityEstimate {
                    bitrate_kbps: computed_kbps,
                    sample_rate_hz: if computed_kbps > 200 { 48_000 } else { 44_100 },
                    bit_depth: 16,
                    channels: 2,
                }
            };
        }
    }

    default_estimate(&format_tag)
}

/// Tiers bit depth and sample rate by the computed effective bitrate.
/// Anything clearly above CD-quality effective bitrate is treated as a
/// 24-bit source.
fn lossless_estimate(computed_kbps: u32) -> QualityEstimate {
    if computed_kbps > 2000 {
        QualityEstimate {
            bitrate_kbps: computed_kbps,
            sample_rate_hz: 96_000,
            bit_depth: 24,
            channels: 2,
        }
    } else if computed_kbps > 1400 {
        QualityEstimate {
            bitrate_kbps: computed_kbps,
            sample_rate_hz: 48_000,
            bit_depth: 24,
            channels: 2,
        }
    } else {
        QualityEstimate {
            bitrate_kbps: computed_kbps.max(CD_QUALITY_BITRATE_KBPS),
            sample_rate_hz: 44_100,
            bit_depth: 16,
            channels: 2,
        }
    }
}

/// Fixed per-format defaults used when size or duration is unknown.
fn default_estimate(format_tag: &str) -> QualityEstimate {
    let (bitrate_kbps, sample_rate_hz, bit_depth) = match format_tag {
        "FLAC" => (CD_QUALITY_BITRATE_KBPS, 44_100, 16),
        "WAV" => (CD_QUALITY_BITRATE_KBPS, 44_100, 16),
        "AIFF" => (CD_QUALITY_BITRATE_KBPS, 44_100, 16),
        "ALAC" => (CD_QUALITY_BITRATE_KBPS, 44_100, 16),
        "AAC" => (256, 44_100, 16),
        "MP3" => (320, 44_100, 16),
        "OGG" => (256, 44_100, 16),
        "OPUS" => (160, 48_000, 16),
        "WMA" => (192, 44_100, 16),
        _ => (192, 44_100, 16),
    };
    QualityEstimate {
        bitrate_kbps,
        sample_rate_hz,
        bit_depth,
        channels: 2,
    }
}

/// Classifies a track into a coarse quality tier from format/bitrate.
pub fn quality_tier(format: &str, bitrate_kbps: Option<u32>) -> QualityTier {
    let format_tag = format.to_ascii_uppercase();
    if LOSSLESS_FORMATS.contains(&format_tag.as_str()) {
        return QualityTier::Lossless;
    }
    match bitrate_kbps {
        Some(kbps) if kbps >= 320 => QualityTier::High,
        Some(kbps) if kbps >= 192 => QualityTier::Standard,
        _ => QualityTier::Low,
    }
}

/// Maps a filename extension to the display format tag.
pub fn format_from_filename(filename: &str) -> String {
    let extension = filename
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "mp3" => "MP3".to_string(),
        "flac" => "FLAC".to_string(),
        "wav" => "WAV".to_string(),
        "aac" | "m4a" => "AAC".to_string(),
        "ogg" => "OGG".to_string(),
        "wma" => "WMA".to_string(),
        "aiff" => "AIFF".to_string(),
        "alac" => "ALAC".to_string(),
        "opus" => "OPUS".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossless_estimate_follows_bitrate_tiers() {
        // 55 MB over 300 s is ~1467 kbps: the middle tier.
        let estimate = estimate("FLAC", 300.0, Some(55_000_000));
        assert_eq!(estimate.bit_depth, 24);
        assert_eq!(estimate.sample_rate_hz, 48_000);
        assert_eq!(estimate.channels, 2);
        assert!(estimate.bitrate_kbps > 1400);
    }

    #[test]
    fn test_lossless_high_tier() {
        // ~2933 kbps
        let estimate = estimate("FLAC", 300.0, Some(110_000_000));
        assert_eq!(estimate.sample_rate_hz, 96_000);
        assert_eq!(estimate.bit_depth, 24);
    }

    #[test]
    fn test_lossless_floor_bitrate() {
        // ~267 kbps computed, floored to CD quality.
        let estimate = estimate("FLAC", 300.0, Some(10_000_000));
        assert_eq!(estimate.bitrate_kbps, 1411);
        assert_eq!(estimate.sample_rate_hz, 44_100);
        assert_eq!(estimate.bit_depth, 16);
    }

    #[test]
    fn test_lossy_computed_bitrate_not_clamped() {
        // 9.36 MB over 234 s is ~320 kbps.
        let estimate = estimate("MP3", 234.0, Some(9_360_000));
        assert_eq!(estimate.bitrate_kbps, 320);
        assert_eq!(estimate.sample_rate_hz, 48_000);
        assert_eq!(estimate.bit_depth, 16);
    }

    #[test]
    fn test_lossy_low_bitrate_sample_rate() {
        // ~128 kbps stays at 44.1 kHz.
        let estimate = estimate("MP3", 300.0, Some(4_800_000));
        assert_eq!(estimate.sample_rate_hz, 44_100);
    }

    #[test]
    fn test_mp3_default_without_size() {
        let estimate = estimate("MP3", 200.0, None);
        assert_eq!(
            estimate,
            QualityEstimate {
                bitrate_kbps: 320,
                sample_rate_hz: 44_100,
                bit_depth: 16,
                channels: 2,
            }
        );
    }

    #[test]
    fn test_zero_duration_falls_back_to_defaults() {
        let estimate = estimate("OPUS", 0.0, Some(1_000_000));
        assert_eq!(estimate.bitrate_kbps, 160);
        assert_eq!(estimate.sample_rate_hz, 48_000);
    }

    #[test]
    fn test_unknown_format_default() {
        let estimate = estimate("XYZ", 100.0, None);
        assert_eq!(estimate.bitrate_kbps, 192);
        assert_eq!(estimate.sample_rate_hz, 44_100);
        assert_eq!(estimate.bit_depth, 16);
    }

    #[test]
    fn test_quality_tiers() {
        assert_eq!(quality_tier("FLAC", None), QualityTier::Lossless);
        assert_eq!(quality_tier("flac", Some(900)), QualityTier::Lossless);
        assert_eq!(quality_tier("MP3", Some(320)), QualityTier::High);
        assert_eq!(quality_tier("AAC", Some(256)), QualityTier::Standard);
        assert_eq!(quality_tier("MP3", Some(128)), QualityTier::Low);
        assert_eq!(quality_tier("MP3", None), QualityTier::Low);
        assert_eq!(QualityTier::High.label(), "HI-RES");
    }

    #[test]
    fn test_format_from_filename() {
        assert_eq!(format_from_filename("song.mp3"), "MP3");
        assert_eq!(format_from_filename("song.m4a"), "AAC");
        assert_eq!(format_from_filename("song.FLAC"), "FLAC");
        assert_eq!(format_from_filename("song.shn"), "SHN");
    }
}
