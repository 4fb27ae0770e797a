//! Artwork materialization into stable local files.
//!
//! Cover art arrives either as embedded tag bytes or as a remote URL;
//! both land as one normalized JPEG per track under the cache root. The
//! filename carries a pipeline version so a normalization change cannot
//! collide with files written by an earlier version.

use std::fs;
use std::path::PathBuf;

use image::imageops::FilterType;
use image::ImageFormat;
use log::debug;

use crate::rate_limiter::RateLimitedFetcher;

const ARTWORK_VERSION: &str = "art-v2";
const MAX_EDGE_PX: u32 = 512;

/// Writes artwork files under one root directory.
pub struct ArtworkStore {
    root: PathBuf,
}

impl ArtworkStore {
    /// Store rooted at the per-user cache location.
    pub fn new() -> Option<Self> {
        dirs::cache_dir().map(|path| Self {
            root: path.join("resona").join("artwork"),
        })
    }

    /// Store rooted at an explicit directory (tests).
    pub fn at_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn artwork_path(&self, track_id: &str) -> PathBuf {
        self.root.join(format!("{ARTWORK_VERSION}-{track_id}.jpg"))
    }

    /// Persists embedded tag art for a track; `None` on any failure.
    pub fn materialize_embedded(&self, bytes: &[u8], track_id: &str) -> Option<String> {
        self.write_normalized(bytes, track_id)
    }

    /// Downloads and persists remote art for a track; `None` on any
    /// network or write failure.
    pub fn materialize_remote(
        &self,
        fetcher: &RateLimitedFetcher,
        url: &str,
        track_id: &str,
    ) -> Option<String> {
        let bytes = fetcher.get_bytes(url)?;
        self.write_normalized(&bytes, track_id)
    }

    /// Re-encodes to a bounded-edge JPEG; undecodable bytes are written
    /// as-is so a usable original is never thrown away.
    fn write_normalized(&self, bytes: &[u8], track_id: &str) -> Option<String> {
        if let Err(err) = fs::create_dir_all(&self.root) {
            debug!("Artwork: failed to create {}: {}", self.root.display(), err);
            return None;
        }

        let path = self.artwork_path(track_id);
        match image::load_from_memory(bytes) {
            Ok(decoded) => {
                let (width, height) = (decoded.width(), decoded.height());
                let bounded = if width.max(height) > MAX_EDGE_PX {
                    decoded.resize(MAX_EDGE_PX, MAX_EDGE_PX, FilterType::Lanczos3)
                } else {
                    decoded
                };
                // JPEG has no alpha channel.
                let rgb = image::DynamicImage::ImageRgb8(bounded.to_rgb8());
                if let Err(err) = rgb.save_with_format(&path, ImageFormat::Jpeg) {
                    debug!("Artwork: failed to write {}: {}", path.display(), err);
                    return None;
                }
            }
            Err(err) => {
                debug!("Artwork: undecodable image for {track_id} ({err}); storing raw bytes");
                if let Err(err) = fs::write(&path, bytes) {
                    debug!("Artwork: failed to write {}: {}", path.display(), err);
                    return None;
                }
            }
        }

        Some(path.to_string_lossy().to_string())
    }
}
