//! Background metadata enrichment service.
//!
//! Consumes `EnrichTracks` requests from the bus and upgrades each
//! provisional track: cache first, then embedded tags, then the remote
//! recording database, then heuristic quality defaults. Work proceeds
//! in small batches so partial results reach the library early, and a
//! failed track never blocks the rest of its batch.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::artwork_store::ArtworkStore;
use crate::local_tags::{self, ExtractedTags};
use crate::metadata_cache::{CacheEntry, MetadataCache};
use crate::protocol::{
    EnrichmentMessage, MetadataResult, Message, Track, UNKNOWN_ALBUM, UNKNOWN_ARTIST,
};
use crate::quality_estimator;
use crate::rate_limiter::{RateLimitedFetcher, RateLimiter};
use crate::remote_resolver::RemoteMetadataResolver;
use crate::title_normalizer;

/// Tracks resolved per batch before flushing and broadcasting.
const BATCH_SIZE: usize = 3;
/// Pause between network batches, on top of the per-request limiter.
const INTER_BATCH_DELAY: Duration = Duration::from_millis(200);

/// Embedded tag lookup seam.
pub trait TagSource {
    fn read_tags(&self, path: &Path) -> Option<ExtractedTags>;
}

/// Reads tags straight from the audio file.
pub struct FileTagSource;

impl TagSource for FileTagSource {
    fn read_tags(&self, path: &Path) -> Option<ExtractedTags> {
        local_tags::extract(path)
    }
}

/// Remote lookup seam.
pub trait MetadataSource {
    fn resolve(&self, title: &str, artist: &str) -> Option<MetadataResult>;
    fn resolve_by_title_only(&self, title: &str) -> Option<MetadataResult>;
}

impl MetadataSource for RemoteMetadataResolver {
    fn resolve(&self, title: &str, artist: &str) -> Option<MetadataResult> {
        RemoteMetadataResolver::resolve(self, title, artist)
    }

    fn resolve_by_title_only(&self, title: &str) -> Option<MetadataResult> {
        RemoteMetadataResolver::resolve_by_title_only(self, title)
    }
}

/// Artwork persistence seam.
pub trait ArtworkSink {
    fn store_embedded(&self, bytes: &[u8], track_id: &str) -> Option<String>;
    fn store_remote(&self, url: &str, track_id: &str) -> Option<String>;
}

/// Materializes artwork into the local store, downloading through the
/// shared rate-limited fetcher.
pub struct FetchingArtworkSink {
    store: Option<ArtworkStore>,
    fetcher: RateLimitedFetcher,
}

impl FetchingArtworkSink {
    pub fn new(store: Option<ArtworkStore>, fetcher: RateLimitedFetcher) -> Self {
        Self { store, fetcher }
    }
}

impl ArtworkSink for FetchingArtworkSink {
    fn store_embedded(&self, bytes: &[u8], track_id: &str) -> Option<String> {
        self.store
            .as_ref()
            .and_then(|store| store.materialize_embedded(bytes, track_id))
    }

    fn store_remote(&self, url: &str, track_id: &str) -> Option<String> {
        self.store
            .as_ref()
            .and_then(|store| store.materialize_remote(&self.fetcher, url, track_id))
    }
}

/// Outcome counts for one enrichment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub resolved: usize,
    pub failed: usize,
}

/// The enrichment pipeline itself, independent of the bus so it can be
/// driven directly with substituted sources.
pub struct EnrichmentPipeline<T: TagSource, M: MetadataSource, A: ArtworkSink> {
    cache: MetadataCache,
    tags: T,
    resolver: M,
    artwork: A,
    inter_batch_delay: Duration,
    run_in_flight: Arc<AtomicBool>,
}

impl<T: TagSource, M: MetadataSource, A: ArtworkSink> EnrichmentPipeline<T, M, A> {
    pub fn new(cache: MetadataCache, tags: T, resolver: M, artwork: A) -> Self {
        Self {
            cache,
            tags,
            resolver,
            artwork,
            inter_batch_delay: INTER_BATCH_DELAY,
            run_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs enrichment over the given tracks, invoking `on_batch` with
    /// each batch of updated tracks as it completes.
    ///
    /// At most one run is in flight at a time; a request arriving while
    /// one runs is dropped and returns `None`. On completion every input
    /// track has been emitted with `metadata_fetched` set.
    pub fn enrich<F>(&mut self, tracks: Vec<Track>, mut on_batch: F) -> Option<RunSummary>
    where
        F: FnMut(Vec<Track>),
    {
        if self.run_in_flight.swap(true, Ordering::SeqCst) {
            info!("Enrichment: run already in flight; ignoring request");
            return None;
        }
        let summary = self.enrich_all(tracks, &mut on_batch);
        self.run_in_flight.store(false, Ordering::SeqCst);
        Some(summary)
    }

    fn enrich_all<F>(&mut self, tracks: Vec<Track>, on_batch: &mut F) -> RunSummary
    where
        F: FnMut(Vec<Track>),
    {
        let mut resolved = 0;
        let mut failed = 0;

        // Cache partition: tracks already final or answerable from the
        // cache never touch the network.
        let mut cached_updates = Vec::new();
        let mut pending = Vec::new();
        for track in tracks {
            if track.metadata_fetched {
                continue;
            }
            match self.cache.get(&track.id) {
                Some(entry) => {
                    if entry.not_found {
                        failed += 1;
                    } else {
                        resolved += 1;
                    }
                    cached_updates.push(apply_cached(&track, entry));
                }
                None => pending.push(track),
            }
        }

        if !cached_updates.is_empty() {
            debug!(
                "Enrichment: {} track(s) answered from cache",
                cached_updates.len()
            );
            on_batch(cached_updates);
        }

        let batch_count = pending.len().div_ceil(BATCH_SIZE.max(1));
        for (batch_index, batch) in pending.chunks(BATCH_SIZE).enumerate() {
            let mut updates = Vec::with_capacity(batch.len());
            for track in batch {
                let (update, entry) = self.process_track(track);
                if entry.not_found {
                    failed += 1;
                } else {
                    resolved += 1;
                }
                self.cache.put(&track.id, entry);
                updates.push(update);
            }

            if let Err(err) = self.cache.flush() {
                warn!("Enrichment: cache flush failed: {err}");
            }
            on_batch(updates);

            if batch_index + 1 < batch_count && !self.inter_batch_delay.is_zero() {
                std::thread::sleep(self.inter_batch_delay);
            }
        }

        info!("Enrichment: run complete ({resolved} resolved, {failed} failed)");
        RunSummary { resolved, failed }
    }

    /// Resolves one track from scratch. Never fails: a track nothing
    /// could be learned about still comes back normalized, quality-
    /// defaulted, and marked final.
    fn process_track(&mut self, track: &Track) -> (Track, CacheEntry) {
        let mut working = track.clone();
        working.title = title_normalizer::normalize(raw_title_source(track));

        let tags = if working.uri.is_empty() {
            None
        } else {
            self.tags.read_tags(Path::new(&working.uri))
        };
        if let Some(tag_title) = tags.as_ref().and_then(|tags| tags.title.as_deref()) {
            working.title = title_normalizer::normalize(tag_title);
        }

        let artist_hint = tags
            .as_ref()
            .and_then(|tags| tags.artist.clone())
            .unwrap_or_else(|| working.artist.clone());

        // Embedded art is authoritative for this file, and a file that
        // yields it is considered locally resolved: the remote database
        // is only consulted when no local art materialized.
        let local_art = tags
            .as_ref()
            .and_then(|tags| tags.embedded_art.as_deref())
            .and_then(|bytes| self.artwork.store_embedded(bytes, &working.id));

        let remote = if local_art.is_some() {
            None
        } else {
            self.resolver
                .resolve(&working.title, &artist_hint)
                .or_else(|| self.resolver.resolve_by_title_only(&working.title))
        };

        let cover_art = local_art.or_else(|| {
            remote
                .as_ref()
                .and_then(|result| result.cover_art.as_deref())
                .and_then(|url| self.artwork.store_remote(url, &working.id))
        });

        let entry = if tags.is_none() && remote.is_none() {
            CacheEntry::not_found()
        } else {
            let quality = quality_estimator::estimate(
                &working.format,
                working.duration_secs,
                working.file_size_bytes,
            );
            // The file's own tags outrank search results; remote values
            // only fill the fields the tags left empty.
            CacheEntry {
                title: tags
                    .as_ref()
                    .and_then(|tags| tags.title.clone())
                    .or_else(|| {
                        remote
                            .as_ref()
                            .map(|result| result.title.clone())
                            .filter(|title| !title.trim().is_empty())
                    }),
                artist: tags
                    .as_ref()
                    .and_then(|tags| tags.artist.clone())
                    .or_else(|| {
                        remote
                            .as_ref()
                            .map(|result| result.artist.clone())
                            .filter(|artist| usable_artist(artist))
                    }),
                album: tags
                    .as_ref()
                    .and_then(|tags| tags.album.clone())
                    .or_else(|| remote.as_ref().and_then(|result| result.album.clone())),
                year: tags
                    .as_ref()
                    .and_then(|tags| tags.year.clone())
                    .or_else(|| remote.as_ref().and_then(|result| result.year.clone())),
                cover_art,
                bitrate_kbps: Some(quality.bitrate_kbps),
                sample_rate_hz: Some(quality.sample_rate_hz),
                channels: Some(quality.channels),
                bit_depth: Some(quality.bit_depth),
                not_found: false,
            }
        };

        (merge_metadata(&working, &entry), entry)
    }
}

/// Raw text the normalized title is derived from: the filename stem
/// carries separators the scan-time title rewrite already collapsed,
/// so it is the better signal when present.
fn raw_title_source(track: &Track) -> &str {
    let stem = track
        .filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(&track.filename);
    if stem.trim().is_empty() {
        &track.title
    } else {
        stem
    }
}

/// Hydrates a track from a previously persisted cache entry.
fn apply_cached(track: &Track, entry: &CacheEntry) -> Track {
    let mut working = track.clone();
    working.title = title_normalizer::normalize(raw_title_source(track));
    merge_metadata(&working, entry)
}

fn usable_artist(artist: &str) -> bool {
    let trimmed = artist.trim();
    !trimmed.is_empty() && trimmed != UNKNOWN_ARTIST
}

/// Merges learned metadata into a track.
///
/// Pure precedence rule per field: learned non-null, then the existing
/// value, then (for the quality quadruple only) the estimator default.
/// The quadruple moves as a unit. The result is always final:
/// `metadata_fetched` is set regardless of what was learned.
pub fn merge_metadata(track: &Track, entry: &CacheEntry) -> Track {
    let mut merged = track.clone();

    if let Some(title) = entry.title.as_deref() {
        if !title.trim().is_empty() {
            merged.title = title.trim().to_string();
        }
    }
    if let Some(artist) = entry.artist.as_deref() {
        if usable_artist(artist) {
            merged.artist = artist.trim().to_string();
        }
    }
    if let Some(album) = entry.album.as_deref() {
        let trimmed = album.trim();
        if !trimmed.is_empty() && trimmed != UNKNOWN_ALBUM {
            merged.album = trimmed.to_string();
        }
    }
    if entry.cover_art.is_some() {
        merged.artwork = entry.cover_art.clone();
    }

    if entry.bitrate_kbps.is_some() {
        merged.bitrate_kbps = entry.bitrate_kbps;
        merged.sample_rate_hz = entry.sample_rate_hz;
        merged.channels = entry.channels;
        merged.bit_depth = entry.bit_depth;
    } else if merged.bitrate_kbps.is_none() {
        let quality = quality_estimator::estimate(
            &merged.format,
            merged.duration_secs,
            merged.file_size_bytes,
        );
        merged.bitrate_kbps = Some(quality.bitrate_kbps);
        merged.sample_rate_hz = Some(quality.sample_rate_hz);
        merged.channels = Some(quality.channels);
        merged.bit_depth = Some(quality.bit_depth);
    }

    merged.metadata_fetched = true;
    merged
}

/// Bus-bound service wrapping the pipeline with production sources.
pub struct EnrichmentManager {
    bus_consumer: broadcast::Receiver<Message>,
    bus_producer: broadcast::Sender<Message>,
}

impl EnrichmentManager {
    pub fn new(
        bus_consumer: broadcast::Receiver<Message>,
        bus_producer: broadcast::Sender<Message>,
    ) -> Self {
        Self {
            bus_consumer,
            bus_producer,
        }
    }

    /// Blocking service loop; runs on a dedicated thread.
    pub fn run(&mut self) {
        let cache = match MetadataCache::new() {
            Ok(cache) => cache,
            Err(err) => {
                error!("Enrichment: failed to open metadata cache: {err}");
                return;
            }
        };

        let limiter = Arc::new(RateLimiter::new());
        let fetcher = RateLimitedFetcher::new(limiter);
        let artwork_store = ArtworkStore::new();
        if artwork_store.is_none() {
            warn!("Enrichment: no cache directory available; artwork disabled");
        }

        let mut pipeline = EnrichmentPipeline::new(
            cache,
            FileTagSource,
            RemoteMetadataResolver::new(fetcher.clone()),
            FetchingArtworkSink::new(artwork_store, fetcher),
        );

        loop {
            let message = match self.bus_consumer.blocking_recv() {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Enrichment: bus lagged, skipped {skipped} message(s)");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            if let Message::Enrichment(EnrichmentMessage::EnrichTracks(tracks)) = message {
                info!("Enrichment: starting run over {} track(s)", tracks.len());
                let producer = self.bus_producer.clone();
                let summary = pipeline.enrich(tracks, |batch| {
                    let _ = producer.send(Message::Enrichment(EnrichmentMessage::TracksEnriched(
                        batch,
                    )));
                });
                if let Some(summary) = summary {
                    let _ = self.bus_producer.send(Message::Enrichment(
                        EnrichmentMessage::EnrichmentCompleted {
                            resolved: summary.resolved,
                            failed: summary.failed,
                        },
                    ));
                }
            }
        }
    }
}
