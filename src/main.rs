mod artwork_store;
mod config;
mod demo_library;
mod enrichment_manager;
mod library_index;
mod local_tags;
mod media_file_discovery;
mod metadata_cache;
mod playback_manager;
mod protocol;
mod quality_estimator;
mod rate_limiter;
mod remote_resolver;
mod title_normalizer;

use std::thread;

use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use config::Config;
use enrichment_manager::EnrichmentManager;
use library_index::LibraryIndex;
use playback_manager::{NullAudioEngine, PlaybackQueueController};
use protocol::{EnrichmentMessage, LibraryMessage, Message, PlaybackMessage, Track};

const BUS_CAPACITY: usize = 256;

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

/// Scans the configured folders, falling back to the demo library when
/// nothing is found, and announces the result on the bus.
fn scan_library(config: &Config, bus_sender: &broadcast::Sender<Message>) -> Vec<Track> {
    let _ = bus_sender.send(Message::Library(LibraryMessage::ScanStarted));

    let tracks = media_file_discovery::scan_folders(&config.library.folders);
    if tracks.is_empty() {
        if config.library.demo_fallback {
            warn!(
                "Library: no audio found in {} configured folder(s); installing demo tracks",
                config.library.folders.len()
            );
            let _ = bus_sender.send(Message::Library(LibraryMessage::ScanUnavailable {
                folders: config.library.folders.clone(),
            }));
            let demo = demo_library::demo_tracks();
            let _ = bus_sender.send(Message::Library(LibraryMessage::ScanCompleted {
                tracks: demo.clone(),
            }));
            return demo;
        }
        let _ = bus_sender.send(Message::Library(LibraryMessage::ScanFailed(
            "no audio files found".to_string(),
        )));
        return Vec::new();
    }

    info!("Library: scan found {} track(s)", tracks.len());
    let _ = bus_sender.send(Message::Library(LibraryMessage::ScanCompleted {
        tracks: tracks.clone(),
    }));
    tracks
}

/// Replaces canonical tracks with their enriched snapshots, by id.
fn apply_enriched(tracks: &mut [Track], updates: Vec<Track>) {
    for update in updates {
        if let Some(existing) = tracks.iter_mut().find(|track| track.id == update.id) {
            *existing = update;
        }
    }
}

fn request_enrichment(config: &Config, bus_sender: &broadcast::Sender<Message>, tracks: &[Track]) {
    if !config.enrichment.online_metadata_enabled {
        info!("Enrichment: online metadata disabled in config; skipping");
        return;
    }
    let pending: Vec<Track> = tracks
        .iter()
        .filter(|track| !track.metadata_fetched)
        .cloned()
        .collect();
    if pending.is_empty() {
        debug!("Enrichment: nothing to enrich");
        return;
    }
    let _ = bus_sender.send(Message::Enrichment(EnrichmentMessage::EnrichTracks(
        pending,
    )));
}

fn main() {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        error!(
            "Panic in thread '{}': {}",
            thread_name,
            panic_payload_to_string(panic_info.payload())
        );
    }));

    let config = match config::load_or_create() {
        Ok(config) => config,
        Err(err) => {
            error!("Config: {err}; using defaults");
            Config::default()
        }
    };

    let (bus_sender, _) = broadcast::channel::<Message>(BUS_CAPACITY);

    // Setup enrichment manager
    let enrichment_bus_receiver = bus_sender.subscribe();
    let enrichment_bus_sender = bus_sender.clone();
    thread::spawn(move || {
        let mut enrichment_manager =
            EnrichmentManager::new(enrichment_bus_receiver, enrichment_bus_sender);
        enrichment_manager.run();
    });

    // The coordinator subscribes before any message is produced so the
    // scan announcements are not lost.
    let mut bus_receiver = bus_sender.subscribe();

    let mut tracks = scan_library(&config, &bus_sender);
    let mut index = LibraryIndex::from_tracks(&tracks);
    info!(
        "Library: {} track(s), {} album(s), {} artist(s)",
        tracks.len(),
        index.albums.len(),
        index.artists.len()
    );

    let mut controller = PlaybackQueueController::new(NullAudioEngine);
    controller.restore_preferences(config.playback.shuffle, config.playback.repeat_mode);
    controller.set_tracks(tracks.clone());

    request_enrichment(&config, &bus_sender, &tracks);

    loop {
        let message = match bus_receiver.blocking_recv() {
            Ok(message) => message,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Coordinator: bus lagged, skipped {skipped} message(s)");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match message {
            Message::Library(LibraryMessage::RequestScan) => {
                tracks = scan_library(&config, &bus_sender);
                index = LibraryIndex::from_tracks(&tracks);
                info!(
                    "Library: rescan complete ({} track(s), {} album(s))",
                    tracks.len(),
                    index.albums.len()
                );
                controller.set_tracks(tracks.clone());
                request_enrichment(&config, &bus_sender, &tracks);
            }
            Message::Enrichment(EnrichmentMessage::TracksEnriched(updates)) => {
                debug!("Coordinator: merging {} enriched track(s)", updates.len());
                apply_enriched(&mut tracks, updates);
                index = LibraryIndex::from_tracks(&tracks);
                debug!(
                    "Library: views rebuilt ({} album(s), {} artist(s))",
                    index.albums.len(),
                    index.artists.len()
                );
                controller.set_tracks(tracks.clone());
            }
            Message::Enrichment(EnrichmentMessage::EnrichmentCompleted { resolved, failed }) => {
                info!("Coordinator: enrichment finished ({resolved} resolved, {failed} failed)");
            }
            Message::Playback(playback) => match playback {
                PlaybackMessage::PlayTrackById(track_id) => controller.play_by_id(&track_id),
                PlaybackMessage::PlayAlbumById(album_id) => {
                    match index.album_by_id(&album_id) {
                        Some(album) => controller.play_album(album),
                        None => debug!("Coordinator: unknown album id {album_id}"),
                    }
                }
                PlaybackMessage::TogglePlayPause => controller.toggle_play_pause(),
                PlaybackMessage::SkipNext => controller.skip_next(),
                PlaybackMessage::SkipPrevious => controller.skip_previous(),
                PlaybackMessage::Seek(position_secs) => controller.seek_to(position_secs),
                PlaybackMessage::TrackFinished => controller.on_track_finished(),
                PlaybackMessage::ToggleShuffle => {
                    controller.toggle_shuffle();
                    persist_playback_preferences(&config, &controller);
                }
                PlaybackMessage::ToggleRepeat => {
                    controller.toggle_repeat();
                    persist_playback_preferences(&config, &controller);
                }
                PlaybackMessage::PlaybackProgress { position_secs, .. } => {
                    controller.on_progress(position_secs);
                }
            },
            _ => {}
        }
    }
}

fn persist_playback_preferences(
    config: &Config,
    controller: &PlaybackQueueController<NullAudioEngine>,
) {
    let mut updated = config.clone();
    updated.playback.shuffle = controller.shuffle();
    updated.playback.repeat_mode = controller.repeat_mode();
    if let Err(err) = config::save(&updated) {
        warn!("Config: failed to persist playback preferences: {err}");
    }
}
