//! Playback queue control: play/pause state, shuffle and repeat
//! policy, and next/previous selection.
//!
//! Actual audio I/O is delegated to an [`AudioEngine`] implementation;
//! this controller only decides which track plays and when. The queue
//! is either an explicit subset (album/playlist) swapped in wholesale,
//! or, when empty, the full track list.

use log::{debug, error};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::library_index::Album;
use crate::protocol::{RepeatMode, Track};

/// External playback collaborator. Implementations own the audio
/// resource lifecycle; `load_and_play` must release any prior resource.
pub trait AudioEngine {
    fn load_and_play(&mut self, uri: &str) -> Result<(), String>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position_secs: f64);
}

/// Engine used when no audio backend is wired in; playback state still
/// advances so the queue logic stays exercisable headless.
#[derive(Debug, Default)]
pub struct NullAudioEngine;

impl AudioEngine for NullAudioEngine {
    fn load_and_play(&mut self, uri: &str) -> Result<(), String> {
        debug!("NullAudioEngine: load_and_play {uri}");
        Ok(())
    }

    fn pause(&mut self) {}
    fn resume(&mut self) {}
    fn stop(&mut self) {}
    fn seek(&mut self, _position_secs: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
}

/// Position threshold below which "previous" moves to the prior track
/// instead of restarting the current one.
const RESTART_THRESHOLD_SECS: f64 = 3.0;

pub struct PlaybackQueueController<E: AudioEngine> {
    engine: E,
    tracks: Vec<Track>,
    queue: Vec<Track>,
    current: Option<Track>,
    state: PlayerState,
    position_secs: f64,
    duration_secs: f64,
    shuffle: bool,
    repeat_mode: RepeatMode,
    rng_seed: [u8; 32],
}

impl<E: AudioEngine> PlaybackQueueController<E> {
    pub fn new(engine: E) -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill(&mut seed);
        Self::with_seed(engine, seed)
    }

    /// Deterministic constructor for shuffle tests.
    pub fn with_seed(engine: E, rng_seed: [u8; 32]) -> Self {
        Self {
            engine,
            tracks: Vec::new(),
            queue: Vec::new(),
            current: None,
            state: PlayerState::Idle,
            position_secs: 0.0,
            duration_secs: 0.0,
            shuffle: false,
            repeat_mode: RepeatMode::Off,
            rng_seed,
        }
    }

    /// Replaces the full track list. The explicit queue is left alone;
    /// it was captured wholesale and owns its own contents.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    /// Loads and starts a track, releasing the prior audio resource
    /// first. Duration comes from the track's authoritative scan value.
    pub fn play(&mut self, track: Track) {
        self.engine.stop();
        self.position_secs = 0.0;
        self.duration_secs = track.duration_secs;

        // Synthetic demo tracks have no audio resource to load.
        if track.uri.is_empty() {
            self.current = Some(track);
            self.state = PlayerState::Playing;
            return;
        }

        match self.engine.load_and_play(&track.uri) {
            Ok(()) => {
                self.current = Some(track);
                self.state = PlayerState::Playing;
            }
            Err(err) => {
                // Logged and left stalled; no auto-advance on failure.
                error!("Playback: failed to play {}: {}", track.uri, err);
                self.current = Some(track);
                self.state = PlayerState::Idle;
            }
        }
    }

    pub fn play_by_id(&mut self, track_id: &str) {
        let found = self
            .selection_list()
            .iter()
            .chain(self.tracks.iter())
            .find(|track| track.id == track_id)
            .cloned();
        if let Some(track) = found {
            self.play(track);
        } else {
            debug!("Playback: unknown track id {track_id}");
        }
    }

    pub fn toggle_play_pause(&mut self) {
        match self.state {
            PlayerState::Playing => {
                self.engine.pause();
                self.state = PlayerState::Paused;
            }
            PlayerState::Paused => {
                self.engine.resume();
                self.state = PlayerState::Playing;
            }
            PlayerState::Idle => {}
        }
    }

    pub fn seek_to(&mut self, position_secs: f64) {
        self.position_secs = position_secs;
        if self
            .current
            .as_ref()
            .is_some_and(|track| !track.uri.is_empty())
        {
            self.engine.seek(position_secs);
        }
    }

    /// Progress report from the engine integration.
    pub fn on_progress(&mut self, position_secs: f64) {
        self.position_secs = position_secs;
    }

    /// Manual skip. Past the end with repeat off this is a strict
    /// no-op: the current track keeps playing.
    pub fn skip_next(&mut self) {
        if let Some(next) = self.select_next() {
            self.play(next);
        }
    }

    /// Natural end of the current track. Same selection logic as a
    /// manual skip, but with nothing to advance to the controller goes
    /// idle because the audio resource is already exhausted.
    pub fn on_track_finished(&mut self) {
        match self.select_next() {
            Some(next) => self.play(next),
            None => {
                self.state = PlayerState::Idle;
                self.position_secs = 0.0;
            }
        }
    }

    pub fn skip_previous(&mut self) {
        if self.position_secs > RESTART_THRESHOLD_SECS {
            self.seek_to(0.0);
            return;
        }

        let list = self.selection_list().to_vec();
        if list.is_empty() {
            return;
        }
        let current_index = self.current_index_in(&list).unwrap_or(0);
        let previous = if current_index == 0 {
            if self.repeat_mode == RepeatMode::All {
                list.len() - 1
            } else {
                0
            }
        } else {
            current_index - 1
        };
        self.play(list[previous].clone());
    }

    pub fn toggle_shuffle(&mut self) {
        self.shuffle = !self.shuffle;
    }

    pub fn toggle_repeat(&mut self) {
        self.repeat_mode = self.repeat_mode.cycled();
    }

    /// Restores persisted preferences at startup.
    pub fn restore_preferences(&mut self, shuffle: bool, repeat_mode: RepeatMode) {
        self.shuffle = shuffle;
        self.repeat_mode = repeat_mode;
    }

    /// Swaps in an album as the explicit queue and starts its first
    /// track. The queue is replaced wholesale, never edited in place.
    pub fn play_album(&mut self, album: &Album) {
        self.play_collection(album.tracks.clone());
    }

    pub fn play_collection(&mut self, tracks: Vec<Track>) {
        self.queue = tracks;
        if let Some(first) = self.queue.first().cloned() {
            self.play(first);
        }
    }

    fn selection_list(&self) -> &[Track] {
        if self.queue.is_empty() {
            &self.tracks
        } else {
            &self.queue
        }
    }

    fn current_index_in(&self, list: &[Track]) -> Option<usize> {
        let current = self.current.as_ref()?;
        list.iter().position(|track| track.id == current.id)
    }

    fn select_next(&mut self) -> Option<Track> {
        let list = self.selection_list().to_vec();
        if list.is_empty() {
            return None;
        }

        if self.repeat_mode == RepeatMode::One {
            if let Some(current) = self.current.clone() {
                return Some(current);
            }
        }

        if self.shuffle {
            // Uniformly random, no history exclusion: the same track
            // may repeat back to back.
            let index = self.next_random_index(list.len());
            return Some(list[index].clone());
        }

        let next_index = match self.current_index_in(&list) {
            Some(index) => index + 1,
            None => 0,
        };
        if next_index >= list.len() {
            if self.repeat_mode == RepeatMode::All {
                return Some(list[0].clone());
            }
            return None;
        }
        Some(list[next_index].clone())
    }

    fn next_random_index(&mut self, len: usize) -> usize {
        let mut rng = StdRng::from_seed(self.rng_seed);
        let index = rng.gen_range(0..len);

        // Advance the seed so consecutive picks differ.
        let mut new_seed = [0u8; 32];
        for (i, value) in new_seed.iter_mut().enumerate() {
            *value = self.rng_seed[i].wrapping_add(1);
        }
        self.rng_seed = new_seed;

        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RepeatMode, Track};

    #[derive(Debug, Default)]
    struct RecordingEngine {
        events: Vec<String>,
    }

    impl AudioEngine for RecordingEngine {
        fn load_and_play(&mut self, uri: &str) -> Result<(), String> {
            if uri == "fail://" {
                return Err("unreachable".to_string());
            }
            self.events.push(format!("play {uri}"));
            Ok(())
        }

        fn pause(&mut self) {
            self.events.push("pause".to_string());
        }

        fn resume(&mut self) {
            self.events.push("resume".to_string());
        }

        fn stop(&mut self) {
            self.events.push("stop".to_string());
        }

        fn seek(&mut self, position_secs: f64) {
            self.events.push(format!("seek {position_secs}"));
        }
    }

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            uri: format!("file:///music/{id}.mp3"),
            title: id.to_uppercase(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            duration_secs: 180.0,
            artwork: None,
            bitrate_kbps: None,
            sample_rate_hz: None,
            channels: None,
            bit_depth: None,
            file_size_bytes: None,
            filename: format!("{id}.mp3"),
            format: "MP3".to_string(),
            metadata_fetched: true,
        }
    }

    fn controller_with(tracks: Vec<Track>) -> PlaybackQueueController<RecordingEngine> {
        let mut controller =
            PlaybackQueueController::with_seed(RecordingEngine::default(), [7u8; 32]);
        controller.set_tracks(tracks);
        controller
    }

    fn current_id<E: AudioEngine>(controller: &PlaybackQueueController<E>) -> String {
        controller.current_track().unwrap().id.clone()
    }

    #[test]
    fn test_play_sets_state_and_duration() {
        let mut controller = controller_with(vec![track("a")]);
        controller.play(track("a"));
        assert_eq!(controller.state(), PlayerState::Playing);
        assert_eq!(controller.duration_secs(), 180.0);
        assert_eq!(controller.position_secs(), 0.0);
    }

    #[test]
    fn test_skip_next_wraps_with_repeat_all() {
        let mut controller = controller_with(vec![track("a"), track("b"), track("c")]);
        controller.toggle_repeat(); // off -> all
        controller.play(track("c"));
        controller.skip_next();
        assert_eq!(current_id(&controller), "a");
    }

    #[test]
    fn test_skip_next_at_end_with_repeat_off_is_noop() {
        let mut controller = controller_with(vec![track("a"), track("b"), track("c")]);
        controller.play(track("c"));
        controller.skip_next();
        assert_eq!(current_id(&controller), "c");
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[test]
    fn test_repeat_one_replays_current() {
        let mut controller = controller_with(vec![track("a"), track("b")]);
        controller.toggle_repeat(); // all
        controller.toggle_repeat(); // one
        assert_eq!(controller.repeat_mode(), RepeatMode::One);
        controller.play(track("b"));
        controller.skip_next();
        assert_eq!(current_id(&controller), "b");
    }

    #[test]
    fn test_shuffle_picks_index_within_list() {
        let mut controller = controller_with(vec![track("a"), track("b"), track("c")]);
        controller.toggle_shuffle();
        controller.play(track("a"));
        for _ in 0..10 {
            controller.skip_next();
            let id = current_id(&controller);
            assert!(["a", "b", "c"].contains(&id.as_str()));
        }
    }

    #[test]
    fn test_skip_previous_restarts_after_threshold() {
        let mut controller = controller_with(vec![track("a"), track("b")]);
        controller.play(track("b"));
        controller.on_progress(10.0);
        controller.skip_previous();
        // Restarted, not moved back.
        assert_eq!(current_id(&controller), "b");
        assert_eq!(controller.position_secs(), 0.0);
    }

    #[test]
    fn test_skip_previous_moves_back_before_threshold() {
        let mut controller = controller_with(vec![track("a"), track("b")]);
        controller.play(track("b"));
        controller.on_progress(1.0);
        controller.skip_previous();
        assert_eq!(current_id(&controller), "a");
    }

    #[test]
    fn test_skip_previous_clamps_at_start_without_repeat() {
        let mut controller = controller_with(vec![track("a"), track("b")]);
        controller.play(track("a"));
        controller.skip_previous();
        assert_eq!(current_id(&controller), "a");
    }

    #[test]
    fn test_skip_previous_wraps_with_repeat_all() {
        let mut controller = controller_with(vec![track("a"), track("b"), track("c")]);
        controller.toggle_repeat(); // all
        controller.play(track("a"));
        controller.skip_previous();
        assert_eq!(current_id(&controller), "c");
    }

    #[test]
    fn test_explicit_queue_overrides_full_list() {
        let mut controller = controller_with(vec![track("a"), track("b"), track("c")]);
        controller.play_collection(vec![track("b"), track("c")]);
        assert_eq!(current_id(&controller), "b");
        controller.skip_next();
        assert_eq!(current_id(&controller), "c");
        // End of explicit queue, repeat off: stays put.
        controller.skip_next();
        assert_eq!(current_id(&controller), "c");
    }

    #[test]
    fn test_play_album_swaps_in_album_queue() {
        let mut controller = controller_with(vec![track("a"), track("b"), track("c")]);
        let album = Album {
            id: "alb-1".to_string(),
            name: "Album".to_string(),
            artist: "Artist".to_string(),
            artwork: None,
            tracks: vec![track("b"), track("c")],
        };
        controller.play_album(&album);
        assert_eq!(current_id(&controller), "b");
        controller.skip_next();
        assert_eq!(current_id(&controller), "c");
    }

    #[test]
    fn test_natural_end_without_successor_goes_idle() {
        let mut controller = controller_with(vec![track("a"), track("b")]);
        controller.play(track("b"));
        controller.on_track_finished();
        assert_eq!(controller.state(), PlayerState::Idle);
        assert_eq!(current_id(&controller), "b");
    }

    #[test]
    fn test_natural_end_advances_like_skip() {
        let mut controller = controller_with(vec![track("a"), track("b")]);
        controller.play(track("a"));
        controller.on_track_finished();
        assert_eq!(current_id(&controller), "b");
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[test]
    fn test_pause_resume_cycle() {
        let mut controller = controller_with(vec![track("a")]);
        controller.play(track("a"));
        controller.toggle_play_pause();
        assert_eq!(controller.state(), PlayerState::Paused);
        controller.toggle_play_pause();
        assert_eq!(controller.state(), PlayerState::Playing);
    }

    #[test]
    fn test_failed_load_is_logged_not_fatal_and_does_not_advance() {
        let mut controller = controller_with(vec![track("a"), track("b")]);
        let mut broken = track("a");
        broken.uri = "fail://".to_string();
        controller.play(broken);
        assert_eq!(controller.state(), PlayerState::Idle);
        assert_eq!(current_id(&controller), "a");
    }

    #[test]
    fn test_demo_track_plays_without_engine() {
        let mut controller = controller_with(Vec::new());
        let mut demo = track("demo");
        demo.uri = String::new();
        controller.play(demo);
        assert_eq!(controller.state(), PlayerState::Playing);
        // Only the release of the prior resource reached the engine.
        assert_eq!(controller.engine.events, vec!["stop".to_string()]);
    }
}
