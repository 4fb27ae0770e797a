//! Persistent resolved-metadata cache backed by SQLite.
//!
//! One row per track id, loaded fully at pipeline start and flushed
//! after each processed batch. Absence of a key means "never tried";
//! a row with the `_notFound` sentinel means "tried, gave up — do not
//! retry this epoch". The table name carries the cache version, so a
//! resolution-logic change invalidates prior entries by bumping
//! `CACHE_TABLE` instead of migrating rows.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::warn;
use rusqlite::{params, Connection};

/// Versioned cache namespace. Bump the suffix to start a new epoch.
const CACHE_TABLE: &str = "track_metadata_v2";

/// Metadata fragment learned for one track, persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    /// Local artwork file reference.
    #[serde(default)]
    pub cover_art: Option<String>,
    #[serde(default)]
    pub bitrate_kbps: Option<u32>,
    #[serde(default)]
    pub sample_rate_hz: Option<u32>,
    #[serde(default)]
    pub channels: Option<u16>,
    #[serde(default)]
    pub bit_depth: Option<u16>,
    /// Resolution was attempted and definitively failed.
    #[serde(default, rename = "_notFound")]
    pub not_found: bool,
}

impl CacheEntry {
    /// Negative-result sentinel: tried everything, learned nothing.
    pub fn not_found() -> Self {
        Self {
            not_found: true,
            ..Self::default()
        }
    }
}

/// Process-wide persistent mapping from track id to [`CacheEntry`].
pub struct MetadataCache {
    conn: Connection,
    entries: HashMap<String, CacheEntry>,
    dirty: HashSet<String>,
}

impl MetadataCache {
    /// Opens the cache at the default per-user data location.
    pub fn new() -> Result<Self, rusqlite::Error> {
        let data_dir = dirs::data_dir()
            .expect("Could not find data directory")
            .join("resona");

        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).expect("Could not create data directory");
        }

        Self::open_at(&data_dir.join("metadata_cache.db"))
    }

    /// Opens the cache at an explicit path and loads all entries.
    pub fn open_at(db_path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(db_path)?;
        let mut cache = Self {
            conn,
            entries: HashMap::new(),
            dirty: HashSet::new(),
        };
        cache.initialize_schema()?;
        cache.load_entries()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {CACHE_TABLE} (
                    track_id TEXT PRIMARY KEY,
                    payload TEXT NOT NULL
                )"
            ),
            [],
        )?;
        Ok(())
    }

    fn load_entries(&mut self) -> Result<(), rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT track_id, payload FROM {CACHE_TABLE}"))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (track_id, payload) = row?;
            match serde_json::from_str::<CacheEntry>(&payload) {
                Ok(entry) => {
                    self.entries.insert(track_id, entry);
                }
                Err(err) => {
                    // An unreadable row behaves like a miss; it will be
                    // re-resolved and overwritten.
                    warn!("Cache: discarding unreadable entry for {track_id}: {err}");
                }
            }
        }
        Ok(())
    }

    /// Returns the cached entry for a track id, if one exists.
    /// `None` and `Some(entry with not_found)` are distinct outcomes.
    pub fn get(&self, track_id: &str) -> Option<&CacheEntry> {
        self.entries.get(track_id)
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.entries.contains_key(track_id)
    }

    /// Stages an entry for the next flush.
    pub fn put(&mut self, track_id: &str, entry: CacheEntry) {
        self.entries.insert(track_id.to_string(), entry);
        self.dirty.insert(track_id.to_string());
    }

    /// Persists all staged entries in a single transaction.
    pub fn flush(&mut self) -> Result<(), rusqlite::Error> {
        if self.dirty.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {CACHE_TABLE} (track_id, payload) VALUES (?1, ?2)"
            ))?;
            for track_id in &self.dirty {
                let Some(entry) = self.entries.get(track_id) else {
                    continue;
                };
                let payload = match serde_json::to_string(entry) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!("Cache: failed to serialize entry for {track_id}: {err}");
                        continue;
                    }
                };
                stmt.execute(params![track_id, payload])?;
            }
        }
        tx.commit()?;
        self.dirty.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
