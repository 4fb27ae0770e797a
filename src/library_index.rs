//! Derived album/artist aggregate views.
//!
//! Albums and artists have no storage of their own; they are recomputed
//! deterministically from the flat track collection whenever it changes.

use std::collections::HashMap;

use crate::protocol::Track;

/// Separator for the (album, artist) composite key.
const ALBUM_KEY_SEPARATOR: char = '\u{001f}';

/// One album aggregate: keyed by (name, artist), tracks in discovery
/// order, artwork taken from the first track that has any.
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub artwork: Option<String>,
    pub tracks: Vec<Track>,
}

/// One artist aggregate with albums deduped by album id.
#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub name: String,
    pub artwork: Option<String>,
    pub albums: Vec<Album>,
    pub track_count: usize,
}

/// Derived views over the current track collection.
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
}

impl LibraryIndex {
    /// Recomputes both aggregate views from scratch.
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let albums = build_albums(tracks);
        let artists = build_artists(tracks, &albums);
        Self { albums, artists }
    }

    pub fn album_by_id(&self, album_id: &str) -> Option<&Album> {
        self.albums.iter().find(|album| album.id == album_id)
    }
}

fn album_key(album: &str, artist: &str) -> String {
    format!("{album}{ALBUM_KEY_SEPARATOR}{artist}")
}

fn build_albums(tracks: &[Track]) -> Vec<Album> {
    let mut albums: Vec<Album> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for track in tracks {
        let key = album_key(&track.album, &track.artist);
        let index = match index_by_key.get(&key) {
            Some(index) => *index,
            None => {
                albums.push(Album {
                    id: key.clone(),
                    name: track.album.clone(),
                    artist: track.artist.clone(),
                    artwork: None,
                    tracks: Vec::new(),
                });
                index_by_key.insert(key, albums.len() - 1);
                albums.len() - 1
            }
        };

        let album = &mut albums[index];
        if album.artwork.is_none() {
            album.artwork = track.artwork.clone();
        }
        album.tracks.push(track.clone());
    }

    albums
}

fn build_artists(tracks: &[Track], albums: &[Album]) -> Vec<Artist> {
    let mut artists: Vec<Artist> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for track in tracks {
        let index = match index_by_name.get(&track.artist) {
            Some(index) => *index,
            None => {
                artists.push(Artist {
                    name: track.artist.clone(),
                    artwork: track.artwork.clone(),
                    albums: Vec::new(),
                    track_count: 0,
                });
                index_by_name.insert(track.artist.clone(), artists.len() - 1);
                artists.len() - 1
            }
        };
        artists[index].track_count += 1;
    }

    for album in albums {
        let Some(index) = index_by_name.get(&album.artist) else {
            continue;
        };
        let artist = &mut artists[*index];
        if artist.albums.iter().any(|existing| existing.id == album.id) {
            continue;
        }
        if artist.artwork.is_none() {
            artist.artwork = album.artwork.clone();
        }
        artist.albums.push(album.clone());
    }

    artists
}
