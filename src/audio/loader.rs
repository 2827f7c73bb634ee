use async_process::Command;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{
    error::LoadError,
    track::{url_pattern, LoadResult, Track},
};

const SEARCH_RESULTS: usize = 5;

/// Resuelve identificadores (URL, playlist o búsqueda) usando yt-dlp.
pub struct TrackLoader {
    program: String,
    // Limitar procesos yt-dlp concurrentes
    permits: Semaphore,
    timeout: Duration,
    max_playlist_size: usize,
}

/// Línea JSON emitida por `yt-dlp --dump-json`.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
    webpage_url: Option<String>,
    url: Option<String>,
    is_live: Option<bool>,
    playlist_title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl YtDlpEntry {
    fn into_track(self) -> Option<Track> {
        let uri = self.webpage_url.or(self.url)?;
        let title = self.title.unwrap_or_else(|| uri.clone());
        let length = match (self.is_live, self.duration) {
            (Some(true), _) | (_, None) => 0,
            (_, Some(secs)) => (secs * 1000.0).round() as u64,
        };

        let mut track = Track::new(title, uri, length);
        track.author = self.uploader.or(self.channel);
        track.artwork_url = self
            .thumbnail
            .or_else(|| self.thumbnails.into_iter().last().map(|t| t.url));
        Some(track)
    }
}

/// Tipo de consulta según la forma del identificador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Search,
    Playlist,
    Single,
}

impl TrackLoader {
    pub fn new(timeout: Duration, max_playlist_size: usize) -> Self {
        Self {
            program: "yt-dlp".to_string(),
            permits: Semaphore::new(3),
            timeout,
            max_playlist_size,
        }
    }

    /// Carga un identificador. Los errores de yt-dlp se devuelven como
    /// [`LoadResult::Error`]; solo el timeout se propaga como error.
    pub async fn load(&self, identifier: &str) -> Result<LoadResult, LoadError> {
        match tokio::time::timeout(self.timeout, self.load_inner(identifier)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                warn!("❌ Error cargando {}: {}", identifier, e);
                Ok(LoadResult::Error(e.to_string()))
            }
            Err(_) => Err(LoadError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn load_inner(&self, identifier: &str) -> Result<LoadResult, LoadError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| LoadError::Process(e.to_string()))?;

        let lookup = classify(identifier);
        info!("🔍 Cargando {:?}: {}", lookup, identifier);

        let target = match lookup {
            Lookup::Search => expand_search(identifier, SEARCH_RESULTS),
            _ => identifier.to_string(),
        };

        let playlist_end = self.max_playlist_size.to_string();
        let mut args = vec!["--dump-json", "--skip-download", "--no-warnings"];
        match lookup {
            Lookup::Single => args.push("--no-playlist"),
            Lookup::Playlist => args.extend(["--flat-playlist", "--playlist-end", playlist_end.as_str()]),
            Lookup::Search => args.push("--flat-playlist"),
        }
        args.push(target.as_str());

        // Si vence el timeout el future se descarta y yt-dlp debe morir con él
        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LoadError::Process(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_output(&stdout, lookup))
    }
}

fn classify(identifier: &str) -> Lookup {
    if !url_pattern().is_match(identifier) {
        return Lookup::Search;
    }
    if identifier.contains("/search?") {
        return Lookup::Search;
    }
    if identifier.contains("list=") || identifier.contains("/sets/") || identifier.contains("/playlist") {
        return Lookup::Playlist;
    }
    Lookup::Single
}

/// `ytsearch:foo` → `ytsearch5:foo`. Las URLs de búsqueda se dejan igual.
fn expand_search(identifier: &str, limit: usize) -> String {
    match identifier.split_once("search:") {
        Some((prefix, query)) if !prefix.contains('/') => {
            format!("{}search{}:{}", prefix, limit, query)
        }
        _ => identifier.to_string(),
    }
}

fn parse_output(stdout: &str, lookup: Lookup) -> LoadResult {
    let mut playlist_name = None;
    let mut tracks = Vec::new();

    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<YtDlpEntry>(line) {
            Ok(entry) => {
                if playlist_name.is_none() {
                    playlist_name = entry.playlist_title.clone();
                }
                if let Some(track) = entry.into_track() {
                    tracks.push(track);
                }
            }
            Err(e) => debug!("Línea de yt-dlp ignorada: {}", e),
        }
    }

    if tracks.is_empty() {
        return LoadResult::Empty;
    }

    match lookup {
        Lookup::Search => LoadResult::Search(tracks),
        Lookup::Playlist => LoadResult::Playlist {
            name: playlist_name.unwrap_or_else(|| "Playlist".to_string()),
            tracks,
        },
        Lookup::Single => LoadResult::Track(tracks.remove(0)),
    }
}
