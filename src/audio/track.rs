use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::OnceLock, time::Duration};

use super::error::ConfigValueError;

/// Pista reproducible, tal como la entrega el servicio de audio.
///
/// La cola nunca inspecciona ni modifica su contenido; solo reordena copias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub uri: String,
    /// Duración en milisegundos. `0` para streams en vivo.
    pub length: u64,
    pub author: Option<String>,
    pub artwork_url: Option<String>,
}

impl Track {
    pub fn new(title: impl Into<String>, uri: impl Into<String>, length: u64) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
            length,
            author: None,
            artwork_url: None,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.length)
    }

    pub fn is_stream(&self) -> bool {
        self.length == 0
    }
}

/// Resultado de resolver un identificador en el servicio de audio.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    Track(Track),
    Playlist { name: String, tracks: Vec<Track> },
    Search(Vec<Track>),
    Empty,
    Error(String),
}

/// Fuente usada cuando el usuario escribe texto libre en vez de una URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SearchType {
    #[default]
    YouTube,
    YouTubeMusic,
    SoundCloud,
}

impl SearchType {
    /// Convierte una consulta en un identificador cargable.
    ///
    /// URLs y consultas que ya traen prefijo (`ytsearch:`, `scsearch:`...) se
    /// devuelven tal cual.
    pub fn identifier_for(&self, query: &str) -> String {
        let query = query.trim();
        if url_pattern().is_match(query) || search_pattern().is_match(query) {
            return query.to_string();
        }

        match self {
            SearchType::YouTube => format!("ytsearch:{}", query),
            SearchType::YouTubeMusic => format!(
                "https://music.youtube.com/search?q={}",
                urlencoding::encode(query)
            ),
            SearchType::SoundCloud => format!("scsearch:{}", query),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::YouTube => "youTube",
            SearchType::YouTubeMusic => "youTubeMusic",
            SearchType::SoundCloud => "soundCloud",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = ConfigValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "youTube" => Ok(SearchType::YouTube),
            "youTubeMusic" => Ok(SearchType::YouTubeMusic),
            "soundCloud" => Ok(SearchType::SoundCloud),
            other => Err(ConfigValueError::SearchType(other.to_string())),
        }
    }
}

impl TryFrom<String> for SearchType {
    type Error = ConfigValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub(crate) fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r"^https?://[-a-zA-Z0-9+&@#/%?=~_|!:,.;]*[-a-zA-Z0-9+&@#/%=~_|]?")
            .expect("valid url regex")
    })
}

fn search_pattern() -> &'static Regex {
    static SEARCH: OnceLock<Regex> = OnceLock::new();
    SEARCH.get_or_init(|| Regex::new(r"^(.{2,3})search\d*:(.+)").expect("valid search regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_queries_get_search_prefix() {
        assert_eq!(
            SearchType::YouTube.identifier_for("never gonna give you up"),
            "ytsearch:never gonna give you up"
        );
        assert_eq!(
            SearchType::SoundCloud.identifier_for("  lofi  "),
            "scsearch:lofi"
        );
        assert_eq!(
            SearchType::YouTubeMusic.identifier_for("daft punk"),
            "https://music.youtube.com/search?q=daft%20punk"
        );
    }

    #[test]
    fn urls_and_prefixed_queries_pass_through() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(SearchType::SoundCloud.identifier_for(url), url);
        assert_eq!(
            SearchType::YouTube.identifier_for("scsearch:ambient"),
            "scsearch:ambient"
        );
        assert_eq!(
            SearchType::SoundCloud.identifier_for("ytsearch5:ambient"),
            "ytsearch5:ambient"
        );
    }

    #[test]
    fn search_type_parse_is_strict() {
        assert_eq!("youTubeMusic".parse::<SearchType>().unwrap(), SearchType::YouTubeMusic);
        assert_eq!(" soundCloud ".parse::<SearchType>().unwrap(), SearchType::SoundCloud);
        assert!("spotify".parse::<SearchType>().is_err());
        assert!("".parse::<SearchType>().is_err());
    }

    #[test]
    fn zero_length_is_a_stream() {
        assert!(Track::new("radio", "https://radio.example/live", 0).is_stream());
        let track = Track::new("song", "https://example.com/s", 185_000);
        assert_eq!(track.duration(), Duration::from_secs(185));
    }
}
