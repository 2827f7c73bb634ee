use regex::Regex;
use scraper::{Html, Node, Selector};
use serde::Deserialize;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

const GENIUS_SEARCH_URL: &str = "https://api.genius.com/search";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum LyricsError {
    #[error("no Genius token configured")]
    NotConfigured,

    #[error("no results for {0:?}")]
    NoResults(String),

    #[error("Genius returned status {0}")]
    Status(u16),

    #[error("could not parse lyrics from page")]
    Unparseable,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Artista y título a buscar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricsQuery {
    pub artist: String,
    pub title: String,
}

impl LyricsQuery {
    /// Desde las opciones del comando. `None` si ambas quedan vacías.
    pub fn from_args(artist: Option<&str>, title: Option<&str>) -> Option<Self> {
        let query = Self {
            artist: clean_query(artist.unwrap_or_default()),
            title: clean_query(title.unwrap_or_default()),
        };
        (!query.is_empty()).then_some(query)
    }

    /// Desde un título tipo "Artista - Canción".
    pub fn from_track_title(full_title: &str) -> Self {
        let mut parts = full_title.split('-');
        match (parts.next(), parts.next()) {
            (Some(artist), Some(title)) => Self {
                artist: clean_query(artist),
                title: clean_query(title),
            },
            _ => Self {
                artist: String::new(),
                title: clean_query(full_title),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artist.is_empty() && self.title.is_empty()
    }

    /// Encabezado del embed de respuesta.
    pub fn header(&self) -> String {
        if self.artist.is_empty() {
            format!("Lyrics: {}", self.title)
        } else {
            format!("Lyrics: {} - {}", self.artist, self.title)
        }
    }

    fn search_terms(&self) -> String {
        format!("{} {}", self.artist, self.title).trim().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct GeniusResponse {
    response: GeniusHits,
}

#[derive(Debug, Deserialize)]
struct GeniusHits {
    #[serde(default)]
    hits: Vec<GeniusHit>,
}

#[derive(Debug, Deserialize)]
struct GeniusHit {
    result: GeniusSong,
}

#[derive(Debug, Deserialize)]
struct GeniusSong {
    url: String,
}

/// Cliente de letras sobre la API de búsqueda de Genius.
pub struct LyricsClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl LyricsClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Busca con artista y título; si falla y había artista, reintenta solo con el título.
    pub async fn find(&self, query: &LyricsQuery) -> Result<String, LyricsError> {
        match self.search(query).await {
            Ok(lyrics) => Ok(lyrics),
            Err(e) if !query.artist.is_empty() => {
                debug!("Reintentando letra solo con el título: {}", e);
                let title_only = LyricsQuery {
                    artist: String::new(),
                    title: query.title.clone(),
                };
                self.search(&title_only).await
            }
            Err(e) => Err(e),
        }
    }

    async fn search(&self, query: &LyricsQuery) -> Result<String, LyricsError> {
        let token = self.token.as_deref().ok_or(LyricsError::NotConfigured)?;
        let terms = query.search_terms();

        let response: GeniusResponse = self
            .http
            .get(GENIUS_SEARCH_URL)
            .query(&[("q", terms.as_str())])
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let song_url = response
            .response
            .hits
            .into_iter()
            .next()
            .map(|hit| hit.result.url)
            .ok_or_else(|| LyricsError::NoResults(terms.clone()))?;

        info!("🔍 Letra encontrada en {}", song_url);
        self.scrape(&song_url).await
    }

    async fn scrape(&self, song_url: &str) -> Result<String, LyricsError> {
        let response = self
            .http
            .get(song_url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LyricsError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;
        extract_lyrics(&html).ok_or(LyricsError::Unparseable)
    }
}

/// Quita sufijos típicos de YouTube y lo que haya entre paréntesis o corchetes.
pub fn clean_query(input: &str) -> String {
    static SUFFIXES: OnceLock<Regex> = OnceLock::new();
    static BRACKETS: OnceLock<Regex> = OnceLock::new();

    let suffixes = SUFFIXES.get_or_init(|| {
        Regex::new(r"(?i)\(?(official|music|video|lyric|hd|audio|visualizer)\)?")
            .expect("regex de sufijos válida")
    });
    let brackets = BRACKETS
        .get_or_init(|| Regex::new(r"\[.*?\]|\(.*?\)|feat\..*").expect("regex de corchetes válida"));

    let without_suffixes = suffixes.replace_all(input, "");
    brackets.replace_all(&without_suffixes, "").trim().to_string()
}

/// Texto de todos los contenedores de letra de una página de Genius.
///
/// Cada `<br>` se convierte en salto de línea; las entidades HTML las
/// decodifica el parser.
fn extract_lyrics(html: &str) -> Option<String> {
    static CONTAINER: OnceLock<Selector> = OnceLock::new();

    let container = CONTAINER.get_or_init(|| {
        Selector::parse("div[data-lyrics-container='true']").expect("selector de letra válido")
    });

    let document = Html::parse_document(html);
    let mut lyrics = String::new();

    for element in document.select(container) {
        for node in element.descendants() {
            match node.value() {
                Node::Text(text) => lyrics.push_str(text),
                Node::Element(tag) if tag.name() == "br" => lyrics.push('\n'),
                _ => {}
            }
        }
        lyrics.push('\n');
    }

    let lyrics = lyrics.trim();
    (!lyrics.is_empty()).then(|| lyrics.to_string())
}
