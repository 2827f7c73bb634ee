//! Errores del núcleo de reproducción.
//!
//! Todos son locales y recuperables: el llamador decide qué mostrar al usuario.

use serenity::model::id::GuildId;
use thiserror::Error;

/// Errores de operaciones sobre colas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Modo de cola no reconocido. El modo anterior se conserva.
    #[error("invalid queue mode: {0:?}")]
    InvalidMode(String),

    /// No hay cola registrada para la guild.
    #[error("no active queue for guild {0}")]
    QueueAbsent(GuildId),

    /// La cola alcanzó el límite configurado.
    #[error("queue is full (max {max} tracks)")]
    QueueFull { max: usize },
}

/// El reproductor externo no pudo ejecutar una orden de reproducción.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayDirectiveError {
    #[error("not connected to voice in guild {0}")]
    NotConnected(GuildId),

    #[error("player rejected the track: {0}")]
    Rejected(String),
}

/// Fallos al resolver un identificador con yt-dlp.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("track loading timed out after {0}s")]
    Timeout(u64),

    #[error("yt-dlp failed: {0}")]
    Process(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Valores de configuración fuera del conjunto aceptado.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValueError {
    #[error("unknown search type {0:?} (expected youTube, youTubeMusic or soundCloud)")]
    SearchType(String),
}
