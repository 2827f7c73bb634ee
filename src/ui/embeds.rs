use serenity::{
    all::{Colour, Timestamp},
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::audio::{queue::QueueSnapshot, track::Track};

/// Límite práctico de la descripción de un embed (Discord permite 4096).
pub const DESCRIPTION_LIMIT: usize = 4000;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const DEFAULT_BLURPLE: Colour = Colour::new(0x5865F2);
    pub const SUCCESS_GREEN: Colour = Colour::new(0x57F287);
    pub const WARNING_YELLOW: Colour = Colour::new(0xFEE75C);
    pub const ERROR_RED: Colour = Colour::new(0xED4245);
}

pub mod icons {
    pub const PLAY: &str = "▶️";
    pub const PAUSE: &str = "⏸️";
    pub const STOP: &str = "⏹️";
    pub const SKIP: &str = "⏭️";
    pub const SHUFFLE: &str = "🔀";
    pub const REPEAT: &str = "🔁";
    pub const QUEUE: &str = "📜";
    pub const SEARCH: &str = "🔍";
    pub const SUCCESS: &str = "✅";
    pub const ERROR: &str = "❌";
    pub const EMPTY: &str = "🏜️";
    pub const VOLUME: &str = "🔊";
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "Jukeboxitus Music";

/// Embed básico con título, descripción y color.
pub fn response_embed(title: &str, description: &str, colour: Colour) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(colour)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Igual que [`response_embed`] pero con la carátula de la pista como miniatura.
pub fn track_embed(title: &str, description: &str, track: &Track, colour: Colour) -> CreateEmbed {
    let embed = response_embed(title, description, colour);
    match &track.artwork_url {
        Some(artwork) if !artwork.is_empty() => embed.thumbnail(artwork),
        _ => embed,
    }
}

pub fn error_embed(title: &str, description: &str) -> CreateEmbed {
    response_embed(title, &format!("{} {}", icons::ERROR, description), colors::ERROR_RED)
}

/// Crea un embed para mostrar la canción actual
pub fn now_playing_embed(track: &Track, position: Duration) -> CreateEmbed {
    let length = if track.is_stream() {
        "🔴 LIVE".to_string()
    } else {
        format_duration(track.duration())
    };

    let description = format!(
        "{} **Currently Playing**\n{}\n\n`{} / {}`",
        icons::PLAY,
        track_link(track),
        format_duration(position),
        length
    );

    let mut embed = track_embed("Now Playing", &description, track, colors::DEFAULT_BLURPLE);
    if let Some(author) = &track.author {
        embed = embed.field("🎤 Artist", author, true);
    }
    embed
}

pub fn queue_embed(snapshot: &QueueSnapshot) -> CreateEmbed {
    let title = format!("{} Current Queue ({})", icons::QUEUE, snapshot.mode);
    response_embed(&title, &queue_description(snapshot), colors::DEFAULT_BLURPLE).field(
        "⏱️ Total",
        format!("{} tracks · {}", snapshot.tracks.len(), format_duration(snapshot.total_duration)),
        true,
    )
}

/// Lista numerada de pistas pendientes, cortada antes del límite del embed.
pub fn queue_description(snapshot: &QueueSnapshot) -> String {
    let mut description = String::new();

    for (i, track) in snapshot.tracks.iter().enumerate() {
        let line = format!("**{}.** {}\n", i + 1, track_link(track));
        if description.len() + line.len() > DESCRIPTION_LIMIT {
            description.push_str("...and more");
            break;
        }
        description.push_str(&line);
    }

    description
}

/// Enlace markdown sin preview: [`título`](<uri>)
pub fn track_link(track: &Track) -> String {
    format!("[`{}`](<{}>)", track.title.replace('`', "'"), track.uri)
}

/// Corta un texto a `limit` bytes respetando límites de carácter.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }

    let mut end = limit.saturating_sub(3);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::queue::QueueMode;

    fn snapshot(count: usize) -> QueueSnapshot {
        QueueSnapshot {
            tracks: (0..count)
                .map(|i| Track::new(format!("Track {}", i), format!("https://example.com/{}", i), 1_000))
                .collect(),
            mode: QueueMode::Normal,
            total_duration: Duration::ZERO,
        }
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::ZERO), "0:00");
        assert_eq!(format_duration(Duration::from_secs(65)), "1:05");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1:02:05");
    }

    #[test]
    fn queue_listing_is_numbered() {
        let text = queue_description(&snapshot(2));
        assert_eq!(
            text,
            "**1.** [`Track 0`](<https://example.com/0>)\n**2.** [`Track 1`](<https://example.com/1>)\n"
        );
    }

    #[test]
    fn long_queue_listing_is_truncated() {
        let text = queue_description(&snapshot(500));
        assert!(text.len() <= DESCRIPTION_LIMIT + "...and more".len());
        assert!(text.ends_with("...and more"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        let text = "ñ".repeat(10);
        let cut = truncate(&text, 8);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 8);
    }

    #[test]
    fn backticks_in_titles_do_not_break_links() {
        let track = Track::new("a `quoted` title", "https://example.com/x", 0);
        assert_eq!(track_link(&track), "[`a 'quoted' title`](<https://example.com/x>)");
    }
}
