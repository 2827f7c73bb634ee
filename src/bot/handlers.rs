use anyhow::Result;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    audio::{
        error::{LoadError, QueueError},
        player::AudioNode,
        track::{LoadResult, Track},
    },
    bot::JukeboxBot,
    lyrics::LyricsQuery,
    ui::embeds::{self, colors, icons, DESCRIPTION_LIMIT},
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &JukeboxBot,
) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        let embed = embeds::error_embed("Unavailable", "Commands only work inside a server.");
        return respond(ctx, &command, embed).await;
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, bot, guild_id).await,
        "pause" => handle_pause(ctx, &command, bot, guild_id).await,
        "skip" => handle_skip(ctx, &command, bot, guild_id).await,
        "now-playing" => handle_now_playing(ctx, &command, bot, guild_id).await,
        "stop" => handle_stop(ctx, &command, bot, guild_id).await,
        "shuffle" => handle_shuffle(ctx, &command, bot, guild_id).await,
        "queue" => handle_queue(ctx, &command, bot, guild_id).await,
        "clear-queue" => handle_clear_queue(ctx, &command, bot, guild_id).await,
        "queue-type" => handle_queue_type(ctx, &command, bot, guild_id).await,
        "volume" => handle_volume(ctx, &command, bot, guild_id).await,
        "lyrics" => handle_lyrics(ctx, &command, bot, guild_id).await,
        other => {
            warn!("Comando desconocido: {}", other);
            respond(ctx, &command, embeds::error_embed("Unknown Command", "Command not recognised.")).await
        }
    }
}

// Handlers específicos para cada comando

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(raw) = string_option(command, "identifier") else {
        return respond(ctx, command, embeds::error_embed("Play Error", "Missing song link or search query.")).await;
    };
    let identifier = bot.config.search_type.identifier_for(raw);

    // Verificar que el usuario esté en un canal de voz
    let Some(channel_id) = get_user_voice_channel(ctx, guild_id, command.user.id) else {
        let embed = embeds::error_embed("Connection Error", "You must be in a voice channel to play music!");
        return respond(ctx, command, embed).await;
    };

    // Defer la respuesta ya que la carga puede tomar tiempo
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let result = match bot.loader.load(&identifier).await {
        Ok(result) => result,
        Err(LoadError::Timeout(secs)) => {
            let embed = embeds::error_embed("Search Error", &format!("Loading timed out after {}s.", secs));
            return respond(ctx, command, embed).await;
        }
        Err(e) => {
            let embed = embeds::error_embed("Search Error", &format!("Error: `{}`", e));
            return respond(ctx, command, embed).await;
        }
    };

    let loaded = match Loaded::from_result(result, &identifier) {
        Ok(loaded) => loaded,
        Err(embed) => return respond(ctx, command, embed).await,
    };

    // Conectar al canal de voz si no está conectado
    if let Err(e) = bot.player.join(guild_id, channel_id).await {
        warn!(guild_id = %guild_id, "Error al conectar: {:?}", e);
        let embed = embeds::error_embed("Connection Error", &format!("Could not join your voice channel: `{}`", e));
        return respond(ctx, command, embed).await;
    }

    let plan = PlayPlan::new(loaded.tracks, !bot.player.is_playing(guild_id));

    // Siempre deja una cola activa para la guild
    if let Err(e) = bot.queues.add(guild_id, plan.enqueue) {
        return respond(ctx, command, queue_error_embed(&e)).await;
    }

    if let Some(track) = &plan.play_now {
        if let Err(e) = bot.player.play(guild_id, track).await {
            let embed = embeds::error_embed("Playback Error", &format!("Error while playing the track: `{}`", e));
            return respond(ctx, command, embed).await;
        }
    }

    respond(ctx, command, loaded.embed).await
}

async fn handle_pause(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let embed = match bot.player.toggle_pause(guild_id).await {
        Ok(None) => no_player_embed("Playback Error"),
        Ok(Some(true)) => embeds::response_embed(
            "Player Status",
            &format!("{} Player is now **Paused**", icons::PAUSE),
            colors::WARNING_YELLOW,
        ),
        Ok(Some(false)) => embeds::response_embed(
            "Player Status",
            &format!("{} Player is now **Resumed**", icons::PLAY),
            colors::SUCCESS_GREEN,
        ),
        Err(e) => embeds::error_embed("Playback Error", &format!("Error while updating player: `{}`", e)),
    };

    respond(ctx, command, embed).await
}

async fn handle_skip(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    if !bot.player.is_connected(guild_id) {
        return respond(ctx, command, no_player_embed("Playback Error")).await;
    }

    let next = match bot.queues.next(guild_id) {
        Ok(Some(track)) => track,
        Ok(None) => {
            let embed = embeds::response_embed(
                "End of Queue",
                &format!("{} No more tracks to skip to.", icons::EMPTY),
                colors::WARNING_YELLOW,
            );
            return respond(ctx, command, embed).await;
        }
        Err(_) => {
            let embed = embeds::response_embed(
                "Queue Error",
                &format!("{} No queue found for this server.", icons::EMPTY),
                colors::ERROR_RED,
            );
            return respond(ctx, command, embed).await;
        }
    };

    let embed = match bot.player.play(guild_id, &next).await {
        Ok(()) => embeds::track_embed(
            "Track Skipped",
            &format!("{} Skipped to: **{}**", icons::SKIP, embeds::track_link(&next)),
            &next,
            colors::SUCCESS_GREEN,
        ),
        Err(e) => embeds::error_embed("Playback Error", &format!("Error while playing the next track: `{}`", e)),
    };

    respond(ctx, command, embed).await
}

async fn handle_now_playing(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    if !bot.player.is_connected(guild_id) {
        return respond(ctx, command, embeds::error_embed("Player Status", "No player found.")).await;
    }

    let embed = match bot.player.now_playing(guild_id).await {
        Some((track, position)) => embeds::now_playing_embed(&track, position),
        None => embeds::response_embed(
            "Player Status",
            &format!("{} Nothing playing.", icons::EMPTY),
            colors::DEFAULT_BLURPLE,
        ),
    };

    respond(ctx, command, embed).await
}

async fn handle_stop(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    if !bot.player.is_connected(guild_id) {
        return respond(ctx, command, no_player_embed("Playback Error")).await;
    }

    if let Err(e) = bot.player.leave(guild_id).await {
        let embed = embeds::error_embed("Connection Error", &format!("Error while disconnecting: `{}`", e));
        return respond(ctx, command, embed).await;
    }
    bot.queues.delete(guild_id);

    let embed = embeds::response_embed(
        "Disconnected",
        &format!(
            "{} The player has been stopped and I have left the voice channel.",
            icons::STOP
        ),
        colors::ERROR_RED,
    );
    respond(ctx, command, embed).await
}

async fn handle_shuffle(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let embed = match bot.queues.shuffle(guild_id) {
        Ok(count) if count > 0 => embeds::response_embed(
            "Queue Shuffled",
            &format!("{} Successfully shuffled **{}** tracks!", icons::SHUFFLE, count),
            colors::SUCCESS_GREEN,
        ),
        _ => embeds::response_embed(
            "Queue Error",
            &format!("{} There is no active queue to shuffle right now.", icons::EMPTY),
            colors::ERROR_RED,
        ),
    };

    respond(ctx, command, embed).await
}

async fn handle_queue(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let embed = match bot.queues.snapshot(guild_id) {
        Ok(snapshot) if snapshot.tracks.is_empty() => embeds::response_embed(
            "Queue Status",
            &format!("{} The queue is currently empty.", icons::EMPTY),
            colors::DEFAULT_BLURPLE,
        ),
        Ok(snapshot) => embeds::queue_embed(&snapshot),
        Err(_) => no_player_embed("Queue Status"),
    };

    respond(ctx, command, embed).await
}

async fn handle_clear_queue(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let embed = match bot.queues.clear(guild_id) {
        Ok(count) => embeds::response_embed(
            "Queue Cleared",
            &format!("{} Successfully removed **{}** tracks from the queue.", icons::SUCCESS, count),
            colors::SUCCESS_GREEN,
        ),
        Err(_) => embeds::error_embed("Queue Error", "No active player or queue found."),
    };

    respond(ctx, command, embed).await
}

async fn handle_queue_type(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    let requested = string_option(command, "type").unwrap_or_default();

    let embed = match bot.queues.set_mode(guild_id, requested) {
        Ok(mode) => embeds::response_embed(
            "Queue Mode Updated",
            &format!("{} Queue mode has been set to: **{}**", icons::REPEAT, mode),
            colors::SUCCESS_GREEN,
        ),
        Err(QueueError::InvalidMode(_)) => {
            embeds::error_embed("Configuration Error", "Invalid queue mode selected.")
        }
        Err(_) => no_player_embed("Configuration Error"),
    };

    respond(ctx, command, embed).await
}

async fn handle_volume(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    if !bot.player.is_connected(guild_id) {
        return respond(ctx, command, no_player_embed("Setting Error")).await;
    }

    let level = integer_option(command, "level").unwrap_or(100).clamp(0, 100) as u8;

    let embed = match bot.player.set_volume(guild_id, level) {
        Ok(()) => embeds::response_embed(
            "Volume Updated",
            &format!("{} Volume set to **{}%**", icons::VOLUME, level),
            colors::SUCCESS_GREEN,
        ),
        Err(e) => embeds::error_embed("Setting Error", &format!("Could not set volume: `{}`", e)),
    };

    respond(ctx, command, embed).await
}

async fn handle_lyrics(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &JukeboxBot,
    guild_id: GuildId,
) -> Result<()> {
    if !bot.lyrics.is_configured() {
        return respond(ctx, command, embeds::error_embed("Lyrics Error", "Lyrics are not configured on this bot.")).await;
    }

    let query = match LyricsQuery::from_args(
        string_option(command, "artist"),
        string_option(command, "title"),
    ) {
        Some(query) => query,
        None => match bot.player.now_playing(guild_id).await {
            Some((track, _)) => LyricsQuery::from_track_title(&track.title),
            None => {
                let embed = embeds::error_embed(
                    "Lyrics Error",
                    "No song is currently playing and no search terms provided.",
                );
                return respond(ctx, command, embed).await;
            }
        },
    };

    // Genius + scraping toma tiempo
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let embed = match bot.lyrics.find(&query).await {
        Ok(lyrics) => embeds::response_embed(
            &query.header(),
            &embeds::truncate(&lyrics, DESCRIPTION_LIMIT),
            colors::DEFAULT_BLURPLE,
        ),
        Err(e) => {
            warn!("🔍 Letra no encontrada para {:?}: {}", query, e);
            embeds::response_embed(
                "Lyrics Not Found",
                &format!(
                    "{} Could not find lyrics for **{} {}**",
                    icons::SEARCH,
                    query.artist,
                    query.title
                ),
                colors::WARNING_YELLOW,
            )
        }
    };

    respond(ctx, command, embed).await
}

/// Pistas aceptadas de una carga y el embed que las anuncia.
struct Loaded {
    tracks: Vec<Track>,
    embed: CreateEmbed,
}

impl Loaded {
    /// `Err(embed)` cuando no hay nada que reproducir.
    fn from_result(result: LoadResult, identifier: &str) -> Result<Self, CreateEmbed> {
        let loaded = match result {
            LoadResult::Track(track) => {
                let embed = embeds::track_embed(
                    "Track Added",
                    &format!("{} Added {} to queue.", icons::PLAY, embeds::track_link(&track)),
                    &track,
                    colors::SUCCESS_GREEN,
                );
                Self { tracks: vec![track], embed }
            }
            LoadResult::Playlist { name, tracks } => {
                let Some(first) = tracks.first() else {
                    return Err(nothing_found_embed(identifier));
                };
                let embed = embeds::track_embed(
                    "Playlist Added",
                    &format!(
                        "{} Loaded **{}** tracks from playlist: `{}`",
                        icons::QUEUE,
                        tracks.len(),
                        name
                    ),
                    first,
                    colors::SUCCESS_GREEN,
                );
                Self { tracks, embed }
            }
            LoadResult::Search(mut tracks) => {
                if tracks.is_empty() {
                    return Err(nothing_found_embed(identifier));
                }
                let track = tracks.swap_remove(0);
                let embed = embeds::track_embed(
                    "Search Result",
                    &format!("{} Playing search result: {}", icons::SEARCH, embeds::track_link(&track)),
                    &track,
                    colors::SUCCESS_GREEN,
                );
                Self { tracks: vec![track], embed }
            }
            LoadResult::Empty => return Err(nothing_found_embed(identifier)),
            LoadResult::Error(message) => {
                return Err(embeds::error_embed("Search Error", &format!("Error: `{}`", message)))
            }
        };

        Ok(loaded)
    }
}

/// Reparto de las pistas cargadas entre "suena ya" y "a la cola".
#[derive(Debug, PartialEq)]
struct PlayPlan {
    play_now: Option<Track>,
    enqueue: Vec<Track>,
}

impl PlayPlan {
    fn new(mut tracks: Vec<Track>, idle: bool) -> Self {
        if idle && !tracks.is_empty() {
            let first = tracks.remove(0);
            Self {
                play_now: Some(first),
                enqueue: tracks,
            }
        } else {
            Self {
                play_now: None,
                enqueue: tracks,
            }
        }
    }
}

// Funciones auxiliares

/// Responde la interacción; si ya fue diferida, edita la respuesta original.
async fn respond(ctx: &Context, command: &CommandInteraction, embed: CreateEmbed) -> Result<()> {
    let created = command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed.clone()),
            ),
        )
        .await;

    if created.is_err() {
        command
            .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
            .await?;
    }

    Ok(())
}

fn no_player_embed(title: &str) -> CreateEmbed {
    embeds::error_embed(title, "No active player found.")
}

fn nothing_found_embed(identifier: &str) -> CreateEmbed {
    embeds::response_embed(
        "No Results",
        &format!("{} Nothing found for: `{}`", icons::EMPTY, identifier),
        colors::DEFAULT_BLURPLE,
    )
}

fn queue_error_embed(error: &QueueError) -> CreateEmbed {
    match error {
        QueueError::QueueFull { max } => embeds::response_embed(
            "Queue Full",
            &format!("{} The queue is limited to **{}** tracks.", icons::QUEUE, max),
            colors::WARNING_YELLOW,
        ),
        other => embeds::error_embed("Queue Error", &other.to_string()),
    }
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn integer_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(name: &str) -> Track {
        Track::new(name, format!("https://example.com/{}", name), 60_000)
    }

    #[test]
    fn idle_player_starts_first_track_and_queues_rest() {
        let plan = PlayPlan::new(vec![track("a"), track("b"), track("c")], true);
        assert_eq!(plan.play_now, Some(track("a")));
        assert_eq!(plan.enqueue, vec![track("b"), track("c")]);
    }

    #[test]
    fn busy_player_queues_everything() {
        let plan = PlayPlan::new(vec![track("a"), track("b")], false);
        assert_eq!(plan.play_now, None);
        assert_eq!(plan.enqueue, vec![track("a"), track("b")]);
    }

    #[test]
    fn search_keeps_only_first_hit() {
        let result = LoadResult::Search(vec![track("a"), track("b"), track("c")]);
        let Ok(loaded) = Loaded::from_result(result, "ytsearch:a") else {
            panic!("expected tracks");
        };
        assert_eq!(loaded.tracks, vec![track("a")]);
    }

    #[test]
    fn playlist_keeps_every_track() {
        let result = LoadResult::Playlist {
            name: "Mix".to_string(),
            tracks: vec![track("a"), track("b")],
        };
        let Ok(loaded) = Loaded::from_result(result, "https://example.com/list") else {
            panic!("expected tracks");
        };
        assert_eq!(loaded.tracks.len(), 2);
    }

    #[test]
    fn nothing_to_play_yields_an_embed() {
        assert!(Loaded::from_result(LoadResult::Empty, "x").is_err());
        assert!(Loaded::from_result(LoadResult::Search(vec![]), "x").is_err());
        assert!(Loaded::from_result(LoadResult::Error("boom".to_string()), "x").is_err());

        let empty_playlist = LoadResult::Playlist {
            name: "Mix".to_string(),
            tracks: vec![],
        };
        assert!(Loaded::from_result(empty_playlist, "x").is_err());
    }
}
