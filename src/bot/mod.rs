//! # Bot Module
//!
//! Discord glue for Jukeboxitus.
//!
//! This module contains:
//! - Slash command definitions and registration ([`commands`])
//! - Command handlers that drive the queues and the player ([`handlers`])
//! - The track-end listener that feeds the continuation logic ([`events`])
//!
//! ## Architecture
//!
//! The bot is built around the [`JukeboxBot`] struct which implements
//! Serenity's [`EventHandler`] trait. It owns:
//!
//! - Per-guild queues through [`QueueManager`]
//! - Playback through [`VoicePlayer`]
//! - Track resolution through [`TrackLoader`]
//! - Optional lyrics lookups through [`LyricsClient`]
//!
//! ## Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use jukeboxitus::{audio::player::VoicePlayer, bot::JukeboxBot, config::Config};
//! # fn example(songbird: Arc<songbird::Songbird>) -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let (player, track_ends) = VoicePlayer::new(songbird, config.default_volume);
//! let bot = JukeboxBot::new(config, Arc::new(player));
//! bot.listen_for_track_ends(track_ends);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{
    audio::{
        continuation::TrackEndEvent, loader::TrackLoader, manager::QueueManager,
        player::VoicePlayer,
    },
    config::Config,
    lyrics::LyricsClient,
};

/// Main Discord event handler.
///
/// ## Fields
///
/// - `config`: Bot configuration (token, search type, limits)
/// - `queues`: Registry of per-guild queues
/// - `player`: songbird-backed player, also the continuation's audio node
/// - `loader`: yt-dlp track resolution with a load timeout
/// - `lyrics`: Genius lyrics client, inactive without a token
pub struct JukeboxBot {
    pub config: Arc<Config>,
    pub queues: Arc<QueueManager>,
    pub player: Arc<VoicePlayer>,
    pub loader: TrackLoader,
    pub lyrics: LyricsClient,
}

impl JukeboxBot {
    pub fn new(config: Config, player: Arc<VoicePlayer>) -> Self {
        let queues = Arc::new(QueueManager::new(config.max_queue_size));
        let loader = TrackLoader::new(config.load_timeout(), config.max_playlist_size);
        let lyrics = LyricsClient::new(config.genius_token.clone());

        Self {
            config: Arc::new(config),
            queues,
            player,
            loader,
            lyrics,
        }
    }

    /// Starts the task that runs the continuation logic for every track end.
    pub fn listen_for_track_ends(
        &self,
        track_ends: mpsc::UnboundedReceiver<TrackEndEvent>,
    ) -> JoinHandle<()> {
        events::spawn_track_end_listener(track_ends, self.queues.clone(), self.player.clone())
    }

    /// Registers slash commands with Discord.
    ///
    /// Commands are registered per guild when `guild_id` is configured
    /// (instant propagation, useful for development) and globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                let count = commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ {} comandos registrados para la guild {}", count, guild_id);
            }
            None => {
                let count = commands::register_global_commands(ctx).await?;
                info!("🌐 {} comandos registrados globalmente", count);
            }
        }

        Ok(())
    }

    /// Drops all per-guild state after the bot leaves voice.
    fn cleanup_guild(&self, guild_id: GuildId) {
        self.player.forget(guild_id);
        self.queues.delete(guild_id);
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("❌ Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Cleans up a guild when the bot itself leaves voice, whether through
    /// `/stop`, a moderator disconnect or the channel being deleted.
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        if new.user_id != ctx.cache.current_user().id || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            warn!("Actualización de voz sin guild");
            return;
        };

        info!("🔌 Bot desconectado en guild {}", guild_id);
        self.cleanup_guild(guild_id);
    }
}
