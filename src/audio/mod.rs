//! # Audio Module
//!
//! Per-guild playback state and the glue to the voice backend.
//!
//! ## Architecture
//!
//! ### [`queue`] - Queue
//! - Pending tracks in FIFO order plus the repeat mode
//! - The playing track is never stored here; it belongs to the player
//!
//! ### [`manager`] - Queue Registry
//! - One queue per guild, created lazily and removed on voice departure
//! - Per-queue locks, so guilds never wait on each other
//!
//! ### [`continuation`] - Track End Handling
//! - Decides the next track from the queue mode when a track finishes
//! - Ignores ends caused by user commands (stop, skip, replace)
//!
//! ### [`player`] - Voice Player
//! - [`player::AudioNode`] is the play directive boundary
//! - [`player::VoicePlayer`] implements it on top of songbird
//!
//! ### [`loader`] - Track Loading
//! - Resolves URLs, playlists and searches through yt-dlp
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use jukeboxitus::audio::{manager::QueueManager, track::Track};
//! use serenity::all::GuildId;
//!
//! let queues = QueueManager::new(None);
//! let guild_id = GuildId::new(123456789);
//!
//! queues.add(guild_id, vec![Track::new("Song", "https://example.com/song", 180_000)])?;
//! queues.set_mode(guild_id, "repeat-queue")?;
//! let next = queues.next(guild_id)?;
//! # Ok::<(), jukeboxitus::audio::error::QueueError>(())
//! ```

pub mod continuation;
pub mod error;
pub mod loader;
pub mod manager;
pub mod player;
pub mod queue;
pub mod track;
