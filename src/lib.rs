//! Jukeboxitus: a Discord music bot with per-guild queues and repeat modes.
//!
//! - [`audio`]: queues, continuation logic and the songbird player
//! - [`bot`]: slash commands and the serenity event handler
//! - [`config`]: environment and file configuration
//! - [`lyrics`]: Genius lyrics lookups
//! - [`ui`]: response embeds

pub mod audio;
pub mod bot;
pub mod config;
pub mod lyrics;
pub mod ui;
