//! Definiciones y registro de los comandos slash.
//!
//! Los filtros de audio (bass-boost, 8D) no existen aquí: songbird no expone
//! un pipeline de filtros equivalente.

use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::Command, application::CommandOptionType, id::GuildId},
    prelude::Context,
};

use crate::audio::queue::QueueMode;

/// Todas las definiciones de comandos slash del bot.
pub fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        pause_command(),
        skip_command(),
        now_playing_command(),
        stop_command(),
        shuffle_command(),
        queue_command(),
        clear_queue_command(),
        queue_type_command(),
        volume_command(),
        lyrics_command(),
    ]
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<usize> {
    let registered = Command::set_global_commands(&ctx.http, all_commands()).await?;
    Ok(registered.len())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<usize> {
    let registered = guild_id.set_commands(&ctx.http, all_commands()).await?;
    Ok(registered.len())
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Plays a song")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "identifier",
                "The song link or search query",
            )
            .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pauses or resumes the current song")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skips the current song")
}

fn now_playing_command() -> CreateCommand {
    CreateCommand::new("now-playing").description("Shows the current playing song")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stops the current song and stops the player")
}

// Comandos de cola

fn shuffle_command() -> CreateCommand {
    CreateCommand::new("shuffle").description("Shuffles the current queue")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Shows the current queue")
}

fn clear_queue_command() -> CreateCommand {
    CreateCommand::new("clear-queue").description("Clears the current queue")
}

fn queue_type_command() -> CreateCommand {
    let option = QueueMode::ALL.iter().fold(
        CreateCommandOption::new(CommandOptionType::String, "type", "The queue type").required(true),
        |option, mode| option.add_string_choice(mode.as_str(), mode.as_str()),
    );

    CreateCommand::new("queue-type")
        .description("Sets the queue type")
        .add_option(option)
}

// Comandos de audio

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Sets the player volume")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "level", "Volume level (0-100)")
                .min_int_value(0)
                .max_int_value(100)
                .required(true),
        )
}

// Comandos adicionales

fn lyrics_command() -> CreateCommand {
    CreateCommand::new("lyrics")
        .description("Get lyrics for the current song")
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "artist",
            "The name of the artist",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "title",
            "The name of the song",
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_command_once() {
        let names: Vec<String> = all_commands()
            .into_iter()
            .map(|command| {
                let json = serde_json::to_value(&command).expect("comando serializable");
                json["name"].as_str().unwrap_or_default().to_string()
            })
            .collect();

        assert_eq!(
            names,
            [
                "play",
                "pause",
                "skip",
                "now-playing",
                "stop",
                "shuffle",
                "queue",
                "clear-queue",
                "queue-type",
                "volume",
                "lyrics"
            ]
        );
    }

    #[test]
    fn queue_type_offers_every_mode() {
        let json = serde_json::to_value(queue_type_command()).expect("comando serializable");
        let choices: Vec<&str> = json["options"][0]["choices"]
            .as_array()
            .expect("choices")
            .iter()
            .filter_map(|choice| choice["value"].as_str())
            .collect();

        assert_eq!(choices, ["default", "repeat-track", "repeat-queue"]);
    }
}
