use anyhow::{Context, Result};
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

use jukeboxitus::{audio::player::VoicePlayer, bot::JukeboxBot, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jukeboxitus=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Jukeboxitus v{}", env!("CARGO_PKG_VERSION"));

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    // Solo lo necesario para comandos slash y voz
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // El mismo Songbird sirve de gestor de voz y de reproductor
    let songbird = Songbird::serenity();
    let (player, track_ends) = VoicePlayer::new(songbird.clone(), config.default_volume);

    let token = config.discord_token.clone();
    let handler = JukeboxBot::new(config, Arc::new(player));
    let listener = handler.listen_for_track_ends(track_ends);

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    listener.abort();
    Ok(())
}

/// El audio lo decodifica symphonia; yt-dlp es el único binario externo.
async fn health_check() -> Result<()> {
    let version = probe("yt-dlp").await?;
    println!("yt-dlp {}", version);
    Ok(())
}

/// Ejecuta `program --version` y devuelve la primera línea de su salida.
async fn probe(program: &str) -> Result<String> {
    let output = async_process::Command::new(program)
        .arg("--version")
        .output()
        .await
        .with_context(|| format!("{} no está instalado", program))?;

    if !output.status.success() {
        anyhow::bail!("{} no responde (estado {})", program, output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_accepts_installed_program() {
        assert!(probe("true").await.is_ok());
    }

    #[tokio::test]
    async fn probe_reports_missing_program() {
        let err = probe("jukeboxitus-no-such-binary").await.unwrap_err();
        assert!(err.to_string().contains("no está instalado"));
    }
}
