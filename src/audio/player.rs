use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    error::ControlError,
    input::{Input, YoutubeDl},
    tracks::{PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    continuation::{EndReason, TrackEndEvent},
    error::PlayDirectiveError,
    track::Track,
};

/// Orden de reproducción hacia el reproductor externo.
///
/// Es el único punto por el que la lógica de continuación habla con el audio.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioNode: Send + Sync {
    /// Reproduce `track` en la guild, reemplazando lo que esté sonando.
    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), PlayDirectiveError>;
}

/// Motivo de fin pendiente, fijado por el propio reproductor antes de cortar una pista.
type EndIntent = Arc<Mutex<Option<EndReason>>>;

struct NowPlaying {
    track: Track,
    handle: TrackHandle,
    intent: EndIntent,
}

/// Reproductor basado en songbird.
///
/// Cada pista iniciada emite exactamente un [`TrackEndEvent`] por el canal
/// devuelto en [`VoicePlayer::new`].
pub struct VoicePlayer {
    songbird: Arc<Songbird>,
    http: reqwest::Client,
    default_volume: f32,
    playing: Arc<DashMap<GuildId, NowPlaying>>,
    volumes: DashMap<GuildId, f32>,
    events: mpsc::UnboundedSender<TrackEndEvent>,
}

impl VoicePlayer {
    /// `default_volume` va de 0 a 100.
    pub fn new(
        songbird: Arc<Songbird>,
        default_volume: u8,
    ) -> (Self, mpsc::UnboundedReceiver<TrackEndEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let player = Self {
            songbird,
            http: reqwest::Client::new(),
            default_volume: volume_fraction(default_volume),
            playing: Arc::new(DashMap::new()),
            volumes: DashMap::new(),
            events,
        };
        (player, receiver)
    }

    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.songbird.get(guild_id).is_some()
    }

    pub fn is_playing(&self, guild_id: GuildId) -> bool {
        self.playing.contains_key(&guild_id)
    }

    /// Conecta al canal de voz si no hay conexión previa en la guild.
    pub async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        if self.is_connected(guild_id) {
            return Ok(());
        }

        self.songbird
            .join(guild_id, channel_id)
            .await
            .context("Error al conectar al canal de voz")?;

        info!(guild_id = %guild_id, "🔊 Conectado al canal de voz {}", channel_id);
        Ok(())
    }

    /// Detiene la pista actual y sale del canal de voz.
    pub async fn leave(&self, guild_id: GuildId) -> Result<()> {
        self.end_current(guild_id, EndReason::Cleanup);
        self.songbird
            .remove(guild_id)
            .await
            .context("Error al desconectar del canal de voz")?;

        info!(guild_id = %guild_id, "👋 Desconectado del canal de voz");
        Ok(())
    }

    /// Olvida el estado de la guild tras una desconexión de voz.
    pub fn forget(&self, guild_id: GuildId) {
        self.end_current(guild_id, EndReason::Cleanup);
        self.volumes.remove(&guild_id);
    }

    /// Detiene la pista actual sin que la cola avance. Devuelve si había algo sonando.
    pub fn stop(&self, guild_id: GuildId) -> bool {
        self.end_current(guild_id, EndReason::Stopped)
    }

    /// Alterna pausa. `None` si no hay nada sonando; `Some(true)` si quedó pausado.
    pub async fn toggle_pause(&self, guild_id: GuildId) -> Result<Option<bool>> {
        let Some(handle) = self.current_handle(guild_id) else {
            return Ok(None);
        };

        let state = handle.get_info().await.context("Error al consultar la pista")?;
        if matches!(state.playing, PlayMode::Pause) {
            handle.play().context("Error al reanudar")?;
            info!(guild_id = %guild_id, "▶️ Reproducción reanudada");
            Ok(Some(false))
        } else {
            handle.pause().context("Error al pausar")?;
            info!(guild_id = %guild_id, "⏸️ Reproducción pausada");
            Ok(Some(true))
        }
    }

    /// Ajusta el volumen (0-100) para la pista actual y las siguientes.
    pub fn set_volume(&self, guild_id: GuildId, level: u8) -> Result<()> {
        let volume = volume_fraction(level);
        self.volumes.insert(guild_id, volume);

        if let Some(handle) = self.current_handle(guild_id) {
            handle.set_volume(volume).context("Error al cambiar volumen")?;
        }

        info!(guild_id = %guild_id, "🔊 Volumen ajustado a {}%", level.min(100));
        Ok(())
    }

    /// Pista actual y posición de reproducción.
    pub async fn now_playing(&self, guild_id: GuildId) -> Option<(Track, Duration)> {
        let (track, handle) = {
            let entry = self.playing.get(&guild_id)?;
            (entry.track.clone(), entry.handle.clone())
        };

        let position = handle
            .get_info()
            .await
            .map(|state| state.position)
            .unwrap_or_default();
        Some((track, position))
    }

    fn current_handle(&self, guild_id: GuildId) -> Option<TrackHandle> {
        self.playing.get(&guild_id).map(|entry| entry.handle.clone())
    }

    fn volume_for(&self, guild_id: GuildId) -> f32 {
        self.volumes
            .get(&guild_id)
            .map(|v| *v)
            .unwrap_or(self.default_volume)
    }

    /// Marca el motivo de fin y corta la pista actual.
    fn end_current(&self, guild_id: GuildId, reason: EndReason) -> bool {
        let Some((_, current)) = self.playing.remove(&guild_id) else {
            return false;
        };

        *current.intent.lock() = Some(reason);
        if let Err(e) = current.handle.stop() {
            debug!(guild_id = %guild_id, "La pista ya había terminado: {:?}", e);
        }
        true
    }
}

#[async_trait]
impl AudioNode for VoicePlayer {
    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<(), PlayDirectiveError> {
        let call = self
            .songbird
            .get(guild_id)
            .ok_or(PlayDirectiveError::NotConnected(guild_id))?;

        self.end_current(guild_id, EndReason::Replaced);

        let input: Input = YoutubeDl::new(self.http.clone(), track.uri.clone()).into();
        let handle = {
            let mut call = call.lock().await;
            call.play_only_input(input)
        };

        if let Err(e) = handle.set_volume(self.volume_for(guild_id)) {
            warn!(guild_id = %guild_id, "No se pudo fijar el volumen: {:?}", e);
        }

        let intent: EndIntent = Arc::new(Mutex::new(None));
        let notifier = TrackEndNotifier {
            guild_id,
            track: track.clone(),
            intent: intent.clone(),
            fired: Arc::new(AtomicBool::new(false)),
            playing: self.playing.clone(),
            events: self.events.clone(),
        };

        attach_notifier(&handle, &notifier)?;

        self.playing.insert(
            guild_id,
            NowPlaying {
                track: track.clone(),
                handle,
                intent,
            },
        );

        info!(guild_id = %guild_id, "🎵 Reproduciendo: {}", track.title);
        Ok(())
    }
}

/// Lo que `play` necesita de la pista recién creada.
#[cfg_attr(test, mockall::automock)]
trait TrackControl {
    fn add_end_event(&self, event: TrackEvent, notifier: TrackEndNotifier) -> Result<(), ControlError>;
    fn stop_track(&self) -> Result<(), ControlError>;
}

impl TrackControl for TrackHandle {
    fn add_end_event(&self, event: TrackEvent, notifier: TrackEndNotifier) -> Result<(), ControlError> {
        self.add_event(Event::Track(event), notifier)
    }

    fn stop_track(&self) -> Result<(), ControlError> {
        self.stop()
    }
}

/// Registra el notificador de fin. Si songbird lo rechaza, la pista se corta:
/// sin notificador nadie continuaría la cola.
fn attach_notifier<T: TrackControl>(
    handle: &T,
    notifier: &TrackEndNotifier,
) -> Result<(), PlayDirectiveError> {
    for event in [TrackEvent::End, TrackEvent::Error] {
        if let Err(e) = handle.add_end_event(event, notifier.clone()) {
            // Un End ya registrado no debe disparar otra continuación
            *notifier.intent.lock() = Some(EndReason::Cleanup);
            if let Err(stop) = handle.stop_track() {
                debug!(guild_id = %notifier.guild_id, "La pista ya había terminado: {:?}", stop);
            }
            return Err(PlayDirectiveError::Rejected(e.to_string()));
        }
    }
    Ok(())
}

/// Traduce el fin de una pista de songbird en un [`TrackEndEvent`].
#[derive(Clone)]
struct TrackEndNotifier {
    guild_id: GuildId,
    track: Track,
    intent: EndIntent,
    fired: Arc<AtomicBool>,
    playing: Arc<DashMap<GuildId, NowPlaying>>,
    events: mpsc::UnboundedSender<TrackEndEvent>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        // End y Error pueden llegar ambos para la misma pista
        if self.fired.swap(true, Ordering::SeqCst) {
            return Some(Event::Cancel);
        }

        let errored = match ctx {
            EventContext::Track(tracks) => tracks
                .iter()
                .any(|(state, _)| matches!(state.playing, PlayMode::Errored(_))),
            _ => false,
        };

        let reason = match *self.intent.lock() {
            Some(reason) => reason,
            None if errored => EndReason::LoadFailed,
            None => EndReason::Finished,
        };

        // Solo se limpia si la entrada sigue siendo esta pista
        self.playing
            .remove_if(&self.guild_id, |_, now| Arc::ptr_eq(&now.intent, &self.intent));

        debug!(guild_id = %self.guild_id, ?reason, "Pista terminada: {}", self.track.title);

        let event = TrackEndEvent {
            guild_id: self.guild_id,
            track: self.track.clone(),
            reason,
        };
        if self.events.send(event).is_err() {
            warn!("Canal de eventos de fin de pista cerrado");
        }

        Some(Event::Cancel)
    }
}

fn volume_fraction(level: u8) -> f32 {
    f32::from(level.min(100)) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_clamped_to_unit_range() {
        assert_eq!(volume_fraction(0), 0.0);
        assert_eq!(volume_fraction(50), 0.5);
        assert_eq!(volume_fraction(100), 1.0);
        assert_eq!(volume_fraction(250), 1.0);
    }

    fn notifier() -> TrackEndNotifier {
        let (events, _rx) = mpsc::unbounded_channel();
        TrackEndNotifier {
            guild_id: GuildId::new(1),
            track: Track::new("a", "https://example.com/a", 1_000),
            intent: Arc::new(Mutex::new(None)),
            fired: Arc::new(AtomicBool::new(false)),
            playing: Arc::new(DashMap::new()),
            events,
        }
    }

    #[test]
    fn notifier_is_registered_for_end_and_error() {
        let mut handle = MockTrackControl::new();
        handle
            .expect_add_end_event()
            .times(2)
            .returning(|_, _| Ok(()));
        handle.expect_stop_track().never();

        let notifier = notifier();
        assert_eq!(attach_notifier(&handle, &notifier), Ok(()));
        assert_eq!(*notifier.intent.lock(), None);
    }

    #[test]
    fn rejected_notifier_stops_the_track() {
        let mut handle = MockTrackControl::new();
        handle
            .expect_add_end_event()
            .withf(|event, _| matches!(event, TrackEvent::End))
            .times(1)
            .returning(|_, _| Ok(()));
        handle
            .expect_add_end_event()
            .withf(|event, _| matches!(event, TrackEvent::Error))
            .times(1)
            .returning(|_, _| Err(ControlError::Finished));
        handle.expect_stop_track().times(1).returning(|| Ok(()));

        let notifier = notifier();
        let result = attach_notifier(&handle, &notifier);

        assert!(matches!(result, Err(PlayDirectiveError::Rejected(_))));
        // El End ya registrado se verá como limpieza, no como fin natural
        assert_eq!(*notifier.intent.lock(), Some(EndReason::Cleanup));
    }

    #[test]
    fn user_initiated_ends_do_not_continue() {
        assert!(EndReason::Finished.may_start_next());
        assert!(EndReason::LoadFailed.may_start_next());
        assert!(!EndReason::Stopped.may_start_next());
        assert!(!EndReason::Replaced.may_start_next());
        assert!(!EndReason::Cleanup.may_start_next());
    }
}
