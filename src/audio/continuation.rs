//! Decide qué suena cuando el reproductor avisa que una pista terminó.

use serenity::model::id::GuildId;
use tracing::{debug, error, info};

use super::{
    error::PlayDirectiveError,
    manager::QueueManager,
    player::AudioNode,
    queue::{Queue, QueueMode},
    track::Track,
};

/// Motivo por el que terminó una pista.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Terminó de forma natural.
    Finished,
    /// No se pudo cargar o decodificar.
    LoadFailed,
    /// Un comando la detuvo.
    Stopped,
    /// Un comando la reemplazó por otra.
    Replaced,
    /// El reproductor se destruyó.
    Cleanup,
}

impl EndReason {
    /// Falso cuando el fin lo provocó un comando del usuario.
    pub fn may_start_next(&self) -> bool {
        matches!(self, EndReason::Finished | EndReason::LoadFailed)
    }
}

/// Aviso de fin de pista emitido por el reproductor.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEndEvent {
    pub guild_id: GuildId,
    pub track: Track,
    pub reason: EndReason,
}

/// Lo que hizo la lógica de continuación con un aviso.
#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    /// El fin fue manual; no se tocó nada.
    Suppressed,
    /// La guild ya no tiene cola.
    NoQueue,
    /// Modo normal con cola vacía: el reproductor queda inactivo.
    Idle,
    Played(Track),
    PlayFailed {
        track: Track,
        error: PlayDirectiveError,
    },
}

/// Elige la siguiente pista según el modo de la cola.
///
/// Las mutaciones (pop / append) ocurren aquí y nunca se revierten.
pub fn next_track(queue: &mut Queue, finished: &Track) -> Option<Track> {
    match queue.mode() {
        QueueMode::Normal => queue.next(),
        QueueMode::RepeatTrack => Some(finished.clone()),
        QueueMode::RepeatQueue => {
            // El límite de capacidad no aplica al reencolar: la pista ya estaba contada.
            queue.push_back_unchecked(finished.clone());
            queue.next()
        }
    }
}

/// Procesa un aviso de fin de pista.
///
/// La decisión se toma con el lock de la cola tomado; la orden de
/// reproducción se envía después de soltarlo.
pub async fn on_track_end<N>(queues: &QueueManager, player: &N, event: TrackEndEvent) -> Continuation
where
    N: AudioNode + ?Sized,
{
    let TrackEndEvent {
        guild_id,
        track: finished,
        reason,
    } = event;

    if !reason.may_start_next() {
        debug!(guild_id = %guild_id, ?reason, "⏹️ Fin manual, no se continúa");
        return Continuation::Suppressed;
    }

    let Some(queue) = queues.get(guild_id) else {
        debug!(guild_id = %guild_id, "Sin cola activa, se ignora el fin de pista");
        return Continuation::NoQueue;
    };

    let next = {
        let mut queue = queue.lock();
        next_track(&mut queue, &finished)
    };

    let Some(next) = next else {
        info!(guild_id = %guild_id, "📭 Cola vacía, reproductor inactivo");
        return Continuation::Idle;
    };

    match player.play(guild_id, &next).await {
        Ok(()) => {
            info!(guild_id = %guild_id, "🎵 Siguiente: {}", next.title);
            Continuation::Played(next)
        }
        Err(e) => {
            error!(guild_id = %guild_id, "❌ Error al reproducir siguiente pista: {}", e);
            Continuation::PlayFailed { track: next, error: e }
        }
    }
}
