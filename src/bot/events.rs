use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};

use crate::audio::{
    continuation::{self, TrackEndEvent},
    manager::QueueManager,
    player::AudioNode,
};

/// Consume los avisos de fin de pista del reproductor.
///
/// Cada aviso se procesa en su propia tarea, así una guild lenta no frena a
/// las demás. La tarea termina cuando el reproductor suelta el emisor.
pub fn spawn_track_end_listener<N>(
    mut events: mpsc::UnboundedReceiver<TrackEndEvent>,
    queues: Arc<QueueManager>,
    player: Arc<N>,
) -> JoinHandle<()>
where
    N: AudioNode + 'static,
{
    tokio::spawn(async move {
        info!("🎧 Escuchando fines de pista");

        while let Some(event) = events.recv().await {
            let queues = queues.clone();
            let player = player.clone();

            tokio::spawn(async move {
                let guild_id = event.guild_id;
                let outcome = continuation::on_track_end(&queues, player.as_ref(), event).await;
                debug!(guild_id = %guild_id, ?outcome, "Continuación procesada");
            });
        }

        info!("Canal de fines de pista cerrado");
    })
}
