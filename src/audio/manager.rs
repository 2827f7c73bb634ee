use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    error::QueueError,
    queue::{Queue, QueueMode, QueueSnapshot},
    track::Track,
};

pub type SharedQueue = Arc<Mutex<Queue>>;

/// Registro de colas por guild.
///
/// El mapa está protegido por los locks por shard de [`DashMap`]; cada cola
/// tiene su propio [`Mutex`], así que guilds distintas no se bloquean entre sí.
/// Ninguna operación hace I/O mientras mantiene un lock.
#[derive(Debug, Default)]
pub struct QueueManager {
    queues: DashMap<GuildId, SharedQueue>,
    max_queue_size: Option<usize>,
}

impl QueueManager {
    pub fn new(max_queue_size: Option<usize>) -> Self {
        Self {
            queues: DashMap::new(),
            max_queue_size,
        }
    }

    /// Devuelve la cola de la guild o crea una vacía de forma atómica.
    pub fn get_or_create(&self, guild_id: GuildId) -> SharedQueue {
        self.queues
            .entry(guild_id)
            .or_insert_with(|| {
                debug!(guild_id = %guild_id, "📋 Cola creada");
                Arc::new(Mutex::new(Queue::with_capacity_limit(self.max_queue_size)))
            })
            .clone()
    }

    /// Búsqueda sin creación.
    pub fn get(&self, guild_id: GuildId) -> Option<SharedQueue> {
        self.queues.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// Elimina la cola de la guild. Borrar una guild ausente no es un error.
    pub fn delete(&self, guild_id: GuildId) -> bool {
        let removed = self.queues.remove(&guild_id).is_some();
        if removed {
            info!(guild_id = %guild_id, "🧹 Cola eliminada");
        }
        removed
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.queues.contains_key(&guild_id)
    }

    /// Número de guilds con cola activa.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    // Operaciones por guild usadas por los comandos

    pub fn add(&self, guild_id: GuildId, tracks: Vec<Track>) -> Result<usize, QueueError> {
        self.get_or_create(guild_id).lock().add(tracks)
    }

    pub fn next(&self, guild_id: GuildId) -> Result<Option<Track>, QueueError> {
        Ok(self.existing(guild_id)?.lock().next())
    }

    pub fn clear(&self, guild_id: GuildId) -> Result<usize, QueueError> {
        Ok(self.existing(guild_id)?.lock().clear())
    }

    /// Mezcla la cola y devuelve cuántas pistas quedaron en ella.
    pub fn shuffle(&self, guild_id: GuildId) -> Result<usize, QueueError> {
        let queue = self.existing(guild_id)?;
        let mut queue = queue.lock();
        queue.shuffle();
        Ok(queue.len())
    }

    /// Cambia el modo a partir del valor recibido del usuario.
    ///
    /// El valor se valida antes de tocar la cola: con un modo inválido el
    /// estado queda intacto.
    pub fn set_mode(&self, guild_id: GuildId, mode: &str) -> Result<QueueMode, QueueError> {
        let mode: QueueMode = mode.parse()?;
        self.existing(guild_id)?.lock().set_mode(mode);
        info!(guild_id = %guild_id, mode = %mode, "🔁 Modo de cola actualizado");
        Ok(mode)
    }

    pub fn snapshot(&self, guild_id: GuildId) -> Result<QueueSnapshot, QueueError> {
        Ok(self.existing(guild_id)?.lock().snapshot())
    }

    fn existing(&self, guild_id: GuildId) -> Result<SharedQueue, QueueError> {
        self.get(guild_id).ok_or(QueueError::QueueAbsent(guild_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Barrier, thread};

    fn guild(id: u64) -> GuildId {
        GuildId::new(id)
    }

    fn track(name: &str) -> Track {
        Track::new(name, format!("https://example.com/{}", name), 1_000)
    }

    #[test]
    fn get_does_not_create() {
        let manager = QueueManager::default();
        assert!(manager.get(guild(1)).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn get_or_create_returns_same_instance() {
        let manager = QueueManager::default();
        let first = manager.get_or_create(guild(1));
        let second = manager.get_or_create(guild(1));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &manager.get(guild(1)).unwrap()));
    }

    #[test]
    fn delete_is_idempotent() {
        let manager = QueueManager::default();
        manager.get_or_create(guild(1));
        manager.get_or_create(guild(2));

        assert!(manager.delete(guild(1)));
        assert!(!manager.delete(guild(1)));
        assert!(!manager.contains(guild(1)));
        assert!(manager.contains(guild(2)));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn concurrent_creation_yields_single_queue() {
        const THREADS: usize = 16;

        let manager = QueueManager::default();
        let barrier = Barrier::new(THREADS);

        let queues: Vec<SharedQueue> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        manager.get_or_create(guild(7))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(manager.len(), 1);
        for queue in &queues {
            assert!(Arc::ptr_eq(queue, &queues[0]));
        }
    }

    #[test]
    fn operations_on_missing_queue_report_absent() {
        let manager = QueueManager::default();
        let g = guild(3);

        assert_eq!(manager.next(g), Err(QueueError::QueueAbsent(g)));
        assert_eq!(manager.clear(g), Err(QueueError::QueueAbsent(g)));
        assert_eq!(manager.shuffle(g), Err(QueueError::QueueAbsent(g)));
        assert_eq!(manager.set_mode(g, "default"), Err(QueueError::QueueAbsent(g)));
        assert!(manager.is_empty());
    }

    #[test]
    fn add_creates_queue_lazily() {
        let manager = QueueManager::default();
        assert_eq!(manager.add(guild(1), vec![track("a"), track("b")]), Ok(2));
        assert_eq!(manager.next(guild(1)).unwrap().map(|t| t.title), Some("a".to_string()));
        assert_eq!(manager.clear(guild(1)), Ok(1));
    }

    #[test]
    fn invalid_mode_leaves_state_unchanged() {
        let manager = QueueManager::default();
        manager.get_or_create(guild(1));
        manager.set_mode(guild(1), "repeat-queue").unwrap();

        assert_eq!(
            manager.set_mode(guild(1), "turbo"),
            Err(QueueError::InvalidMode("turbo".to_string()))
        );
        assert_eq!(manager.snapshot(guild(1)).unwrap().mode, QueueMode::RepeatQueue);
    }

    #[test]
    fn configured_limit_applies_to_new_queues() {
        let manager = QueueManager::new(Some(1));
        manager.add(guild(1), vec![track("a")]).unwrap();
        assert_eq!(
            manager.add(guild(1), vec![track("b")]),
            Err(QueueError::QueueFull { max: 1 })
        );
    }

    #[test]
    fn deleted_queue_is_recreated_empty() {
        let manager = QueueManager::default();
        manager.add(guild(1), vec![track("a")]).unwrap();
        manager.set_mode(guild(1), "repeat-track").unwrap();
        manager.delete(guild(1));

        let queue = manager.get_or_create(guild(1));
        let queue = queue.lock();
        assert!(queue.is_empty());
        assert_eq!(queue.mode(), QueueMode::Normal);
    }
}
