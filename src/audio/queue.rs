use rand::{seq::SliceRandom, Rng};
use std::{collections::VecDeque, fmt, str::FromStr, time::Duration};
use tracing::debug;

use super::{error::QueueError, track::Track};

/// Política de repetición que decide qué suena al terminar una pista.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueMode {
    #[default]
    Normal,
    RepeatTrack,
    RepeatQueue,
}

impl QueueMode {
    pub const ALL: [QueueMode; 3] = [QueueMode::Normal, QueueMode::RepeatTrack, QueueMode::RepeatQueue];

    /// Valor usado en las opciones del comando `/queue-type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueMode::Normal => "default",
            QueueMode::RepeatTrack => "repeat-track",
            QueueMode::RepeatQueue => "repeat-queue",
        }
    }
}

impl fmt::Display for QueueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parseo total: cualquier valor desconocido es un error, nunca un modo por defecto.
impl FromStr for QueueMode {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "normal" => Ok(QueueMode::Normal),
            "repeat-track" | "repeattrack" => Ok(QueueMode::RepeatTrack),
            "repeat-queue" | "repeatqueue" => Ok(QueueMode::RepeatQueue),
            _ => Err(QueueError::InvalidMode(s.to_string())),
        }
    }
}

/// Cola de pistas pendientes de una guild.
///
/// La pista que está sonando no vive aquí: pertenece al reproductor externo.
#[derive(Debug, Default)]
pub struct Queue {
    tracks: VecDeque<Track>,
    mode: QueueMode,
    max_size: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cola con límite de capacidad. `None` significa sin límite.
    pub fn with_capacity_limit(max_size: Option<usize>) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Agrega pistas al final, en orden. Si hay límite, o entran todas o ninguna.
    pub fn add<I>(&mut self, tracks: I) -> Result<usize, QueueError>
    where
        I: IntoIterator<Item = Track>,
    {
        let tracks: Vec<Track> = tracks.into_iter().collect();
        if let Some(max) = self.max_size {
            if self.tracks.len() + tracks.len() > max {
                return Err(QueueError::QueueFull { max });
            }
        }

        let added = tracks.len();
        self.tracks.extend(tracks);
        debug!("➕ {} pistas agregadas ({} en cola)", added, self.tracks.len());
        Ok(added)
    }

    /// Reencola al final sin comprobar el límite (usado por la repetición de cola).
    pub(crate) fn push_back_unchecked(&mut self, track: Track) {
        self.tracks.push_back(track);
    }

    /// Saca la primera pista (FIFO). No consulta el modo.
    pub fn next(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Vacía la cola y devuelve cuántas pistas se eliminaron.
    pub fn clear(&mut self) -> usize {
        let removed = self.tracks.len();
        self.tracks.clear();
        debug!("🗑️ Cola limpiada ({} pistas)", removed);
        removed
    }

    /// Permutación uniforme (Fisher-Yates) de las pistas pendientes.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.tracks.make_contiguous().shuffle(rng);
        debug!("🔀 Cola mezclada ({} pistas)", self.tracks.len());
    }

    pub fn set_mode(&mut self, mode: QueueMode) {
        self.mode = mode;
        debug!("🔁 Modo de cola: {}", mode);
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn total_duration(&self) -> Duration {
        self.tracks.iter().map(Track::duration).sum()
    }

    /// Copia del estado para mostrarla sin retener el lock.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.tracks.iter().cloned().collect(),
            mode: self.mode,
            total_duration: self.total_duration(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub tracks: Vec<Track>,
    pub mode: QueueMode,
    pub total_duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn track(name: &str) -> Track {
        Track::new(name, format!("https://example.com/{}", name), 60_000)
    }

    fn titles(queue: &Queue) -> Vec<String> {
        queue.tracks().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn next_pops_in_insertion_order() {
        let mut queue = Queue::new();
        queue.add([track("t1"), track("t2")]).unwrap();
        queue.add([track("t3")]).unwrap();

        assert_eq!(queue.next().map(|t| t.title), Some("t1".to_string()));
        assert_eq!(queue.next().map(|t| t.title), Some("t2".to_string()));
        assert_eq!(queue.next().map(|t| t.title), Some("t3".to_string()));
        assert_eq!(queue.next(), None);
    }

    #[test]
    fn next_ignores_mode() {
        let mut queue = Queue::new();
        queue.set_mode(QueueMode::RepeatTrack);
        queue.add([track("a"), track("b")]).unwrap();

        assert_eq!(queue.next().map(|t| t.title), Some("a".to_string()));
        assert_eq!(titles(&queue), vec!["b"]);
    }

    #[test]
    fn clear_reports_removed_count() {
        let mut queue = Queue::new();
        queue.add([track("a"), track("b"), track("c")]).unwrap();

        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }

    #[test]
    fn capacity_limit_rejects_whole_batch() {
        let mut queue = Queue::with_capacity_limit(Some(2));
        queue.add([track("a")]).unwrap();

        let err = queue.add([track("b"), track("c")]).unwrap_err();
        assert_eq!(err, QueueError::QueueFull { max: 2 });
        assert_eq!(titles(&queue), vec!["a"]);

        assert_eq!(queue.add([track("b")]).unwrap(), 1);
    }

    #[test]
    fn shuffle_keeps_the_same_tracks() {
        let mut queue = Queue::new();
        let names: Vec<String> = (0..20).map(|i| format!("t{}", i)).collect();
        queue.add(names.iter().map(|n| track(n))).unwrap();

        queue.shuffle_with(&mut StdRng::seed_from_u64(7));

        let mut shuffled = titles(&queue);
        shuffled.sort();
        let mut expected = names.clone();
        expected.sort();
        assert_eq!(shuffled, expected);
    }

    #[test]
    fn shuffle_has_no_positional_bias() {
        const N: usize = 5;
        const ROUNDS: usize = 20_000;

        let mut rng = StdRng::seed_from_u64(42);
        // counts[track][position]
        let mut counts = [[0usize; N]; N];

        for _ in 0..ROUNDS {
            let mut queue = Queue::new();
            queue.add((0..N).map(|i| track(&i.to_string()))).unwrap();
            queue.shuffle_with(&mut rng);

            for (position, t) in queue.tracks().enumerate() {
                let index: usize = t.title.parse().unwrap();
                counts[index][position] += 1;
            }
        }

        let expected = ROUNDS as f64 / N as f64;
        for row in counts.iter() {
            for &count in row.iter() {
                let deviation = (count as f64 - expected).abs() / expected;
                assert!(deviation < 0.05, "bias detected: {:?}", counts);
            }
        }
    }

    #[test]
    fn mode_parsing_accepts_command_choices() {
        assert_eq!("default".parse::<QueueMode>().unwrap(), QueueMode::Normal);
        assert_eq!("Repeat-Track".parse::<QueueMode>().unwrap(), QueueMode::RepeatTrack);
        assert_eq!(" repeat-queue ".parse::<QueueMode>().unwrap(), QueueMode::RepeatQueue);

        for mode in QueueMode::ALL {
            assert_eq!(mode.as_str().parse::<QueueMode>().unwrap(), mode);
        }
    }

    #[test]
    fn mode_parsing_rejects_unknown_values() {
        assert_eq!(
            "turbo".parse::<QueueMode>(),
            Err(QueueError::InvalidMode("turbo".to_string()))
        );
        assert!("".parse::<QueueMode>().is_err());
        assert!("repeat".parse::<QueueMode>().is_err());
    }

    #[test]
    fn snapshot_reflects_pending_tracks() {
        let mut queue = Queue::new();
        queue.add([track("a"), track("b")]).unwrap();
        queue.set_mode(QueueMode::RepeatQueue);

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.tracks.len(), 2);
        assert_eq!(snapshot.mode, QueueMode::RepeatQueue);
        assert_eq!(snapshot.total_duration, Duration::from_secs(120));
    }
}
