use rand::seq::SliceRandom;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::error::{PlaybackError, Result};
use crate::track::Track;

/// Cola FIFO de tracks por guild
///
/// El orden de inserción es el orden de reproducción. Todas las
/// operaciones se aplican bajo el lock del guild dueño (ver registry),
/// por lo que la estructura en sí no necesita sincronización.
#[derive(Debug)]
pub struct GuildQueue {
    items: VecDeque<Track>,
    max_size: usize,
}

impl GuildQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Agrega un track al final de la cola
    pub fn enqueue(&mut self, track: Track) -> Result<()> {
        if self.items.len() >= self.max_size {
            return Err(PlaybackError::QueueFull(self.max_size));
        }

        info!("➕ Agregado a la cola: {}", track.title);
        self.items.push_back(track);
        Ok(())
    }

    /// Remueve y devuelve la cabeza de la cola
    pub fn dequeue(&mut self) -> Result<Track> {
        self.items.pop_front().ok_or(PlaybackError::EmptyQueue)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copia ordenada de solo lectura para mostrar la cola
    pub fn snapshot(&self) -> Vec<Track> {
        self.items.iter().cloned().collect()
    }

    /// Remueve el elemento en la posición 1-indexada `position`
    ///
    /// El resto de la cola conserva su orden relativo. Una posición
    /// fuera de `[1, len]` no altera la cola.
    pub fn remove_at(&mut self, position: usize) -> Result<Track> {
        if position == 0 || position > self.items.len() {
            return Err(PlaybackError::InvalidPosition {
                position,
                size: self.items.len(),
            });
        }

        // remove() de VecDeque preserva el orden relativo restante
        let removed = self
            .items
            .remove(position - 1)
            .ok_or(PlaybackError::InvalidPosition {
                position,
                size: self.items.len(),
            })?;

        debug!("❌ Track eliminado en posición {}: {}", position, removed.title);
        Ok(removed)
    }

    /// Mezcla la cola con una permutación uniforme
    pub fn shuffle(&mut self) {
        let mut items: Vec<_> = self.items.drain(..).collect();
        let mut rng = rand::thread_rng();
        items.shuffle(&mut rng);
        self.items.extend(items);
        info!("🔀 Cola mezclada ({} tracks)", self.items.len());
    }

    /// Vacía la cola y devuelve cuántos tracks se descartaron
    pub fn clear(&mut self) -> usize {
        let cleared = self.items.len();
        self.items.clear();
        info!("🗑️ Cola limpiada: {} tracks removidos", cleared);
        cleared
    }
}
