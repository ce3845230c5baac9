//! Registro por guild del orquestador.
//!
//! Cada guild tiene exactamente un [`GuildHandle`], alcanzable solo a
//! través del registro: cola + sesión bajo un único lock asíncrono, el
//! contador de época de reproducción y los handles de las tareas de
//! fondo. La entrada se crea en el primer uso y se destruye de forma
//! explícita al desconectar el guild.

use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::queue::GuildQueue;
use crate::session::PlaybackSession;

/// Estado mutable de un guild: cola y sesión, siempre bajo el mismo lock
#[derive(Debug)]
pub struct GuildState {
    pub queue: GuildQueue,
    pub session: PlaybackSession,
}

/// Handle de una tarea de fondo cancelable
#[derive(Debug)]
pub struct TaskHandle {
    pub join: JoinHandle<()>,
    pub cancel: CancellationToken,
}

impl TaskHandle {
    /// Cancela la tarea; seguro de llamar más de una vez
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.join.abort();
    }
}

/// Registro de un guild dentro del orquestador
#[derive(Debug)]
pub struct GuildHandle {
    pub guild_id: GuildId,
    /// Serializa toda mutación de cola/sesión del guild, incluida la
    /// secuencia advance/on_sink_complete completa
    pub state: Mutex<GuildState>,
    /// Época de reproducción: cada arranque de sink la incrementa y las
    /// finalizaciones con época vieja se descartan
    epoch: AtomicU64,
    reconciler: parking_lot::Mutex<Option<TaskHandle>>,
    reaper: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl GuildHandle {
    fn new(guild_id: GuildId, config: &Config) -> Self {
        Self {
            guild_id,
            state: Mutex::new(GuildState {
                queue: GuildQueue::new(config.max_queue_size),
                session: PlaybackSession::new(config.default_volume),
            }),
            epoch: AtomicU64::new(0),
            reconciler: parking_lot::Mutex::new(None),
            reaper: parking_lot::Mutex::new(None),
        }
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalida cualquier finalización pendiente del sink anterior
    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn set_reconciler(&self, handle: TaskHandle) {
        if let Some(previous) = self.reconciler.lock().replace(handle) {
            previous.cancel();
        }
    }

    /// Si el loop del reconciliador sigue vivo
    pub fn reconciler_running(&self) -> bool {
        self.reconciler
            .lock()
            .as_ref()
            .map(|h| !h.join.is_finished())
            .unwrap_or(false)
    }

    /// Idempotente: sin efecto si no hay loop corriendo
    pub fn cancel_reconciler(&self) {
        if let Some(handle) = self.reconciler.lock().take() {
            handle.cancel();
            debug!("🛑 Reconciliador cancelado para guild {}", self.guild_id);
        }
    }

    /// Arma el reaper reemplazando cualquier timer anterior (gana el último)
    pub fn set_reaper(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.reaper.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn reaper_armed(&self) -> bool {
        self.reaper
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Idempotente: sin efecto si no hay timer armado
    pub fn cancel_reaper(&self) {
        if let Some(handle) = self.reaper.lock().take() {
            handle.abort();
            debug!("🛑 Timer de inactividad cancelado para guild {}", self.guild_id);
        }
    }

    /// Cancela ambas tareas de fondo; parte del teardown
    pub fn cancel_tasks(&self) {
        self.cancel_reconciler();
        self.cancel_reaper();
    }
}

/// Mapa global guild → estado, dueño del ciclo de vida de cada entrada
#[derive(Debug)]
pub struct GuildRegistry {
    guilds: DashMap<GuildId, Arc<GuildHandle>>,
    config: Config,
}

impl GuildRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            guilds: DashMap::new(),
            config,
        }
    }

    /// Entrada del guild, creándola en el primer uso
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildHandle> {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Registrando guild {}", guild_id);
                Arc::new(GuildHandle::new(guild_id, &self.config))
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildHandle>> {
        self.guilds.get(&guild_id).map(|entry| entry.clone())
    }

    /// Retira la entrada del guild y cancela sus tareas de fondo
    pub fn remove(&self, guild_id: GuildId) -> Option<Arc<GuildHandle>> {
        let (_, handle) = self.guilds.remove(&guild_id)?;
        handle.cancel_tasks();
        info!("🗑️ Guild {} retirado del registro", guild_id);
        Some(handle)
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.guilds.iter().map(|entry| *entry.key()).collect()
    }

    /// Teardown global al apagar el proceso
    pub fn shutdown(&self) {
        for guild_id in self.guild_ids() {
            self.remove(guild_id);
        }
    }
}
