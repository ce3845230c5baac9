//! Controlador de reproducción.
//!
//! Avanza la cola hacia la sesión, arranca y detiene el sink y
//! reacciona a las finalizaciones. Toda la secuencia
//! `advance`/`on_sink_complete`/hot-swap de un guild corre bajo el lock
//! de ese guild: dos avances concurrentes jamás pueden arrancar dos
//! sinks. Las finalizaciones de sinks ya reemplazados (stop manual,
//! hot-swap) llegan con una época vieja y se descartan.

use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::display::DisplayChannel;
use crate::error::{PlaybackError, Result};
use crate::reaper;
use crate::registry::{GuildHandle, GuildRegistry, GuildState};
use crate::resolver::SourceResolver;
use crate::session::PlaybackState;
use crate::sink::{AudioSink, SinkCallback, SinkParams};
use crate::status;
use crate::track::Track;

#[derive(Clone)]
pub struct Player {
    registry: Arc<GuildRegistry>,
    sink: Arc<dyn AudioSink>,
    display: Arc<dyn DisplayChannel>,
    resolver: Arc<dyn SourceResolver>,
    config: Arc<Config>,
}

impl Player {
    pub fn new(
        config: Config,
        sink: Arc<dyn AudioSink>,
        display: Arc<dyn DisplayChannel>,
        resolver: Arc<dyn SourceResolver>,
    ) -> Self {
        Self {
            registry: Arc::new(GuildRegistry::new(config.clone())),
            sink,
            display,
            resolver,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<GuildRegistry> {
        &self.registry
    }

    /// Resuelve `query` y encola el resultado, arrancando si hay silencio
    ///
    /// El resolver puede suspender largo rato; se espera siempre fuera
    /// del lock del guild.
    pub async fn play(&self, guild_id: GuildId, query: &str) -> Result<usize> {
        let mut tracks = self.resolver.resolve(query).await?;
        if tracks.is_empty() {
            return Err(PlaybackError::UnresolvableSource(query.to_string()));
        }
        if tracks.len() > self.config.max_playlist_size {
            warn!(
                "⚠️ Playlist de {} tracks truncada a {}",
                tracks.len(),
                self.config.max_playlist_size
            );
            tracks.truncate(self.config.max_playlist_size);
        }

        self.enqueue_and_maybe_start(guild_id, tracks).await
    }

    /// Encola los tracks y dispara el avance si la sesión está en Idle
    ///
    /// Devuelve cuántos tracks entraron efectivamente en la cola.
    pub async fn enqueue_and_maybe_start(
        &self,
        guild_id: GuildId,
        tracks: Vec<Track>,
    ) -> Result<usize> {
        if tracks.is_empty() {
            return Ok(0);
        }

        let handle = self.registry.get_or_create(guild_id);
        let mut state = handle.state.lock().await;

        let mut added = 0usize;
        for track in tracks {
            match state.queue.enqueue(track) {
                Ok(()) => added += 1,
                Err(PlaybackError::QueueFull(max)) => {
                    warn!("⚠️ Cola de guild {} llena ({} tracks), truncando", guild_id, max);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if added == 0 {
            return Err(PlaybackError::QueueFull(self.config.max_queue_size));
        }

        if state.session.status() == PlaybackState::Idle {
            self.advance_locked(&handle, &mut state).await?;
        }

        Ok(added)
    }

    /// Punto de entrada de la señal de finalización del sink
    ///
    /// El error del driver, si lo hay, se reporta pero no detiene el
    /// avance de la cola.
    pub async fn on_sink_complete(&self, guild_id: GuildId, error: Option<String>) {
        let Some(handle) = self.registry.get(guild_id) else {
            return;
        };
        let epoch = handle.current_epoch();
        self.sink_completed(guild_id, epoch, error).await;
    }

    /// Detiene todo: cola limpia, sink parado sin avance, estado Idle
    pub async fn stop(&self, guild_id: GuildId) -> Result<()> {
        let Some(handle) = self.registry.get(guild_id) else {
            return Ok(());
        };
        let mut state = handle.state.lock().await;

        state.queue.clear();
        // La finalización del sink parado llegará con época vieja y no
        // debe re-disparar el avance.
        handle.bump_epoch();
        self.sink.stop(guild_id).await;
        handle.cancel_reconciler();

        if let Some(live) = state.session.live_message.take() {
            let _ = self.display.delete(guild_id, live.message_ref()).await;
        }
        state.session.mark_idle();
        self.display.set_presence(None).await;
        reaper::arm(
            self.registry.clone(),
            self.sink.clone(),
            guild_id,
            self.config.idle_timeout(),
        );

        info!("⏹️ Reproducción detenida en guild {}", guild_id);
        Ok(())
    }

    /// Salta el track actual; la finalización normal dispara el avance
    pub async fn skip(&self, guild_id: GuildId) -> Result<()> {
        let handle = self
            .registry
            .get(guild_id)
            .ok_or(PlaybackError::NothingPlaying)?;
        let state = handle.state.lock().await;
        if state.session.status() == PlaybackState::Idle {
            return Err(PlaybackError::NothingPlaying);
        }

        self.sink.stop(guild_id).await;
        info!("⏭️ Track saltado en guild {}", guild_id);
        Ok(())
    }

    /// Pausa el sink y recién entonces congela la sesión
    ///
    /// Si el sink falla, la sesión sigue en Playing y el reloj no se
    /// congela sobre audio que sigue sonando.
    pub async fn pause(&self, guild_id: GuildId) -> Result<()> {
        let handle = self
            .registry
            .get(guild_id)
            .ok_or(PlaybackError::NothingPlaying)?;
        let mut state = handle.state.lock().await;

        if state.session.status() != PlaybackState::Playing {
            return Err(PlaybackError::NothingPlaying);
        }
        self.sink.pause(guild_id).await?;
        state.session.pause()
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<()> {
        let handle = self
            .registry
            .get(guild_id)
            .ok_or(PlaybackError::NothingPlaying)?;
        let mut state = handle.state.lock().await;

        if state.session.status() != PlaybackState::Paused {
            return Err(PlaybackError::NothingPlaying);
        }
        self.sink.resume(guild_id).await?;
        state.session.resume()
    }

    /// Fija el volumen; en plena reproducción reconstruye el sink
    pub async fn set_volume(&self, guild_id: GuildId, volume: f32) -> Result<f32> {
        let handle = self.registry.get_or_create(guild_id);
        let mut state = handle.state.lock().await;

        // Valida sin tocar nada más; fuera de dominio no altera estado
        state.session.set_volume(volume)?;

        if state.session.status() == PlaybackState::Playing {
            self.hot_swap_locked(&handle, &mut state).await?;
        }
        Ok(volume)
    }

    /// Sube un paso de velocidad; en reproducción implica hot-swap
    pub async fn speed_up(&self, guild_id: GuildId) -> Result<f64> {
        let handle = self.registry.get_or_create(guild_id);
        let mut state = handle.state.lock().await;

        let speed = state.session.speed_up()?;
        if state.session.status() == PlaybackState::Playing {
            self.hot_swap_locked(&handle, &mut state).await?;
        }
        Ok(speed)
    }

    /// Baja un paso de velocidad; en reproducción implica hot-swap
    pub async fn speed_down(&self, guild_id: GuildId) -> Result<f64> {
        let handle = self.registry.get_or_create(guild_id);
        let mut state = handle.state.lock().await;

        let speed = state.session.speed_down()?;
        if state.session.status() == PlaybackState::Playing {
            self.hot_swap_locked(&handle, &mut state).await?;
        }
        Ok(speed)
    }

    pub async fn toggle_loop(&self, guild_id: GuildId) -> bool {
        let handle = self.registry.get_or_create(guild_id);
        let mut state = handle.state.lock().await;
        state.session.toggle_loop()
    }

    pub async fn current_track(&self, guild_id: GuildId) -> Option<Track> {
        let handle = self.registry.get(guild_id)?;
        let state = handle.state.lock().await;
        state.session.current().cloned()
    }

    pub async fn queue_snapshot(&self, guild_id: GuildId) -> Vec<Track> {
        match self.registry.get(guild_id) {
            Some(handle) => handle.state.lock().await.queue.snapshot(),
            None => Vec::new(),
        }
    }

    /// Remueve el track en la posición 1-indexada `position`
    pub async fn remove_track(&self, guild_id: GuildId, position: usize) -> Result<Track> {
        let handle = self
            .registry
            .get(guild_id)
            .ok_or(PlaybackError::InvalidPosition { position, size: 0 })?;
        let mut state = handle.state.lock().await;
        state.queue.remove_at(position)
    }

    pub async fn shuffle(&self, guild_id: GuildId) -> Result<()> {
        let handle = self
            .registry
            .get(guild_id)
            .ok_or(PlaybackError::EmptyQueue)?;
        let mut state = handle.state.lock().await;
        if state.queue.is_empty() {
            return Err(PlaybackError::EmptyQueue);
        }
        state.queue.shuffle();
        Ok(())
    }

    pub async fn clear_queue(&self, guild_id: GuildId) -> usize {
        match self.registry.get(guild_id) {
            Some(handle) => handle.state.lock().await.queue.clear(),
            None => 0,
        }
    }

    /// Publica un mensaje de estado fresco a pedido del usuario
    pub async fn publish_status(&self, guild_id: GuildId) {
        let handle = self.registry.get_or_create(guild_id);
        status::reconcile_tick(&handle, &self.display, false, self.config.progress_bar_width).await;

        let playing = {
            let state = handle.state.lock().await;
            state.session.status() != PlaybackState::Idle
        };
        if playing {
            self.ensure_reconciler(&handle);
        }
    }

    /// Desconecta el guild y destruye su entrada en el registro
    pub async fn disconnect(&self, guild_id: GuildId) {
        if let Some(handle) = self.registry.get(guild_id) {
            let mut state = handle.state.lock().await;
            state.queue.clear();
            handle.bump_epoch();
            state.session.mark_idle();
        }
        self.sink.stop(guild_id).await;
        self.sink.disconnect(guild_id).await;
        self.display.set_presence(None).await;
        self.registry.remove(guild_id);
        info!("👋 Guild {} desconectado", guild_id);
    }

    /// Teardown de todos los guilds al apagar el proceso
    pub async fn shutdown(&self) {
        for guild_id in self.registry.guild_ids() {
            self.disconnect(guild_id).await;
        }
    }

    // ------------------------------------------------------------------
    // Internos: siempre con el lock del guild ya tomado
    // ------------------------------------------------------------------

    /// Avanza la cola hacia la sesión
    ///
    /// Cola vacía es la transición normal a Idle, no un error: publica
    /// la presencia inactiva y arma el timer del reaper. Con cola, el
    /// fallo de arranque del sink deja la sesión en Idle y se reporta
    /// sin reintentos, para no enmascarar fallas sistémicas como saltos
    /// en cadena.
    async fn advance_locked(
        &self,
        handle: &Arc<GuildHandle>,
        state: &mut GuildState,
    ) -> Result<()> {
        let guild_id = handle.guild_id;

        let track = match state.queue.dequeue() {
            Ok(track) => track,
            Err(PlaybackError::EmptyQueue) => {
                debug!("📭 Cola vacía en guild {}, pasando a Idle", guild_id);
                state.session.mark_idle();
                self.display.set_presence(None).await;
                reaper::arm(
                    self.registry.clone(),
                    self.sink.clone(),
                    guild_id,
                    self.config.idle_timeout(),
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let epoch = handle.bump_epoch();
        let params = SinkParams {
            speed: state.session.speed(),
            volume: state.session.volume(),
        };
        let on_end = self.completion_callback(guild_id, epoch);

        if let Err(e) = self.sink.start(guild_id, &track.locator, params, on_end).await {
            error!("❌ El sink de guild {} no pudo arrancar: {}", guild_id, e);
            state.session.mark_idle();
            return Err(e);
        }

        let title = track.title.clone();
        state.session.begin(track);
        handle.cancel_reaper();
        self.display.set_presence(Some(&title)).await;
        self.ensure_reconciler(handle);
        Ok(())
    }

    /// Reconstruye el sink del track actual con los parámetros vigentes
    ///
    /// No es una finalización natural: la época se incrementa antes de
    /// parar, de modo que el callback del sink viejo no re-dispare el
    /// avance, y el item no se re-encola ni reselecciona. El origen del
    /// tiempo transcurrido vuelve a "ahora".
    async fn hot_swap_locked(
        &self,
        handle: &Arc<GuildHandle>,
        state: &mut GuildState,
    ) -> Result<()> {
        let guild_id = handle.guild_id;
        let track = state
            .session
            .current()
            .cloned()
            .ok_or(PlaybackError::NothingPlaying)?;

        let epoch = handle.bump_epoch();
        self.sink.stop(guild_id).await;

        let params = SinkParams {
            speed: state.session.speed(),
            volume: state.session.volume(),
        };
        let on_end = self.completion_callback(guild_id, epoch);

        if let Err(e) = self.sink.start(guild_id, &track.locator, params, on_end).await {
            error!("❌ Hot-swap falló en guild {}: {}", guild_id, e);
            state.session.mark_idle();
            return Err(e);
        }

        state.session.restart_origin();
        debug!(
            "🔄 Sink de guild {} reconstruido ({}x, vol {})",
            guild_id, params.speed, params.volume
        );
        Ok(())
    }

    /// Reacción a la finalización del sink, filtrada por época
    async fn sink_completed(&self, guild_id: GuildId, epoch: u64, error: Option<String>) {
        let Some(handle) = self.registry.get(guild_id) else {
            return;
        };
        let mut state = handle.state.lock().await;

        if epoch != handle.current_epoch() {
            debug!(
                "🕳️ Finalización obsoleta descartada en guild {} (época {} ≠ {})",
                guild_id,
                epoch,
                handle.current_epoch()
            );
            return;
        }

        if let Some(err) = error {
            // Se reporta, pero la cola avanza igual
            error!("❌ El sink de guild {} reportó un error: {}", guild_id, err);
        }

        // Con loop activo el track recién terminado vuelve al final de
        // la cola antes de seleccionar el siguiente (round-robin).
        if state.session.looping() {
            if let Some(finished) = state.session.take_current() {
                if let Err(e) = state.queue.enqueue(finished) {
                    warn!("⚠️ No se pudo re-encolar el track en loop: {}", e);
                }
            }
        }

        if let Err(e) = self.advance_locked(&handle, &mut state).await {
            error!("❌ No se pudo avanzar la cola de guild {}: {}", guild_id, e);
        }
    }

    /// Callback de finalización para un arranque de sink concreto
    fn completion_callback(&self, guild_id: GuildId, epoch: u64) -> SinkCallback {
        let player = self.clone();
        Box::new(move |error| {
            tokio::spawn(async move {
                player.sink_completed(guild_id, epoch, error).await;
            });
        })
    }

    /// Arranca el loop de estado del guild si no está ya corriendo
    fn ensure_reconciler(&self, handle: &Arc<GuildHandle>) {
        if handle.reconciler_running() {
            return;
        }
        let task = status::spawn(
            handle.clone(),
            self.display.clone(),
            self.config.nowplaying_period(),
            self.config.progress_bar_width,
        );
        handle.set_reconciler(task);
    }
}
