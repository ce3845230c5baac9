//! Dobles de prueba para los colaboradores externos.

use async_trait::async_trait;
use serenity::model::id::GuildId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::display::{DisplayChannel, MessageRef};
use crate::error::{PlaybackError, Result};
use crate::sink::{AudioSink, SinkCallback, SinkParams};
use crate::ui::StatusCard;

/// Da tiempo a que corran las tareas disparadas por los callbacks
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}

/// Sink falso: registra arranques y deja disparar finalizaciones a mano
#[derive(Default)]
pub struct FakeSink {
    connected: AtomicBool,
    playing: AtomicBool,
    paused: AtomicBool,
    fail_next_start: AtomicBool,
    fail_next_pause: AtomicBool,
    fail_next_resume: AtomicBool,
    starts: Mutex<Vec<(GuildId, String, SinkParams)>>,
    callbacks: Mutex<Vec<SinkCallback>>,
    stop_count: AtomicUsize,
    pause_count: AtomicUsize,
    resume_count: AtomicUsize,
    disconnect_count: AtomicUsize,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// El próximo `start` fallará con `SinkStart`
    pub fn fail_next_start(&self) {
        self.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// El próximo `pause` fallará sin tocar el estado del sink
    pub fn fail_next_pause(&self) {
        self.fail_next_pause.store(true, Ordering::SeqCst);
    }

    /// El próximo `resume` fallará sin tocar el estado del sink
    pub fn fail_next_resume(&self) {
        self.fail_next_resume.store(true, Ordering::SeqCst);
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn started_locators(&self) -> Vec<String> {
        self.starts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, locator, _)| locator.clone())
            .collect()
    }

    pub fn last_params(&self) -> Option<SinkParams> {
        self.starts.lock().unwrap().last().map(|(_, _, p)| *p)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    pub fn pause_count(&self) -> usize {
        self.pause_count.load(Ordering::SeqCst)
    }

    pub fn resume_count(&self) -> usize {
        self.resume_count.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnect_count.load(Ordering::SeqCst)
    }

    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    /// Dispara la finalización del último arranque registrado
    pub fn complete_last(&self, error: Option<String>) {
        let callback = self
            .callbacks
            .lock()
            .unwrap()
            .pop()
            .expect("no hay arranque pendiente de completar");
        self.playing.store(false, Ordering::SeqCst);
        callback(error);
    }

    /// Dispara la finalización más antigua aún pendiente
    pub fn complete_oldest(&self, error: Option<String>) {
        let callback = {
            let mut callbacks = self.callbacks.lock().unwrap();
            if callbacks.is_empty() {
                panic!("no hay arranque pendiente de completar");
            }
            callbacks.remove(0)
        };
        self.playing.store(false, Ordering::SeqCst);
        callback(error);
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn start(
        &self,
        guild_id: GuildId,
        locator: &str,
        params: SinkParams,
        on_end: SinkCallback,
    ) -> Result<()> {
        if self.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::SinkStart("fallo simulado".to_string()));
        }
        self.starts
            .lock()
            .unwrap()
            .push((guild_id, locator.to_string(), params));
        self.callbacks.lock().unwrap().push(on_end);
        self.connected.store(true, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _guild_id: GuildId) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    async fn pause(&self, _guild_id: GuildId) -> Result<()> {
        if self.fail_next_pause.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::NothingPlaying);
        }
        self.pause_count.fetch_add(1, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self, _guild_id: GuildId) -> Result<()> {
        if self.fail_next_resume.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::NothingPlaying);
        }
        self.resume_count.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self, _guild_id: GuildId) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn is_playing(&self, _guild_id: GuildId) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    async fn is_paused(&self, _guild_id: GuildId) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    async fn disconnect(&self, _guild_id: GuildId) {
        self.connected.store(false, Ordering::SeqCst);
        self.disconnect_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Canal de display falso con mensajes "vivos" que se pueden olvidar
#[derive(Default)]
pub struct FakeDisplay {
    next_id: AtomicU64,
    existing: Mutex<HashSet<u64>>,
    sent: Mutex<Vec<(GuildId, StatusCard)>>,
    edit_count: AtomicUsize,
    delete_count: AtomicUsize,
    presence: Mutex<Option<String>>,
}

impl FakeDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_sent(&self) -> Option<StatusCard> {
        self.sent.lock().unwrap().last().map(|(_, card)| card.clone())
    }

    pub fn edit_count(&self) -> usize {
        self.edit_count.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.delete_count.load(Ordering::SeqCst)
    }

    pub fn presence(&self) -> Option<String> {
        self.presence.lock().unwrap().clone()
    }

    /// Simula el borrado externo del mensaje
    pub fn forget(&self, message: MessageRef) {
        self.existing.lock().unwrap().remove(&message.0);
    }
}

#[async_trait]
impl DisplayChannel for FakeDisplay {
    async fn send(&self, guild_id: GuildId, card: &StatusCard) -> Result<MessageRef> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.existing.lock().unwrap().insert(id);
        self.sent.lock().unwrap().push((guild_id, card.clone()));
        Ok(MessageRef(id))
    }

    async fn edit(&self, _guild_id: GuildId, message: MessageRef, _card: &StatusCard) -> Result<()> {
        if !self.existing.lock().unwrap().contains(&message.0) {
            return Err(PlaybackError::DisplayNotFound);
        }
        self.edit_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, _guild_id: GuildId, message: MessageRef) -> Result<()> {
        if !self.existing.lock().unwrap().remove(&message.0) {
            return Err(PlaybackError::DisplayNotFound);
        }
        self.delete_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch(&self, _guild_id: GuildId, message: MessageRef) -> Result<()> {
        if self.existing.lock().unwrap().contains(&message.0) {
            Ok(())
        } else {
            Err(PlaybackError::DisplayNotFound)
        }
    }

    async fn set_presence(&self, listening_to: Option<&str>) {
        *self.presence.lock().unwrap() = listening_to.map(str::to_string);
    }
}
