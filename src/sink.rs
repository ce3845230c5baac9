use async_trait::async_trait;
use serenity::model::id::GuildId;

use crate::error::Result;

/// Parámetros con los que se (re)construye un sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkParams {
    pub speed: f64,
    pub volume: f32,
}

/// Callback de fin de reproducción, invocado exactamente una vez por
/// cada `start` exitoso, con el error del driver si lo hubo
pub type SinkCallback = Box<dyn FnOnce(Option<String>) + Send + 'static>;

/// Driver de salida de audio de un guild
///
/// Opaco para el núcleo: solo arranque/parada/pausa y la señal de
/// finalización. La implementación de producción vive en
/// [`crate::discord::sink`].
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Arranca la reproducción de `locator` con los parámetros dados
    ///
    /// `on_end` debe dispararse exactamente una vez cuando el driver
    /// termine, sea de forma natural o por un `stop` manual.
    async fn start(
        &self,
        guild_id: GuildId,
        locator: &str,
        params: SinkParams,
        on_end: SinkCallback,
    ) -> Result<()>;

    /// Detiene la reproducción actual; sin efecto si no hay ninguna
    async fn stop(&self, guild_id: GuildId);

    async fn pause(&self, guild_id: GuildId) -> Result<()>;

    async fn resume(&self, guild_id: GuildId) -> Result<()>;

    /// Si el guild tiene una conexión de voz viva
    async fn is_connected(&self, guild_id: GuildId) -> bool;

    /// Si hay audio fluyendo en este momento
    async fn is_playing(&self, guild_id: GuildId) -> bool;

    /// Si la reproducción está suspendida en pausa
    async fn is_paused(&self, guild_id: GuildId) -> bool;

    /// Corta la conexión de voz del guild y libera sus recursos
    async fn disconnect(&self, guild_id: GuildId);
}
