use async_trait::async_trait;
use serenity::model::id::GuildId;

use crate::error::Result;
use crate::ui::StatusCard;

/// Referencia opaca a un mensaje publicado en el canal de estado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub u64);

/// Canal donde se publica el estado de reproducción de un guild
///
/// Las operaciones sobre mensajes pueden fallar con
/// [`crate::error::PlaybackError::DisplayNotFound`] si el mensaje fue
/// borrado externamente; el reconciliador se recupera reenviando.
#[async_trait]
pub trait DisplayChannel: Send + Sync {
    async fn send(&self, guild_id: GuildId, card: &StatusCard) -> Result<MessageRef>;

    async fn edit(&self, guild_id: GuildId, message: MessageRef, card: &StatusCard) -> Result<()>;

    async fn delete(&self, guild_id: GuildId, message: MessageRef) -> Result<()>;

    /// Verifica que el mensaje siga existiendo y sea alcanzable
    async fn fetch(&self, guild_id: GuildId, message: MessageRef) -> Result<()>;

    /// Refleja la reproducción en la presencia del bot
    async fn set_presence(&self, listening_to: Option<&str>);
}
