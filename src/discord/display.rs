//! Canal de estado sobre serenity.
//!
//! Publica las tarjetas de estado como embeds en el canal de texto
//! vinculado a cada guild y refleja el track actual en la presencia
//! del gateway. Un 404 de la API se traduce a `DisplayNotFound` para
//! que el reconciliador reenvíe en lugar de rendirse.

use async_trait::async_trait;
use dashmap::DashMap;
use serenity::builder::{CreateEmbed, CreateEmbedFooter, CreateMessage, EditMessage};
use serenity::gateway::{ActivityData, ShardMessenger};
use serenity::http::{Http, HttpError, StatusCode};
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::model::user::OnlineStatus;
use serenity::model::Timestamp;
use std::sync::Arc;
use tracing::debug;

use crate::display::{DisplayChannel, MessageRef};
use crate::error::{PlaybackError, Result};
use crate::ui::StatusCard;

/// Paleta de colores de los embeds
mod colors {
    use serenity::model::Colour;

    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

const STANDARD_FOOTER: &str = "🎵 Orquesta";

pub struct DiscordDisplay {
    http: Arc<Http>,
    shard: ShardMessenger,
    channels: DashMap<GuildId, ChannelId>,
}

impl DiscordDisplay {
    pub fn new(http: Arc<Http>, shard: ShardMessenger) -> Self {
        Self {
            http,
            shard,
            channels: DashMap::new(),
        }
    }

    /// Vincula el canal de texto donde publicar el estado del guild
    pub fn bind(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.channels.insert(guild_id, channel_id);
        debug!("📨 Canal de estado de guild {} vinculado a {}", guild_id, channel_id);
    }

    fn channel_of(&self, guild_id: GuildId) -> Result<ChannelId> {
        self.channels
            .get(&guild_id)
            .map(|channel| *channel)
            .ok_or_else(|| {
                PlaybackError::Display(format!("guild {guild_id} sin canal de estado vinculado"))
            })
    }
}

#[async_trait]
impl DisplayChannel for DiscordDisplay {
    async fn send(&self, guild_id: GuildId, card: &StatusCard) -> Result<MessageRef> {
        let channel = self.channel_of(guild_id)?;
        let message = channel
            .send_message(&self.http, CreateMessage::new().embed(card_embed(card)))
            .await
            .map_err(map_api_error)?;
        Ok(MessageRef(message.id.get()))
    }

    async fn edit(&self, guild_id: GuildId, message: MessageRef, card: &StatusCard) -> Result<()> {
        let channel = self.channel_of(guild_id)?;
        channel
            .edit_message(
                &self.http,
                MessageId::new(message.0),
                EditMessage::new().embed(card_embed(card)),
            )
            .await
            .map_err(map_api_error)?;
        Ok(())
    }

    async fn delete(&self, guild_id: GuildId, message: MessageRef) -> Result<()> {
        let channel = self.channel_of(guild_id)?;
        channel
            .delete_message(&self.http, MessageId::new(message.0))
            .await
            .map_err(map_api_error)
    }

    async fn fetch(&self, guild_id: GuildId, message: MessageRef) -> Result<()> {
        let channel = self.channel_of(guild_id)?;
        channel
            .message(&self.http, MessageId::new(message.0))
            .await
            .map_err(map_api_error)?;
        Ok(())
    }

    async fn set_presence(&self, listening_to: Option<&str>) {
        let activity = listening_to.map(ActivityData::listening);
        self.shard.set_presence(activity, OnlineStatus::Online);
    }
}

fn card_embed(card: &StatusCard) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(&card.title)
        .description(&card.body)
        .color(colors::MUSIC_PURPLE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER));

    if let Some(thumbnail) = &card.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    if let Some(url) = &card.url {
        embed = embed.url(url);
    }
    embed
}

fn map_api_error(error: serenity::Error) -> PlaybackError {
    match &error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if response.status_code == StatusCode::NOT_FOUND =>
        {
            PlaybackError::DisplayNotFound
        }
        _ => PlaybackError::Display(error.to_string()),
    }
}
