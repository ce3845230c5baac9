//! Sink de voz sobre songbird.
//!
//! A velocidad normal el audio se streamea directo con el `YoutubeDl`
//! de songbird. Las demás velocidades se pre-transcodifican con
//! yt-dlp + ffmpeg (filtro `atempo`) a un archivo temporal que vive
//! mientras el track esté registrado.

use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{File as FileInput, Input, YoutubeDl},
    tracks::{PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::process::Stdio;
use std::sync::Arc;
use tempfile::TempPath;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};
use crate::sink::{AudioSink, SinkCallback, SinkParams};

/// Track activo y, si lo hay, el archivo transcodificado que lo respalda
struct ActiveTrack {
    handle: TrackHandle,
    _media: Option<TempPath>,
}

pub struct DiscordSink {
    songbird: Arc<Songbird>,
    http_client: reqwest::Client,
    tracks: DashMap<GuildId, ActiveTrack>,
}

impl DiscordSink {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self {
            songbird,
            http_client: reqwest::Client::new(),
            tracks: DashMap::new(),
        }
    }

    /// Une el bot al canal de voz indicado
    pub async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        self.songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| {
                PlaybackError::SinkStart(format!("no se pudo unir al canal de voz: {e}"))
            })?;
        debug!("🔊 Conectado al canal de voz {} de guild {}", channel_id, guild_id);
        Ok(())
    }

    fn track_handle(&self, guild_id: GuildId) -> Option<TrackHandle> {
        self.tracks.get(&guild_id).map(|active| active.handle.clone())
    }

    /// Descarga y re-muestrea el audio al `speed` pedido
    async fn transcode(&self, locator: &str, speed: f64) -> Result<TempPath> {
        let output = tempfile::Builder::new()
            .prefix("orquesta-")
            .suffix(".ogg")
            .tempfile()
            .map_err(|e| {
                PlaybackError::SinkStart(format!("no se pudo crear el archivo temporal: {e}"))
            })?
            .into_temp_path();

        let mut fetch = Command::new("yt-dlp")
            .args(["-f", "bestaudio/best", "--no-playlist", "--no-warnings", "-o", "-"])
            .arg(locator)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaybackError::SinkStart(format!("no se pudo lanzar yt-dlp: {e}")))?;

        let fetched: Stdio = fetch
            .stdout
            .take()
            .ok_or_else(|| PlaybackError::SinkStart("yt-dlp sin stdout".to_string()))?
            .try_into()
            .map_err(|e| PlaybackError::SinkStart(format!("pipe de yt-dlp inválido: {e}")))?;

        let status = Command::new("ffmpeg")
            .args(["-y", "-i", "pipe:0", "-vn", "-filter:a", &atempo_chain(speed), "-c:a", "libopus"])
            .arg(&*output)
            .stdin(fetched)
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| PlaybackError::SinkStart(format!("no se pudo lanzar ffmpeg: {e}")))?;

        let fetch_status = fetch
            .wait()
            .await
            .map_err(|e| PlaybackError::SinkStart(format!("yt-dlp no terminó: {e}")))?;

        if !status.success() || !fetch_status.success() {
            return Err(PlaybackError::SinkStart(format!(
                "la transcodificación de {locator} a {speed}x falló"
            )));
        }
        Ok(output)
    }
}

#[async_trait]
impl AudioSink for DiscordSink {
    async fn start(
        &self,
        guild_id: GuildId,
        locator: &str,
        params: SinkParams,
        on_end: SinkCallback,
    ) -> Result<()> {
        let call = self.songbird.get(guild_id).ok_or_else(|| {
            PlaybackError::SinkStart(format!("guild {guild_id} sin conexión de voz"))
        })?;

        let (input, media): (Input, Option<TempPath>) = if (params.speed - 1.0).abs() < f64::EPSILON
        {
            let ytdl = YoutubeDl::new(self.http_client.clone(), locator.to_string());
            (ytdl.into(), None)
        } else {
            let path = self.transcode(locator, params.speed).await?;
            (FileInput::new(path.to_path_buf()).into(), Some(path))
        };

        let mut call_lock = call.lock().await;
        let handle = call_lock.play_input(input);
        let _ = handle.set_volume(params.volume);

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                SinkEndHandler {
                    on_end: parking_lot::Mutex::new(Some(on_end)),
                },
            )
            .map_err(|e| PlaybackError::SinkStart(format!("no se pudo registrar el handler: {e}")))?;

        self.tracks.insert(guild_id, ActiveTrack { handle, _media: media });
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) {
        if let Some((_, active)) = self.tracks.remove(&guild_id) {
            let _ = active.handle.stop();
        }
    }

    async fn pause(&self, guild_id: GuildId) -> Result<()> {
        let handle = self
            .track_handle(guild_id)
            .ok_or(PlaybackError::NothingPlaying)?;
        handle.pause().map_err(|_| PlaybackError::NothingPlaying)
    }

    async fn resume(&self, guild_id: GuildId) -> Result<()> {
        let handle = self
            .track_handle(guild_id)
            .ok_or(PlaybackError::NothingPlaying)?;
        handle.play().map_err(|_| PlaybackError::NothingPlaying)
    }

    async fn is_connected(&self, guild_id: GuildId) -> bool {
        match self.songbird.get(guild_id) {
            Some(call) => call.lock().await.current_connection().is_some(),
            None => false,
        }
    }

    async fn is_playing(&self, guild_id: GuildId) -> bool {
        let Some(handle) = self.track_handle(guild_id) else {
            return false;
        };
        match handle.get_info().await {
            Ok(info) => matches!(info.playing, PlayMode::Play | PlayMode::Pause),
            Err(_) => false,
        }
    }

    async fn is_paused(&self, guild_id: GuildId) -> bool {
        let Some(handle) = self.track_handle(guild_id) else {
            return false;
        };
        match handle.get_info().await {
            Ok(info) => info.playing == PlayMode::Pause,
            Err(_) => false,
        }
    }

    async fn disconnect(&self, guild_id: GuildId) {
        self.tracks.remove(&guild_id);
        if let Err(e) = self.songbird.remove(guild_id).await {
            warn!("⚠️ No se pudo cerrar la conexión de voz de {}: {}", guild_id, e);
        }
    }
}

/// Dispara el callback de finalización una única vez por arranque
struct SinkEndHandler {
    on_end: parking_lot::Mutex<Option<SinkCallback>>,
}

#[async_trait]
impl VoiceEventHandler for SinkEndHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(frames) => frames.iter().find_map(|(state, _)| {
                match &state.playing {
                    PlayMode::Errored(e) => Some(e.to_string()),
                    _ => None,
                }
            }),
            _ => None,
        };

        if let Some(on_end) = self.on_end.lock().take() {
            on_end(error);
        }
        None
    }
}

/// Cadena de filtros `atempo` para el `speed` pedido
///
/// ffmpeg solo acepta factores en [0.5, 2.0]; por debajo de 0.5 se
/// encadenan mitades hasta entrar al rango.
fn atempo_chain(speed: f64) -> String {
    let mut factors = Vec::new();
    let mut rest = speed;
    while rest < 0.5 {
        factors.push(0.5);
        rest /= 0.5;
    }
    factors.push(rest);

    factors
        .iter()
        .map(|factor| format!("atempo={factor}"))
        .collect::<Vec<_>>()
        .join(",")
}
