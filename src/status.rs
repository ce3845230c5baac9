//! Reconciliador del mensaje de "reproduciendo ahora".
//!
//! Un loop por guild recalcula el progreso en cada tick y mantiene un
//! único mensaje de estado vivo: edita en el lugar, reenvía si el
//! mensaje fue borrado externamente y, al quedar en Idle, borra la
//! tarjeta vieja y publica el aviso de inactividad una sola vez.

#[cfg(test)]
use serenity::model::id::GuildId;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::display::DisplayChannel;
use crate::error::PlaybackError;
use crate::registry::{GuildHandle, TaskHandle};
use crate::session::{LiveMessage, PlaybackState};
use crate::ui;

/// Arranca el loop periódico del reconciliador para un guild
pub(crate) fn spawn(
    handle: Arc<GuildHandle>,
    display: Arc<dyn DisplayChannel>,
    period: Duration,
    bar_width: usize,
) -> TaskHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let guild_id = handle.guild_id;

    let join = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // El primer tick de interval es inmediato; el mensaje inicial ya
        // lo publicó quien arrancó la reproducción.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("🛑 Loop de estado terminado para guild {}", guild_id);
                    break;
                }
                _ = interval.tick() => {
                    reconcile_tick(&handle, &display, true, bar_width).await;
                }
            }
        }
    });

    TaskHandle { join, cancel }
}

/// Un paso de reconciliación del mensaje de estado
///
/// `silent` distingue los ticks de fondo de una petición explícita del
/// usuario: solo la segunda fuerza un aviso de inactividad fresco.
/// Toma el lock del guild, de modo que comparte la serialización con
/// los comandos que también tocan el mensaje vivo.
pub(crate) async fn reconcile_tick(
    handle: &Arc<GuildHandle>,
    display: &Arc<dyn DisplayChannel>,
    silent: bool,
    bar_width: usize,
) {
    let guild_id = handle.guild_id;
    let mut state = handle.state.lock().await;

    match state.session.status() {
        PlaybackState::Playing | PlaybackState::Paused => {
            let Some(track) = state.session.current().cloned() else {
                return;
            };
            let card = ui::now_playing_card(
                &track,
                state.session.elapsed(),
                state.queue.len(),
                state.session.status() == PlaybackState::Paused,
                bar_width,
            );

            if !silent {
                // Petición de usuario: mensaje fresco al final del canal
                if let Some(live) = state.session.live_message.take() {
                    let _ = display.delete(guild_id, live.message_ref()).await;
                }
            }

            match state.session.live_message {
                Some(live) => match display.edit(guild_id, live.message_ref(), &card).await {
                    Ok(()) => {
                        state.session.live_message = Some(LiveMessage::NowPlaying(live.message_ref()));
                    }
                    Err(PlaybackError::DisplayNotFound) => {
                        // Borrado externamente: reenviar y adoptar el reemplazo
                        debug!("📨 Mensaje de estado perdido en guild {}, reenviando", guild_id);
                        state.session.live_message = display
                            .send(guild_id, &card)
                            .await
                            .map(LiveMessage::NowPlaying)
                            .ok();
                    }
                    Err(e) => warn!("⚠️ No se pudo editar el estado de guild {}: {}", guild_id, e),
                },
                None => {
                    state.session.live_message = display
                        .send(guild_id, &card)
                        .await
                        .map(LiveMessage::NowPlaying)
                        .ok();
                }
            }
            state.session.idle_notified = false;
        }
        PlaybackState::Idle => {
            // Retirar la tarjeta de reproducción obsoleta, si sigue viva
            if let Some(LiveMessage::NowPlaying(message)) = state.session.live_message {
                if display.fetch(guild_id, message).await.is_ok() {
                    let _ = display.delete(guild_id, message).await;
                }
                state.session.live_message = None;
            }

            if silent && state.session.idle_notified {
                return;
            }

            if !silent {
                if let Some(live) = state.session.live_message.take() {
                    let _ = display.delete(guild_id, live.message_ref()).await;
                }
            } else if state.session.live_message.is_some() {
                return;
            }

            state.session.live_message = display
                .send(guild_id, &ui::idle_card())
                .await
                .map(LiveMessage::IdleNotice)
                .ok();
            state.session.idle_notified = true;
        }
    }
}
