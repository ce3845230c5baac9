//! Renderizado del estado de reproducción.
//!
//! Produce [`StatusCard`]s neutrales al transporte; el adaptador de
//! display los convierte en embeds de Discord.

use std::time::Duration;

use crate::track::Track;

const DEFAULT_EMPTY_BAR: &str = "━━━━━━━━━━━━";

/// Contenido de un mensaje de estado, neutral al transporte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCard {
    pub title: String,
    pub body: String,
    pub thumbnail: Option<String>,
    pub url: Option<String>,
}

/// Barra de progreso con un marcador sobre la posición actual
///
/// Una duración total desconocida (cero) produce una barra vacía fija.
pub fn progress_bar(elapsed: Duration, total: Duration, width: usize) -> String {
    if total.is_zero() || width == 0 {
        return DEFAULT_EMPTY_BAR.to_string();
    }

    let progress = (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0);
    let filled = ((width as f64 * progress) as usize).min(width.saturating_sub(1));

    format!(
        "{}●{}",
        "━".repeat(filled),
        "━".repeat(width - filled - 1)
    )
}

/// Formatea una duración como `m:ss`, o `h:mm:ss` a partir de la hora
pub fn format_timestamp(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Tarjeta de "reproduciendo ahora" con progreso y tamaño de cola
pub fn now_playing_card(
    track: &Track,
    elapsed: Duration,
    queue_len: usize,
    paused: bool,
    bar_width: usize,
) -> StatusCard {
    let title = if paused {
        "⏸️ Reproducción Pausada".to_string()
    } else {
        "🎵 Reproduciendo Ahora".to_string()
    };

    let heading = match &track.url {
        Some(url) => format!("[{}]({})", track.title, url),
        None => format!("**{}**", track.title),
    };

    let bar = progress_bar(elapsed, track.duration, bar_width);
    let clock = if track.duration.is_zero() {
        "🔴 En vivo".to_string()
    } else {
        format!(
            "{} / {}",
            format_timestamp(elapsed.min(track.duration)),
            format_timestamp(track.duration)
        )
    };

    let body = format!(
        "{heading}\n\n{bar} {clock}\n\n📋 {queue_len} canciones en cola"
    );

    StatusCard {
        title,
        body,
        thumbnail: track.thumbnail.clone(),
        url: track.url.clone(),
    }
}

/// Aviso de "sin reproducción"
pub fn idle_card() -> StatusCard {
    StatusCard {
        title: "💤 Sin Reproducción".to_string(),
        body: "El bot no está reproduciendo nada en este momento.".to_string(),
        thumbnail: None,
        url: None,
    }
}
