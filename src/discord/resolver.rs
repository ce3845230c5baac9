//! Resolución de consultas con yt-dlp.
//!
//! Una URL se resuelve tal cual (incluidas playlists, acotadas a
//! `max_items`); cualquier otro texto se convierte en una búsqueda que
//! toma el primer resultado. yt-dlp emite un objeto JSON por línea y
//! las líneas ilegibles se descartan en silencio.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{PlaybackError, Result};
use crate::resolver::SourceResolver;
use crate::track::Track;

pub struct YtDlpResolver {
    max_items: usize,
}

impl YtDlpResolver {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<Vec<Track>> {
        let target = resolve_target(query);
        debug!("🔍 Resolviendo: {}", target);

        let output = Command::new("yt-dlp")
            .args(["--dump-json", "--no-warnings", "--playlist-end"])
            .arg(self.max_items.to_string())
            .arg(&target)
            .output()
            .await
            .map_err(|e| {
                PlaybackError::UnresolvableSource(format!("{query}: no se pudo lanzar yt-dlp: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlaybackError::UnresolvableSource(format!(
                "{query}: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let tracks = stdout
            .lines()
            .filter_map(|line| serde_json::from_str::<YtDlpEntry>(line).ok())
            .map(YtDlpEntry::into_track)
            .collect();

        Ok(tracks)
    }
}

fn resolve_target(query: &str) -> String {
    if query.starts_with("http://") || query.starts_with("https://") {
        query.to_string()
    } else {
        format!("ytsearch1:{query}")
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    is_live: Option<bool>,
}

impl YtDlpEntry {
    fn into_track(self) -> Track {
        let locator = self
            .webpage_url
            .or(self.url)
            .unwrap_or_default();
        let title = self.title.unwrap_or_else(|| "Desconocido".to_string());

        let mut track = Track::new(title, locator.clone());
        // Los streams en vivo quedan sin duración conocida
        if !self.is_live.unwrap_or(false) {
            if let Some(seconds) = self.duration {
                track = track.with_duration_secs(seconds as u64);
            }
        }
        if let Some(thumbnail) = self.thumbnail {
            track = track.with_thumbnail(thumbnail);
        }
        if !locator.is_empty() {
            track = track.with_url(locator);
        }
        track
    }
}
