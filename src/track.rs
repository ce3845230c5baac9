use chrono::{DateTime, Utc};
use std::time::Duration;

/// Representa una unidad reproducible ya resuelta
///
/// Inmutable una vez construido; la cola o la sesión que lo contiene
/// es su único dueño.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    /// Localizador opaco para el sink (URL de stream, id, etc.)
    pub locator: String,
    /// Duración total; `Duration::ZERO` significa desconocida o en vivo
    pub duration: Duration,
    pub thumbnail: Option<String>,
    /// URL presentable en el mensaje de estado
    pub url: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(title: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            locator: locator.into(),
            duration: Duration::ZERO,
            thumbnail: None,
            url: None,
            added_at: Utc::now(),
        }
    }

    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
