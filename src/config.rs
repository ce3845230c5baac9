use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuración del orquestador
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Audio
    pub default_volume: f32,
    pub max_queue_size: usize,
    pub max_playlist_size: usize,

    // Tareas de fondo
    /// Periodo del reconciliador de "reproduciendo ahora", en segundos
    pub nowplaying_update_secs: u64,
    /// Inactividad tolerada antes de desconectar el sink, en segundos
    pub idle_timeout_secs: u64,

    // UI
    pub progress_bar_width: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()?,
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            max_playlist_size: std::env::var("MAX_PLAYLIST_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            nowplaying_update_secs: std::env::var("NOWPLAYING_UPDATE_SECS")
                .unwrap_or_else(|_| "25".to_string())
                .parse()?,
            idle_timeout_secs: std::env::var("IDLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()?,
            progress_bar_width: std::env::var("PROGRESS_BAR_WIDTH")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Sanea valores antes de arrancar el orquestador
    pub fn validate(&self) -> Result<()> {
        if self.default_volume < 0.0 || self.default_volume > 2.0 {
            anyhow::bail!(
                "El volumen por defecto debe estar entre 0.0 y 2.0, recibido: {}",
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("El tamaño máximo de cola debe ser mayor a 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("El tamaño máximo de playlist debe ser mayor a 0");
        }

        if self.nowplaying_update_secs == 0 {
            anyhow::bail!("El periodo del reconciliador debe ser mayor a 0");
        }

        if self.idle_timeout_secs == 0 {
            anyhow::bail!("El timeout de inactividad debe ser mayor a 0");
        }

        Ok(())
    }

    pub fn nowplaying_period(&self) -> Duration {
        Duration::from_secs(self.nowplaying_update_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_volume: 1.0,
            max_queue_size: 1000,
            max_playlist_size: 100,
            nowplaying_update_secs: 25,
            idle_timeout_secs: 600,
            progress_bar_width: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.default_volume = 2.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_queue_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.idle_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
