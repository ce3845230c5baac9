//! Tipos de error del orquestador.
//!
//! Taxonomía única para colas, sesiones y colaboradores externos,
//! definida con `thiserror` para propagación clara con `?`.

use thiserror::Error;

/// Error principal del núcleo de reproducción
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// La cola no tiene canciones que entregar
    #[error("la cola está vacía")]
    EmptyQueue,

    /// Posición 1-indexada fuera de `[1, size]`
    #[error("posición inválida: {position} (la cola tiene {size} canciones)")]
    InvalidPosition { position: usize, size: usize },

    /// La cola alcanzó su capacidad configurada
    #[error("la cola está llena (máximo {0} canciones)")]
    QueueFull(usize),

    /// El resolver externo no pudo producir tracks para la consulta
    #[error("no se pudo resolver la fuente: {0}")]
    UnresolvableSource(String),

    /// El sink de audio falló al arrancar; la sesión queda en Idle
    #[error("el sink de audio no pudo iniciar: {0}")]
    SinkStart(String),

    /// El mensaje de estado fue borrado externamente
    #[error("mensaje de estado no encontrado")]
    DisplayNotFound,

    /// Fallo del canal de display distinto a NotFound
    #[error("error del canal de display: {0}")]
    Display(String),

    /// Ya se está en el extremo de la escalera de velocidades
    #[error("ya se está en la velocidad límite ({limit}x)")]
    SpeedBoundary { limit: f64 },

    /// Volumen fuera del dominio permitido
    #[error("volumen fuera de rango: {0} (permitido 0.0 a 2.0)")]
    InvalidVolume(f32),

    /// La operación requiere una reproducción activa
    #[error("no hay reproducción activa")]
    NothingPlaying,
}

/// Alias de conveniencia para el crate
pub type Result<T> = std::result::Result<T, PlaybackError>;
