use async_trait::async_trait;

use crate::error::Result;
use crate::track::Track;

/// Resuelve un localizador o consulta en tracks reproducibles
///
/// Colaborador externo, potencialmente lento: el player lo espera
/// siempre fuera del lock del guild. Devuelve un único track o una
/// playlist expandida en orden; una lista vacía se trata como
/// [`crate::error::PlaybackError::UnresolvableSource`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Vec<Track>>;
}
