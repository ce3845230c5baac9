//! Reaper de inactividad.
//!
//! Timer diferido de un solo disparo por guild, armado cada vez que el
//! avance encuentra la cola vacía. Al expirar vuelve a verificar el
//! estado (pudo cambiar durante la espera) y recién entonces corta la
//! conexión de voz y retira la entrada del registro.

use serenity::model::id::GuildId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::registry::GuildRegistry;
use crate::session::PlaybackState;
use crate::sink::AudioSink;

/// Arma (o re-arma) el timer de inactividad de un guild
///
/// Re-armar reemplaza el timer anterior: a lo sumo uno vivo por guild.
pub(crate) fn arm(
    registry: Arc<GuildRegistry>,
    sink: Arc<dyn AudioSink>,
    guild_id: GuildId,
    timeout: Duration,
) {
    let Some(handle) = registry.get(guild_id) else {
        return;
    };

    debug!("⏲️ Timer de inactividad armado para guild {} ({:?})", guild_id, timeout);

    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;

        let Some(handle) = registry.get(guild_id) else {
            return;
        };

        // El candado se mantiene desde la re-verificación hasta la
        // desconexión: un avance concurrente no puede colarse entre el
        // chequeo y el corte y perder su sink recién arrancado.
        let state = handle.state.lock().await;

        if !sink.is_connected(guild_id).await || sink.is_playing(guild_id).await {
            debug!("⏲️ Timer de guild {} expiró pero el estado cambió", guild_id);
            return;
        }
        if state.session.status() != PlaybackState::Idle || !state.queue.is_empty() {
            debug!("⏲️ Guild {} volvió a la actividad, timer descartado", guild_id);
            return;
        }

        info!("😴 Guild {} inactivo, desconectando sink", guild_id);
        sink.disconnect(guild_id).await;
        // remove() cancela el reconciliador y este mismo timer; todo el
        // trabajo pendiente ya quedó hecho antes de este punto.
        registry.remove(guild_id);
    });

    handle.set_reaper(timer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testutil::FakeSink;

    fn setup() -> (Arc<GuildRegistry>, Arc<FakeSink>, Arc<dyn AudioSink>) {
        let registry = Arc::new(GuildRegistry::new(Config::default()));
        let fake = Arc::new(FakeSink::new());
        let sink: Arc<dyn AudioSink> = fake.clone();
        (registry, fake, sink)
    }

    #[tokio::test]
    async fn test_reaper_disconnects_idle_guild() {
        let (registry, fake, sink) = setup();
        let guild_id = GuildId::new(9);
        registry.get_or_create(guild_id);
        fake.set_connected(true);

        arm(registry.clone(), sink, guild_id, Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(fake.disconnect_count(), 1);
        assert!(registry.get(guild_id).is_none(), "la entrada debe retirarse");
    }

    #[tokio::test]
    async fn test_reaper_skips_when_playing_again() {
        let (registry, fake, sink) = setup();
        let guild_id = GuildId::new(9);
        registry.get_or_create(guild_id);
        fake.set_connected(true);
        fake.set_playing(true);

        arm(registry.clone(), sink, guild_id, Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(fake.disconnect_count(), 0);
        assert!(registry.get(guild_id).is_some());
    }

    #[tokio::test]
    async fn test_reaper_skips_disconnected_sink() {
        let (registry, fake, sink) = setup();
        let guild_id = GuildId::new(9);
        registry.get_or_create(guild_id);
        fake.set_connected(false);

        arm(registry.clone(), sink, guild_id, Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(fake.disconnect_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_timer_rechecks_under_the_guild_lock() {
        let (registry, fake, sink) = setup();
        let guild_id = GuildId::new(9);
        let handle = registry.get_or_create(guild_id);
        fake.set_connected(true);

        arm(registry.clone(), sink, guild_id, Duration::from_millis(30));

        // El guild vuelve a la actividad mientras el timer ya expiró
        // pero aún espera el candado del guild.
        let state = handle.state.lock().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        fake.set_playing(true);
        drop(state);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fake.disconnect_count(), 0, "no debe cortar un sink activo");
        assert!(registry.get(guild_id).is_some());
    }

    #[tokio::test]
    async fn test_rearm_replaces_timer() {
        let (registry, fake, sink) = setup();
        let guild_id = GuildId::new(9);
        let handle = registry.get_or_create(guild_id);
        fake.set_connected(true);

        arm(registry.clone(), sink.clone(), guild_id, Duration::from_secs(300));
        arm(registry.clone(), sink, guild_id, Duration::from_millis(30));
        assert!(handle.reaper_armed());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fake.disconnect_count(), 1, "solo el último timer dispara");
    }

    #[tokio::test]
    async fn test_cancel_before_expiry() {
        let (registry, fake, sink) = setup();
        let guild_id = GuildId::new(9);
        let handle = registry.get_or_create(guild_id);
        fake.set_connected(true);

        arm(registry.clone(), sink, guild_id, Duration::from_millis(40));
        handle.cancel_reaper();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fake.disconnect_count(), 0);
    }
}
