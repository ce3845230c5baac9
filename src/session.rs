use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::display::MessageRef;
use crate::error::{PlaybackError, Result};
use crate::track::Track;

/// Escalera fija de velocidades de reproducción, en orden ascendente
pub const SPEED_STEPS: [f64; 8] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

const SPEED_DEFAULT_INDEX: usize = 3; // 1.0x

/// Máquina de estados de la sesión de un guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Mensaje de estado vivo, etiquetado según lo que muestra
///
/// Hay a lo sumo uno por guild; adoptar uno nuevo retira la referencia
/// anterior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveMessage {
    NowPlaying(MessageRef),
    IdleNotice(MessageRef),
}

impl LiveMessage {
    pub fn message_ref(&self) -> MessageRef {
        match self {
            LiveMessage::NowPlaying(m) | LiveMessage::IdleNotice(m) => *m,
        }
    }
}

/// Estado de reproducción de un guild
///
/// Creada de forma perezosa en el primer acceso a la cola y destruida
/// junto con la entrada del registry cuando el guild se desconecta.
#[derive(Debug)]
pub struct PlaybackSession {
    status: PlaybackState,
    current: Option<Track>,
    started_at: Option<Instant>,
    /// Tiempo transcurrido congelado mientras la sesión está en pausa
    paused_elapsed: Duration,
    volume: f32,
    speed_index: usize,
    looping: bool,
    pub(crate) live_message: Option<LiveMessage>,
    /// Evita repetir el aviso de "sin reproducción" en ticks silenciosos
    pub(crate) idle_notified: bool,
}

impl PlaybackSession {
    pub fn new(default_volume: f32) -> Self {
        Self {
            status: PlaybackState::Idle,
            current: None,
            started_at: None,
            paused_elapsed: Duration::ZERO,
            volume: default_volume,
            speed_index: SPEED_DEFAULT_INDEX,
            looping: false,
            live_message: None,
            idle_notified: false,
        }
    }

    pub fn status(&self) -> PlaybackState {
        self.status
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Arranca la reproducción de `track` desde ahora
    pub fn begin(&mut self, track: Track) {
        info!("🎵 Reproduciendo: {}", track.title);
        self.current = Some(track);
        self.started_at = Some(Instant::now());
        self.paused_elapsed = Duration::ZERO;
        self.status = PlaybackState::Playing;
        self.idle_notified = false;
    }

    /// Transición a Idle: sin track actual ni origen de tiempo
    pub fn mark_idle(&mut self) {
        self.current = None;
        self.started_at = None;
        self.paused_elapsed = Duration::ZERO;
        self.status = PlaybackState::Idle;
    }

    /// Retira el track actual, por ejemplo para re-encolarlo en loop
    pub fn take_current(&mut self) -> Option<Track> {
        self.current.take()
    }

    /// Congela el tiempo transcurrido y pasa a Paused
    pub fn pause(&mut self) -> Result<()> {
        if self.status != PlaybackState::Playing {
            return Err(PlaybackError::NothingPlaying);
        }
        self.paused_elapsed = self.elapsed();
        self.status = PlaybackState::Paused;
        info!("⏸️ Reproducción pausada");
        Ok(())
    }

    /// Reanuda desde el tiempo congelado
    pub fn resume(&mut self) -> Result<()> {
        if self.status != PlaybackState::Paused {
            return Err(PlaybackError::NothingPlaying);
        }
        self.started_at = Instant::now()
            .checked_sub(self.paused_elapsed)
            .or(Some(Instant::now()));
        self.status = PlaybackState::Playing;
        info!("▶️ Reproducción reanudada");
        Ok(())
    }

    /// Reinicia el origen del tiempo transcurrido a "ahora"
    ///
    /// Usado tras un hot-swap de sink: el item no se reselecciona, pero
    /// la barra de progreso vuelve a cero para mantenerse consistente.
    pub fn restart_origin(&mut self) {
        self.started_at = Some(Instant::now());
        self.paused_elapsed = Duration::ZERO;
        self.status = PlaybackState::Playing;
    }

    /// Tiempo transcurrido de la reproducción actual
    pub fn elapsed(&self) -> Duration {
        match self.status {
            PlaybackState::Idle => Duration::ZERO,
            PlaybackState::Paused => self.paused_elapsed,
            PlaybackState::Playing => self
                .started_at
                .map(|s| s.elapsed())
                .unwrap_or(Duration::ZERO),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Fija el multiplicador de volumen, dominio `[0.0, 2.0]`
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !(0.0..=2.0).contains(&volume) || !volume.is_finite() {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.volume = volume;
        info!("🔊 Volumen ajustado a {}%", (volume * 100.0) as u32);
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        SPEED_STEPS[self.speed_index]
    }

    /// Sube un paso en la escalera de velocidades
    pub fn speed_up(&mut self) -> Result<f64> {
        if self.speed_index + 1 >= SPEED_STEPS.len() {
            return Err(PlaybackError::SpeedBoundary {
                limit: SPEED_STEPS[SPEED_STEPS.len() - 1],
            });
        }
        self.speed_index += 1;
        debug!("⏩ Velocidad: {}x", self.speed());
        Ok(self.speed())
    }

    /// Baja un paso en la escalera de velocidades
    pub fn speed_down(&mut self) -> Result<f64> {
        if self.speed_index == 0 {
            return Err(PlaybackError::SpeedBoundary {
                limit: SPEED_STEPS[0],
            });
        }
        self.speed_index -= 1;
        debug!("⏪ Velocidad: {}x", self.speed());
        Ok(self.speed())
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        info!(
            "🔁 Loop {}",
            if self.looping { "activado" } else { "desactivado" }
        );
        self.looping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> PlaybackSession {
        PlaybackSession::new(1.0)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let s = session();
        assert_eq!(s.status(), PlaybackState::Idle);
        assert!(s.current().is_none());
        assert_eq!(s.elapsed(), Duration::ZERO);
        assert_eq!(s.speed(), 1.0);
        assert!(!s.looping());
    }

    #[test]
    fn test_begin_and_mark_idle() {
        let mut s = session();
        s.begin(Track::new("a", "loc-a"));
        assert_eq!(s.status(), PlaybackState::Playing);
        assert_eq!(s.current().unwrap().title, "a");

        s.mark_idle();
        assert_eq!(s.status(), PlaybackState::Idle);
        assert!(s.current().is_none());
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let mut s = session();
        s.begin(Track::new("a", "loc-a"));
        std::thread::sleep(Duration::from_millis(20));

        s.pause().unwrap();
        let frozen = s.elapsed();
        assert!(frozen >= Duration::from_millis(20));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(s.elapsed(), frozen);

        s.resume().unwrap();
        assert!(s.elapsed() >= frozen);
    }

    #[test]
    fn test_pause_resume_invalid_transitions() {
        let mut s = session();
        assert!(matches!(s.pause(), Err(PlaybackError::NothingPlaying)));
        assert!(matches!(s.resume(), Err(PlaybackError::NothingPlaying)));

        s.begin(Track::new("a", "loc-a"));
        assert!(matches!(s.resume(), Err(PlaybackError::NothingPlaying)));
        s.pause().unwrap();
        assert!(matches!(s.pause(), Err(PlaybackError::NothingPlaying)));
    }

    #[test]
    fn test_speed_ladder_boundaries() {
        let mut s = session();

        for expected in [1.25, 1.5, 1.75, 2.0] {
            assert_eq!(s.speed_up().unwrap(), expected);
        }
        match s.speed_up() {
            Err(PlaybackError::SpeedBoundary { limit }) => assert_eq!(limit, 2.0),
            other => panic!("esperaba SpeedBoundary, obtuve {other:?}"),
        }
        // El estado no cambia en el límite
        assert_eq!(s.speed(), 2.0);

        for _ in 0..7 {
            s.speed_down().unwrap();
        }
        assert_eq!(s.speed(), 0.25);
        match s.speed_down() {
            Err(PlaybackError::SpeedBoundary { limit }) => assert_eq!(limit, 0.25),
            other => panic!("esperaba SpeedBoundary, obtuve {other:?}"),
        }
    }

    #[test]
    fn test_volume_domain() {
        let mut s = session();
        s.set_volume(0.0).unwrap();
        s.set_volume(2.0).unwrap();
        s.set_volume(1.3).unwrap();
        assert_eq!(s.volume(), 1.3);

        assert!(matches!(
            s.set_volume(2.1),
            Err(PlaybackError::InvalidVolume(_))
        ));
        assert!(matches!(
            s.set_volume(-0.1),
            Err(PlaybackError::InvalidVolume(_))
        ));
        // Valor previo intacto tras el rechazo
        assert_eq!(s.volume(), 1.3);
    }

    #[test]
    fn test_restart_origin_resets_elapsed() {
        let mut s = session();
        s.begin(Track::new("a", "loc-a"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(s.elapsed() >= Duration::from_millis(20));

        s.restart_origin();
        assert!(s.elapsed() < Duration::from_millis(10));
        assert_eq!(s.status(), PlaybackState::Playing);
    }

    #[test]
    fn test_toggle_loop() {
        let mut s = session();
        assert!(s.toggle_loop());
        assert!(s.looping());
        assert!(!s.toggle_loop());
    }
}
