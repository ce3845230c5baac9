//! # Orquesta
//!
//! Multi-tenant playback orchestration core for Discord guilds.
//!
//! Each guild owns an isolated unit of state: a FIFO track queue, a
//! playback session (state machine, volume, speed ladder, loop flag)
//! and two background tasks, the now-playing reconciler loop and the
//! idle disconnect timer. The [`Player`] drives everything:
//!
//! - Queue advancement and sink lifecycle ([`player`])
//! - Per-guild state and playback epochs ([`registry`])
//! - Status message reconciliation ([`status`])
//! - Idle timeout and voice teardown ([`reaper`])
//!
//! External collaborators are abstracted behind three traits so the
//! core stays testable without a gateway connection: [`AudioSink`]
//! (voice driver), [`DisplayChannel`] (status messages and presence)
//! and [`SourceResolver`] (query → tracks). The `discord` module ships
//! the production implementations on top of songbird and serenity.

pub mod config;
pub mod discord;
pub mod display;
pub mod error;
pub mod player;
pub mod queue;
pub mod reaper;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod sink;
pub mod status;
pub mod track;
pub mod ui;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use display::{DisplayChannel, MessageRef};
pub use error::{PlaybackError, Result};
pub use player::Player;
pub use queue::GuildQueue;
pub use registry::GuildRegistry;
pub use resolver::SourceResolver;
pub use session::{PlaybackSession, PlaybackState};
pub use sink::{AudioSink, SinkCallback, SinkParams};
pub use track::Track;
pub use ui::StatusCard;
