//! # Discord Adapters
//!
//! Production implementations of the orchestrator's collaborator
//! traits on top of serenity and songbird:
//!
//! - [`DiscordSink`]: voice playback through songbird drivers
//! - [`DiscordDisplay`]: status embeds and gateway presence
//! - [`YtDlpResolver`]: query resolution via yt-dlp
//!
//! The core never imports these directly; the process entry point
//! wires them into [`crate::Player`] at startup.

pub mod display;
pub mod resolver;
pub mod sink;

pub use display::DiscordDisplay;
pub use resolver::YtDlpResolver;
pub use sink::DiscordSink;
