//! eazy: remote control for the Eazy Controller audio/media host
//!
//! This crate provides the public API for driving the host's per-application
//! audio sessions, output devices and media sessions, either over the
//! host's WebSocket endpoint or through its in-process command interface.
//!
//! # Examples
//!
//! ## Adjusting audio
//!
//! ```ignore
//! use eazy::{ClientConfig, Controller};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::load(None)?;
//!     let controller = Controller::connect(&config, None).await?;
//!
//!     for session in controller.get_audio_sessions().await? {
//!         println!("{} {:.0}%", session.name, session.volume * 100.0);
//!     }
//!     controller.set_session_mute("Discord", true).await?;
//!
//!     controller.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Following the current track
//!
//! ```ignore
//! use eazy::{ClientConfig, Controller, MediaReconciler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::load(None)?;
//!     let controller = Controller::connect(&config, None).await?;
//!     let media = MediaReconciler::new(controller, config.reconciler_config());
//!     media.start().await?;
//!
//!     let mut changes = media.watch();
//!     while changes.changed().await.is_ok() {
//!         if let Some(info) = changes.borrow_and_update().as_ref() {
//!             println!("{} - {}", info.artist, info.title);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ MediaReconciler  │  Selected session, bounded polling, thumbnails
//! └────────┬─────────┘
//! ┌────────▼─────────┐
//! │    Controller    │  Typed host operations
//! └────────┬─────────┘
//!          │ dyn Transport
//! ┌────────▼─────────┐
//! │   eazy-runtime   │  Socket (Correlator + Reconnector) or in-process
//! └──────────────────┘
//! ```

pub mod config;
pub mod facade;
pub mod reconciler;
pub mod sessions;

pub use config::{ClientConfig, ConfigError, TransportPreference};
pub use eazy_protocol::{AudioDevice, AudioSession, MediaInfo, PushKind, RequestKind, SkipDirection};
pub use eazy_runtime::{ConnectionMode, Error, HostCommands, HostEventSink, Result, SocketTransport, Subscription};
pub use facade::{Controller, Overview};
pub use reconciler::{MediaReconciler, MediaView, ReconcilerConfig};
pub use sessions::{SessionCounts, SessionFilter, filter_sessions, volume_from_percent, volume_percent};
