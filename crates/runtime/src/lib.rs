//! Eazy Runtime - Transports, correlation and reconnection
//!
//! This crate provides the low-level runtime infrastructure for talking to the
//! desktop audio/media host:
//!
//! - **Correlation**: Matching responses to pending requests by response kind
//! - **Reconnection**: Bounded retry state machine for the socket link
//! - **Events**: Publish/subscribe registry for host push events
//! - **Transports**: A WebSocket client and an in-process command adapter
//!   behind one [`Transport`] trait
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   eazy-remote    │  Controller façade, media reconciliation
//! └────────┬─────────┘
//!          │ Arc<dyn Transport>
//! ┌────────▼─────────┐
//! │   eazy-runtime   │  This crate
//! │  ┌────────────┐  │
//! │  │ Socket     │  │  Correlator + Reconnector + EventBus over a Dialer
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ HostCmd    │  │  In-process command interface + EventBus
//! │  └────────────┘  │
//! └──────────────────┘
//! ```

pub mod connection;
pub mod correlator;
pub mod error;
pub mod events;
pub mod host;
pub mod reconnector;
pub mod task;
pub mod transport;

// Re-export key types at crate root
pub use connection::{SocketConfig, SocketTransport};
pub use correlator::{Correlator, DEFAULT_CALL_TIMEOUT, Request, ResponseFuture};
pub use error::{Error, Result};
pub use events::{EventBus, EventHandler, HandlerId, Subscription};
pub use host::{HostCommandTransport, HostCommands, HostEventSink};
pub use reconnector::{CloseKind, ConnectionState, ReconnectDecision, ReconnectPolicy, Reconnector};
pub use task::ScheduledTask;
pub use transport::{
	ConnectionMode, Dialer, FrameSink, FrameStream, Link, LoopbackDialer, LoopbackPeer, Transport, WebSocketDialer,
};
