//! Wire types for the Eazy Controller host protocol.
//!
//! This crate contains the serde-serializable types exchanged with the desktop
//! audio/media host, either as JSON envelopes over the WebSocket endpoint or as
//! arguments and results of the in-process command interface.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization and a few projections
//! - **1:1 with the host**: Field names match what the host emits
//! - **Stable**: Changes only when the wire protocol changes
//!
//! Correlation, transports and state reconciliation live in `eazy-runtime`
//! and `eazy-remote`.

pub mod envelope;
pub mod kinds;
pub mod types;

pub use envelope::*;
pub use kinds::*;
pub use types::*;
