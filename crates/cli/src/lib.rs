//! Command-line remote for the Eazy Controller host.
//!
//! The binary is a thin shell over [`eazy::Controller`] and
//! [`eazy::MediaReconciler`]: parse arguments, connect, run one command,
//! print a [`output::CommandResult`].

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
