//! Helper library for native MoQ subscriber applications.
//!
//! Provides the ambient pieces around a [moqt::Session]:
//! - [Log] to configure `tracing` output.
//! - [ClientConfig] loaded from the command line, the environment, or a TOML file.
//! - [run] to subscribe to a track for a while and report what arrived.

mod client;
mod config;
mod log;

pub use client::*;
pub use config::*;
pub use log::*;

// Re-export the protocol crate.
pub use moqt;
