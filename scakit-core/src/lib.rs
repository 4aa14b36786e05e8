//! Engine behind an SCA authenticator: reconciles polled authorizations and
//! drives the connect/action handshake started from scanned codes.
//!
//! Hosts provide storage and transport by implementing [`ConnectionStore`],
//! [`SigningClient`] and [`NetworkMonitor`]. [`logger::Logger`] receives the
//! engine's log lines.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod authorization;
pub use authorization::*;

mod client;
pub use client::*;

mod config;
pub use config::*;

mod connection;
pub use connection::*;

mod error;
pub use error::*;

mod handshake;
pub use handshake::*;

mod requests;
pub use requests::*;

/// Bridges the engine's `log` records to a host-provided logger.
pub mod logger;

uniffi::setup_scaffolding!("scakit_core");
