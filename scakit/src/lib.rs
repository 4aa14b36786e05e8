//! `ScaKit` keeps the list of pending SCA authorizations in sync with the
//! server and drives the connect/action handshake behind scanned codes.
//!
//! This crate is what mobile hosts link against; everything lives in
//! [`scakit_core`] and is re-exported here together with its `UniFFI`
//! scaffolding.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

pub use scakit_core::*;

scakit_core::uniffi_reexport_scaffolding!();
