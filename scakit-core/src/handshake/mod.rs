//! The connect handshake: scanned codes, connection resolution and the
//! coordinator driving one session at a time.

mod code;
mod coordinator;
mod outcome;
mod resolve;
mod state;

pub use code::{
    is_valid_scanned_code, parse_scanned_code, ConnectAction, RedirectCallback, ScannedCode,
};
pub use coordinator::ConnectCoordinator;
pub use outcome::{HandshakeFailure, HandshakeOutcome};
pub use resolve::{resolve_candidates, Resolution};
pub use state::{HandshakeEntry, HandshakeMode, HandshakeState};
