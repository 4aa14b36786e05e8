use uuid::Uuid;

use super::code::ConnectAction;
use super::outcome::HandshakeFailure;
use crate::connection::Connection;

/// How a handshake is entered.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum HandshakeEntry {
    /// Re-authenticate an existing connection.
    Reconnect {
        /// Backend id of the connection.
        connection_id: String,
    },
    /// A code scanned in the app.
    Connect {
        /// Raw scanned value.
        raw_code: String,
    },
    /// A deep link opened from another app.
    DeepLink {
        /// The link.
        url: String,
    },
    /// A code scanned during onboarding; only new connections are accepted.
    FirstConnect {
        /// Raw scanned value.
        raw_metadata: String,
    },
}

impl HandshakeEntry {
    pub(crate) const fn label(&self) -> &'static str {
        match self {
            Self::Reconnect { .. } => "reconnect",
            Self::Connect { .. } => "connect",
            Self::DeepLink { .. } => "deep_link",
            Self::FirstConnect { .. } => "first_connect",
        }
    }
}

/// Kind of work a session performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum HandshakeMode {
    /// Creating a connection from a configuration.
    NewConnection,
    /// Re-authenticating an existing connection.
    Reconnect,
    /// Submitting an action against an existing connection.
    Action,
}

/// Observable state of the handshake coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Default, uniffi::Enum)]
pub enum HandshakeState {
    /// No handshake running.
    #[default]
    Idle,
    /// Parsing the code and looking up connections.
    ResolvingCode,
    /// Waiting for the user to pick one of several matching connections.
    Disambiguating {
        /// Candidates in creation order.
        candidates: Vec<Connection>,
    },
    /// Action request in flight.
    SubmittingAction {
        /// Connection signing the action.
        connection_guid: String,
    },
    /// Connection creation in flight.
    CreatingConnection,
    /// Reconnection in flight.
    ReconnectingConnection {
        /// Connection being re-authenticated.
        connection_guid: String,
    },
    /// Waiting for the embedded web flow.
    AwaitingRedirect {
        /// Page handed to the web flow.
        redirect_url: String,
    },
    /// Persisting the access token.
    Finalizing,
    /// Finished successfully.
    Succeeded,
    /// Finished with a failure.
    Failed {
        /// What went wrong.
        failure: HandshakeFailure,
    },
}

impl HandshakeState {
    /// Whether a session is running (a new `start` would be rejected).
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        !matches!(self, Self::Idle | Self::Succeeded | Self::Failed { .. })
    }
}

/// Transient state of one attempt. Dropped on any terminal outcome.
#[derive(Debug, Clone)]
pub(crate) struct HandshakeSession {
    pub(crate) id: Uuid,
    pub(crate) mode: HandshakeMode,
    pub(crate) action: Option<ConnectAction>,
    pub(crate) candidates: Vec<Connection>,
    pub(crate) selected_connection: Option<Connection>,
    pub(crate) pending_redirect_url: Option<String>,
}

impl HandshakeSession {
    pub(crate) fn new(mode: HandshakeMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            action: None,
            candidates: Vec::new(),
            selected_connection: None,
            pending_redirect_url: None,
        }
    }
}
