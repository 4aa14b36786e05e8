use strum::{Display, EnumString};

use crate::connection::Connection;
use crate::error::ScaKitError;

/// User-visible failure categories of a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum HandshakeFailure {
    /// The device is offline.
    NoInternetConnection,
    /// There is no active connection at all.
    NoActiveConnection,
    /// Connections exist but none serves the scanned target.
    NoSuitableConnection,
    /// The backend did not accept the action.
    ActionSubmissionFailed,
    /// Connection setup failed or the web flow reported an error.
    ConnectionCreationFailed,
    /// A collaborator (store, client) failed.
    CollaboratorError,
}

impl HandshakeFailure {
    /// Default English message for the category.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoInternetConnection => "No internet connection. Please try again.",
            Self::NoActiveConnection => {
                "You have no active connections. Connect to a provider first."
            }
            Self::NoSuitableConnection => "None of your connections can handle this request.",
            Self::ActionSubmissionFailed => {
                "The action could not be submitted. Please try again."
            }
            Self::ConnectionCreationFailed => {
                "The connection could not be established. Please try again."
            }
            Self::CollaboratorError => "Something went wrong. Please try again.",
        }
    }

    /// Classifies an error, together with the raw detail worth showing.
    pub(crate) fn classify(error: &ScaKitError) -> (Self, Option<String>) {
        match error {
            ScaKitError::NoInternetConnection => (Self::NoInternetConnection, None),
            ScaKitError::NoActiveConnection => (Self::NoActiveConnection, None),
            ScaKitError::NoSuitableConnection { .. } => (Self::NoSuitableConnection, None),
            ScaKitError::ActionSubmissionFailed { error } => {
                (Self::ActionSubmissionFailed, Some(error.clone()))
            }
            ScaKitError::ConnectionCreationFailed { error } => {
                (Self::ConnectionCreationFailed, Some(error.clone()))
            }
            other => (Self::CollaboratorError, Some(other.to_string())),
        }
    }
}

/// What the caller should do after a handshake step.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum HandshakeOutcome {
    /// Several connections match; ask the user and call `select_connection`.
    SelectConnection {
        /// Candidates in creation order.
        candidates: Vec<Connection>,
    },
    /// Load `url` in the embedded web flow and report back through
    /// `confirm_redirect`, `fail_redirect` or `handle_redirect_callback`.
    Redirect {
        /// Page to load.
        url: String,
    },
    /// The action created an authorization; show it.
    OpenAuthorization {
        /// Connection owning the authorization.
        connection_id: String,
        /// The new authorization.
        authorization_id: String,
    },
    /// The action was submitted; open the code's return-to URL.
    OpenExternalUrl {
        /// URL to open.
        url: String,
    },
    /// The action was submitted; nothing else to do.
    Complete,
    /// The connection is authenticated and stored.
    Connected {
        /// The activated connection.
        connection: Connection,
    },
    /// The handshake failed.
    Failed {
        /// Category, drives the message shown.
        failure: HandshakeFailure,
        /// Default message for the category.
        message: String,
        /// Raw collaborator error, when available.
        detail: Option<String>,
    },
    /// The input was not a code we handle; close silently.
    Dismissed,
    /// The session was cancelled or replaced while this step was running.
    Abandoned,
}

impl HandshakeOutcome {
    pub(crate) fn failed(failure: HandshakeFailure, detail: Option<String>) -> Self {
        Self::Failed {
            failure,
            message: failure.message().to_string(),
            detail,
        }
    }
}
