use thiserror::Error;

/// Error outputs from `ScaKit`
#[derive(Debug, Error, uniffi::Error)]
pub enum ScaKitError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input_{attribute}: {reason}")]
    InvalidInput {
        /// The attribute that is invalid
        attribute: String,
        /// The reason the input is invalid
        reason: String,
    },

    /// The device has no network connectivity
    #[error("no_internet_connection")]
    NoInternetConnection,

    /// No active connection exists on this device
    #[error("no_active_connection")]
    NoActiveConnection,

    /// Active connections exist but none of them matches the scanned target
    #[error("no_suitable_connection: {connect_url}")]
    NoSuitableConnection {
        /// The connect URL carried by the scanned code
        connect_url: String,
    },

    /// The scanned code or deep link does not have a recognizable shape
    #[error("malformed_code: {reason}")]
    MalformedCode {
        /// Why the code was rejected
        reason: String,
    },

    /// Submitting an action against an existing connection failed
    #[error("action_submission_failed: {error}")]
    ActionSubmissionFailed {
        /// The underlying error
        error: String,
    },

    /// Creating or re-establishing a connection failed
    #[error("connection_creation_failed: {error}")]
    ConnectionCreationFailed {
        /// The underlying error
        error: String,
    },

    /// A platform collaborator (connection store, signing client) failed
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// A handshake is already running on this coordinator
    #[error("handshake_in_progress")]
    HandshakeInProgress,

    /// The operation is not valid in the current handshake state
    #[error("invalid_state: {reason}")]
    InvalidState {
        /// Description of the mismatch
        reason: String,
    },

    /// Unexpected error serializing or deserializing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// The error message from the serialization
        error: String,
    },
}

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Errors raised by platform collaborators implemented outside of Rust.
#[derive(Debug, Error, Clone, PartialEq, Eq, uniffi::Error)]
pub enum CollaboratorError {
    /// The connection store could not complete the operation.
    #[error("connection store error: {0}")]
    Storage(String),

    /// Transport-level failure reaching the backend.
    #[error("network error: {0}")]
    Network(String),

    /// The backend rejected the request.
    #[error("server error {class}: {message}")]
    Server {
        /// Error class reported by the backend.
        class: String,
        /// Human readable message reported by the backend.
        message: String,
    },

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for CollaboratorError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}
