//! Network-facing collaborators implemented by the host.

use crate::connection::Connection;
use crate::error::CollaboratorResult;
use crate::requests::{
    ActionRequest, ActionResponse, ConfirmAuthorizationRequest, ConfirmAuthorizationResponse,
};

/// Result of asking the backend to create or re-establish a connection.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ConnectionResult {
    /// The backend issued an access token straight away.
    Success {
        /// The connection being set up.
        connection: Connection,
        /// The issued token.
        access_token: String,
    },
    /// The user must authenticate in the embedded web flow first.
    Redirect {
        /// The connection being set up.
        connection: Connection,
        /// Page to load in the web flow.
        redirect_url: String,
    },
    /// The backend refused.
    Failure {
        /// Backend error message.
        error: String,
    },
}

/// Performs signed calls against SCA backends.
///
/// Signing, transport and timeouts are the implementation's business.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait SigningClient: Send + Sync {
    /// Submits an action scanned from a code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    async fn submit_action(&self, request: ActionRequest) -> CollaboratorResult<ActionResponse>;

    /// Confirms or denies an authorization.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    async fn confirm_authorization(
        &self,
        request: ConfirmAuthorizationRequest,
    ) -> CollaboratorResult<ConfirmAuthorizationResponse>;

    /// Starts a new connection from a provider configuration URL.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures. Backend refusals are reported as
    /// [`ConnectionResult::Failure`].
    async fn create_connection(
        &self,
        configuration_url: String,
        connect_query: Option<String>,
    ) -> CollaboratorResult<ConnectionResult>;

    /// Re-authenticates an existing connection.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures. Backend refusals are reported as
    /// [`ConnectionResult::Failure`].
    async fn reconnect(&self, connection: Connection) -> CollaboratorResult<ConnectionResult>;
}

/// Reports device connectivity.
#[uniffi::export(with_foreign)]
pub trait NetworkMonitor: Send + Sync {
    /// Whether the network is currently reachable.
    fn is_reachable(&self) -> bool;
}
