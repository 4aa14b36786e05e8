//! Request descriptors handed to the [`SigningClient`](crate::SigningClient) and the
//! responses it returns.
//!
//! Descriptors are plain records: signing and transport are the host's business.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::authorization::AuthorizationStatus;
use crate::connection::Connection;
use crate::error::ScaKitError;

/// How the user unlocked the app before acting on an authorization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, uniffi::Enum,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UnlockMethod {
    /// Unlocked with the app passcode.
    Passcode,
    /// Unlocked with Face ID / Touch ID / fingerprint.
    Biometrics,
}

/// Device location attached to confirmations.
#[derive(Debug, Clone, Copy, PartialEq, uniffi::Record)]
pub struct Geolocation {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Geolocation {
    /// Value of the geolocation header, `GEO:<latitude>;<longitude>`.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("GEO:{};{}", self.latitude, self.longitude)
    }
}

/// Submits an action identified by a scanned code against a connection.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ActionRequest {
    /// Target URL (the code's connect URL).
    pub url: String,
    /// Guid of the connection signing the request.
    pub connection_guid: String,
    /// Access token of that connection.
    pub access_token: String,
    /// UI language tag.
    pub language: String,
    /// Guid of the action to submit.
    pub action_guid: String,
}

impl ActionRequest {
    /// Builds the descriptor for `connection`.
    ///
    /// # Errors
    /// Returns `ActionSubmissionFailed` if the connection has no access token yet.
    pub fn for_connection(
        connection: &Connection,
        url: &str,
        language: &str,
        action_guid: &str,
    ) -> Result<Self, ScaKitError> {
        let access_token =
            connection
                .access_token
                .clone()
                .ok_or_else(|| ScaKitError::ActionSubmissionFailed {
                    error: format!("connection {} has no access token", connection.guid),
                })?;
        Ok(Self {
            url: url.to_string(),
            connection_guid: connection.guid.clone(),
            access_token,
            language: language.to_string(),
            action_guid: action_guid.to_string(),
        })
    }
}

/// Confirms or denies an authorization.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ConfirmAuthorizationRequest {
    /// Base URL of the connection's backend.
    pub url: String,
    /// Guid of the connection signing the request.
    pub connection_guid: String,
    /// Access token of that connection.
    pub access_token: String,
    /// UI language tag.
    pub language: String,
    /// Authorization being acted on.
    pub authorization_id: String,
    /// Opaque code shipped with the authorization, echoed back to the server.
    pub authorization_code: Option<String>,
    /// Geolocation header value, see [`Geolocation::header_value`].
    pub geolocation: Option<String>,
    /// How the app was unlocked (`passcode` or `biometrics`).
    pub authorization_type: String,
    /// `true` to confirm, `false` to deny.
    pub confirm: bool,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Server answer to an action submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, uniffi::Record)]
pub struct ActionResponse {
    /// Connection that received a new authorization, if any.
    #[serde(default)]
    pub connection_id: Option<String>,
    /// Authorization created by the action, if any.
    #[serde(default)]
    pub authorization_id: Option<String>,
}

impl ActionResponse {
    /// Parses the `{"data": {...}}` envelope returned by the backend.
    ///
    /// # Errors
    /// Returns `SerializationError` on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ScaKitError> {
        serde_json::from_str::<Envelope<Self>>(json)
            .map(|envelope| envelope.data)
            .map_err(|e| ScaKitError::SerializationError {
                error: format!("invalid action response: {e}"),
            })
    }

    /// The `(connection_id, authorization_id)` pair, when the action created an
    /// authorization. Both ids must be present.
    #[must_use]
    pub fn created_authorization(&self) -> Option<(&str, &str)> {
        match (&self.connection_id, &self.authorization_id) {
            (Some(connection_id), Some(authorization_id)) => {
                Some((connection_id.as_str(), authorization_id.as_str()))
            }
            _ => None,
        }
    }
}

/// Status reported by the backend after a confirmation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, uniffi::Enum,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Waiting for the user.
    Pending,
    /// The backend is processing the decision.
    Processing,
    /// Confirmed.
    Confirmed,
    /// Denied.
    Denied,
    /// The backend failed to process the decision.
    Error,
    /// The authorization timed out.
    TimeOut,
    /// The authorization can no longer be acted on.
    Unavailable,
    /// Confirmation processed by the third party.
    ConfirmProcessed,
    /// Denial processed by the third party.
    DenyProcessed,
}

impl ConfirmationStatus {
    /// The local status this server status settles on, if it is final.
    #[must_use]
    pub const fn settled_status(self) -> Option<AuthorizationStatus> {
        match self {
            Self::Confirmed | Self::ConfirmProcessed => Some(AuthorizationStatus::Confirmed),
            Self::Denied | Self::DenyProcessed => Some(AuthorizationStatus::Denied),
            Self::Pending
            | Self::Processing
            | Self::Error
            | Self::TimeOut
            | Self::Unavailable => None,
        }
    }
}

/// Server answer to a confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
pub struct ConfirmAuthorizationResponse {
    /// Authorization id.
    pub id: String,
    /// Reported status.
    pub status: ConfirmationStatus,
}

impl ConfirmAuthorizationResponse {
    /// Parses the `{"data": {"id": ..., "status": ...}}` envelope.
    ///
    /// # Errors
    /// Returns `SerializationError` on malformed JSON or an unknown status.
    pub fn from_json(json: &str) -> Result<Self, ScaKitError> {
        serde_json::from_str::<Envelope<Self>>(json)
            .map(|envelope| envelope.data)
            .map_err(|e| ScaKitError::SerializationError {
                error: format!("invalid confirmation response: {e}"),
            })
    }
}

/// Parses a confirmation response body for foreign callers.
///
/// # Errors
/// See [`ConfirmAuthorizationResponse::from_json`].
#[uniffi::export]
pub fn confirm_response_from_json(
    json: &str,
) -> Result<ConfirmAuthorizationResponse, ScaKitError> {
    ConfirmAuthorizationResponse::from_json(json)
}

/// Parses an action submission response body for foreign callers.
///
/// # Errors
/// See [`ActionResponse::from_json`].
#[uniffi::export]
pub fn action_response_from_json(json: &str) -> Result<ActionResponse, ScaKitError> {
    ActionResponse::from_json(json)
}
