use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Local status of an authorization.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// Waiting for the user to act.
    #[default]
    Base,
    /// The user confirmed.
    Confirmed,
    /// The user denied.
    Denied,
}

/// A pending or resolved approval request tied to one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct AuthorizationRecord {
    /// Id of the authorization, unique within its connection.
    pub authorization_id: String,
    /// Backend id of the owning connection.
    pub connection_id: String,
    /// Creation time, unix seconds.
    pub created_at: u64,
    /// Expiry time, unix seconds.
    pub expires_at: u64,
    /// Local status.
    #[serde(default)]
    pub status: AuthorizationStatus,
    /// Opaque code echoed back when confirming.
    #[serde(default)]
    pub authorization_code: Option<String>,
    /// When the status left `base`, unix seconds.
    #[serde(default)]
    pub action_time: Option<u64>,
    /// Set once the authorization expired while on screen.
    #[serde(default)]
    pub expired: bool,
}

impl AuthorizationRecord {
    /// Whether this record has the given identity.
    #[must_use]
    pub fn is(&self, connection_id: &str, authorization_id: &str) -> bool {
        self.connection_id == connection_id && self.authorization_id == authorization_id
    }

    /// Whether the user (or the server) already settled this authorization.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status != AuthorizationStatus::Base
    }

    /// Settled or expired: the record reflects a state the server may not report yet.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.is_settled() || self.expired
    }

    /// Whether the authorization's expiry is in the past.
    #[must_use]
    pub const fn is_past_expiry(&self, now: u64) -> bool {
        self.expires_at < now
    }

    pub(crate) fn key(&self) -> (&str, &str) {
        (self.connection_id.as_str(), self.authorization_id.as_str())
    }
}
