//! Connections between this device and SCA backends.

use serde::{Deserialize, Serialize};
use url::Url;

mod memory;
mod store;

pub use memory::InMemoryConnectionStore;
pub use store::ConnectionStore;

/// Lifecycle status of a [`Connection`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, uniffi::Enum,
)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Created, revoked or not yet authenticated.
    #[default]
    Inactive,
    /// Holds a valid access token.
    Active,
}

/// An authenticated relationship with one backend.
///
/// The engine only ever holds snapshots of connections. Changes go through
/// [`ConnectionStore`], which is the single writer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Connection {
    /// Local identifier of the connection.
    pub guid: String,
    /// Identifier assigned by the backend; authorizations reference it.
    pub id: String,
    /// Base URL of the backend's SCA API.
    pub base_url: String,
    /// Access token, present once the handshake completed.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Display name of the provider.
    pub name: String,
    /// Current status.
    #[serde(default)]
    pub status: ConnectionStatus,
    /// Creation time (unix seconds). Orders connections in pickers.
    #[serde(default)]
    pub created_at: u64,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("guid", &self.guid)
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("name", &self.name)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Connection {
    /// Whether the connection is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active
    }

    /// Whether this connection targets `url`.
    #[must_use]
    pub fn serves(&self, url: &str) -> bool {
        base_url_matches(&self.base_url, url)
    }
}

/// Compares two base URLs, ignoring host case and trailing slashes.
///
/// Values that are not URLs are compared verbatim.
#[must_use]
pub fn base_url_matches(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.as_str().trim_end_matches('/') == b.as_str().trim_end_matches('/'),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_matching_ignores_trailing_slash_and_host_case() {
        assert!(base_url_matches(
            "https://Bank.example/api/",
            "https://bank.example/api"
        ));
        assert!(!base_url_matches(
            "https://bank.example/api",
            "https://bank.example/api/v2"
        ));
        assert!(base_url_matches("not a url", "not a url"));
    }

    #[test]
    fn debug_redacts_access_token() {
        let connection = Connection {
            guid: "guid".to_string(),
            id: "1".to_string(),
            base_url: "https://bank.example/api".to_string(),
            access_token: Some("super-secret".to_string()),
            name: "Bank".to_string(),
            status: ConnectionStatus::Active,
            created_at: 0,
        };
        let rendered = format!("{connection:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
