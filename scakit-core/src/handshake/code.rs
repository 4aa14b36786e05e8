//! Parsing of scanned codes (QR / deep links) and of the web flow's final redirect.
//!
//! A scanned code is a URL whose query may carry:
//!
//! | parameter                   | meaning                                   |
//! |-----------------------------|-------------------------------------------|
//! | `action_uuid` / `action_id` | action to submit on an existing connection |
//! | `connect_url`               | base URL of the backend owning the action  |
//! | `configuration`             | configuration URL for a new connection     |
//! | `connect_query`             | opaque query forwarded on connection setup |
//! | `return_to`                 | URL to open once an action is submitted    |

use url::Url;

use crate::error::ScaKitError;

const ACTION_KEYS: [&str; 2] = ["action_uuid", "action_id"];
const CONNECT_URL_KEY: &str = "connect_url";
const CONFIGURATION_KEY: &str = "configuration";
const CONNECT_QUERY_KEY: &str = "connect_query";
const RETURN_TO_KEY: &str = "return_to";

const ACCESS_TOKEN_KEY: &str = "access_token";
const ERROR_CLASS_KEY: &str = "error_class";
const ERROR_MESSAGE_KEY: &str = "error_message";

/// Action request extracted from a scanned code. Lives for one handshake.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ConnectAction {
    /// Guid of the action.
    pub action_guid: String,
    /// Base URL of the backend the action belongs to.
    pub connect_url: String,
    /// Where to send the user once the action is submitted.
    pub return_to_url: Option<String>,
    /// Configuration URL, when the code also carries one.
    pub configuration_url: Option<String>,
    /// Opaque query forwarded to connection setup.
    pub connect_query: Option<String>,
}

/// What a scanned code asks for.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum ScannedCode {
    /// Submit an action against an existing connection.
    Action {
        /// The extracted action.
        action: ConnectAction,
    },
    /// Create a new connection from a provider configuration.
    NewConnection {
        /// Provider configuration URL.
        configuration_url: String,
        /// Opaque query forwarded to connection setup.
        connect_query: Option<String>,
    },
}

impl ScannedCode {
    /// Parses a raw scanned value.
    ///
    /// # Errors
    /// Returns `MalformedCode` when the value is not a URL, or carries neither an
    /// action id with a connect URL nor a configuration URL. A URL parameter
    /// that does not parse counts as absent.
    pub fn parse(raw: &str) -> Result<Self, ScaKitError> {
        let url = Url::parse(raw.trim()).map_err(|e| ScaKitError::MalformedCode {
            reason: format!("not a url: {e}"),
        })?;

        let action_guid = ACTION_KEYS.iter().find_map(|key| query_value(&url, key));
        let connect_url = query_url(&url, CONNECT_URL_KEY);
        let configuration_url = query_url(&url, CONFIGURATION_KEY);
        let connect_query = query_value(&url, CONNECT_QUERY_KEY);

        if let (Some(action_guid), Some(connect_url)) = (action_guid, connect_url) {
            return Ok(Self::Action {
                action: ConnectAction {
                    action_guid,
                    connect_url,
                    return_to_url: query_url(&url, RETURN_TO_KEY),
                    configuration_url,
                    connect_query,
                },
            });
        }

        configuration_url
            .map(|configuration_url| Self::NewConnection {
                configuration_url,
                connect_query,
            })
            .ok_or_else(|| ScaKitError::MalformedCode {
                reason: "neither an action nor a configuration".to_string(),
            })
    }

    /// The configuration URL, for either variant.
    #[must_use]
    pub fn configuration_url(&self) -> Option<&str> {
        match self {
            Self::Action { action } => action.configuration_url.as_deref(),
            Self::NewConnection {
                configuration_url, ..
            } => Some(configuration_url),
        }
    }

    /// The connect query, for either variant.
    #[must_use]
    pub fn connect_query(&self) -> Option<&str> {
        match self {
            Self::Action { action } => action.connect_query.as_deref(),
            Self::NewConnection { connect_query, .. } => connect_query.as_deref(),
        }
    }
}

/// Parses a scanned code for foreign callers.
///
/// # Errors
/// See [`ScannedCode::parse`].
#[uniffi::export]
pub fn parse_scanned_code(raw: &str) -> Result<ScannedCode, ScaKitError> {
    ScannedCode::parse(raw)
}

/// Whether `raw` is a scanned code this engine can act on.
#[uniffi::export]
#[must_use]
pub fn is_valid_scanned_code(raw: &str) -> bool {
    ScannedCode::parse(raw).is_ok()
}

/// Final redirect of the embedded web flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectCallback {
    /// The provider issued an access token.
    Token(String),
    /// The provider reported an error.
    Error {
        /// Error class, e.g. `InvalidCredentials`.
        class: String,
        /// Human readable message, when present.
        message: Option<String>,
    },
}

impl RedirectCallback {
    /// Parses the redirect URL the web flow finished on.
    ///
    /// # Errors
    /// Returns `MalformedCode` if the URL carries neither a token nor an error.
    pub fn parse(raw: &str) -> Result<Self, ScaKitError> {
        let url = Url::parse(raw.trim()).map_err(|e| ScaKitError::MalformedCode {
            reason: format!("not a url: {e}"),
        })?;

        if let Some(token) = query_value(&url, ACCESS_TOKEN_KEY) {
            return Ok(Self::Token(token));
        }
        if let Some(class) = query_value(&url, ERROR_CLASS_KEY) {
            return Ok(Self::Error {
                class,
                message: query_value(&url, ERROR_MESSAGE_KEY),
            });
        }
        Err(ScaKitError::MalformedCode {
            reason: "redirect carries neither a token nor an error".to_string(),
        })
    }
}

/// First non-empty value of `key` in the query.
fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == key && !v.trim().is_empty())
        .map(|(_, v)| v.into_owned())
}

/// Like [`query_value`], but the value must itself be a URL. Anything else
/// counts as absent.
fn query_url(url: &Url, key: &str) -> Option<String> {
    let value = query_value(url, key)?;
    match Url::parse(&value) {
        Ok(_) => Some(value),
        Err(e) => {
            log::debug!("ignoring {key}, not a url: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn parses_action_code() {
        let code = ScannedCode::parse(
            "authenticator://saltedge.com/action?action_uuid=A1&connect_url=https://bank.example/api&return_to=https://shop.example/done",
        )
        .unwrap();

        let ScannedCode::Action { action } = code else {
            panic!("expected an action code");
        };
        assert_eq!(action.action_guid, "A1");
        assert_eq!(action.connect_url, "https://bank.example/api");
        assert_eq!(
            action.return_to_url.as_deref(),
            Some("https://shop.example/done")
        );
        assert!(action.configuration_url.is_none());
    }

    #[test]
    fn accepts_action_id_alias() {
        let code = ScannedCode::parse(
            "https://scan.example/?connect_url=https://bank.example/api&action_id=A1",
        )
        .unwrap();
        assert!(matches!(
            code,
            ScannedCode::Action { ref action } if action.action_guid == "A1"
        ));
    }

    #[test]
    fn parses_configuration_code() {
        let code = ScannedCode::parse(
            "authenticator://saltedge.com/connect?configuration=https%3A%2F%2Fbank.example%2Fconfig&connect_query=abc",
        )
        .unwrap();
        assert_eq!(
            code,
            ScannedCode::NewConnection {
                configuration_url: "https://bank.example/config".to_string(),
                connect_query: Some("abc".to_string()),
            }
        );
        assert_eq!(code.configuration_url(), Some("https://bank.example/config"));
        assert_eq!(code.connect_query(), Some("abc"));
    }

    #[test]
    fn action_without_connect_url_falls_back_to_configuration() {
        let code = ScannedCode::parse(
            "authenticator://connect?action_uuid=A1&configuration=https://bank.example/config",
        )
        .unwrap();
        assert!(matches!(code, ScannedCode::NewConnection { .. }));
    }

    #[test_case("" ; "empty")]
    #[test_case("not a url" ; "not a url")]
    #[test_case("authenticator://connect" ; "no parameters")]
    #[test_case("authenticator://connect?action_uuid=A1" ; "action without connect url")]
    #[test_case("authenticator://connect?configuration=" ; "empty configuration")]
    #[test_case("authenticator://connect?configuration=bank-config" ; "configuration not a url")]
    fn rejects_malformed_codes(raw: &str) {
        assert!(matches!(
            ScannedCode::parse(raw),
            Err(ScaKitError::MalformedCode { .. })
        ));
        assert!(!is_valid_scanned_code(raw));
    }

    #[test]
    fn invalid_return_to_is_ignored() {
        let code = ScannedCode::parse(
            "authenticator://action?action_uuid=A1&connect_url=https://bank.example/api&return_to=nowhere",
        )
        .unwrap();
        assert!(matches!(
            code,
            ScannedCode::Action { ref action } if action.return_to_url.is_none()
        ));
    }

    #[test]
    fn action_survives_unparseable_configuration() {
        let code = ScannedCode::parse(
            "authenticator://action?action_uuid=A1&connect_url=https://bank.example/api&configuration=legacy",
        )
        .unwrap();
        let ScannedCode::Action { action } = code else {
            panic!("expected an action code");
        };
        assert_eq!(action.action_guid, "A1");
        assert!(action.configuration_url.is_none());
    }

    #[test_case(
        "authenticator://connect?action_uuid=A1&connect_url=garbage&configuration=https://bank.example/config"
        ; "garbage connect url"
    )]
    #[test_case(
        "authenticator://connect?connect_url=garbage&configuration=https://bank.example/config"
        ; "garbage connect url without action"
    )]
    fn configuration_survives_unparseable_connect_url(raw: &str) {
        assert_eq!(
            ScannedCode::parse(raw).unwrap(),
            ScannedCode::NewConnection {
                configuration_url: "https://bank.example/config".to_string(),
                connect_query: None,
            }
        );
    }

    #[test]
    fn parses_redirect_callbacks() {
        assert_eq!(
            RedirectCallback::parse("authenticator://oauth/redirect?access_token=tok&state=success")
                .unwrap(),
            RedirectCallback::Token("tok".to_string())
        );
        assert_eq!(
            RedirectCallback::parse(
                "authenticator://oauth/redirect?error_class=InvalidCredentials&error_message=Wrong+password"
            )
            .unwrap(),
            RedirectCallback::Error {
                class: "InvalidCredentials".to_string(),
                message: Some("Wrong password".to_string()),
            }
        );
        assert!(RedirectCallback::parse("authenticator://oauth/redirect?state=pending").is_err());
    }
}
