#![allow(clippy::significant_drop_tightening)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::code::{ConnectAction, RedirectCallback, ScannedCode};
use super::outcome::{HandshakeFailure, HandshakeOutcome};
use super::resolve::{resolve_candidates, Resolution};
use super::state::{HandshakeEntry, HandshakeMode, HandshakeSession, HandshakeState};
use crate::client::{ConnectionResult, NetworkMonitor, SigningClient};
use crate::config::ScaKitConfig;
use crate::connection::{Connection, ConnectionStatus, ConnectionStore};
use crate::error::ScaKitError;
use crate::requests::ActionRequest;

/// Drives one connect/action handshake at a time.
///
/// Every step returns a [`HandshakeOutcome`] telling the caller what to present
/// next. Collaborator calls are the only suspension points; when the session
/// is cancelled (or replaced) while one is pending, its result is dropped and
/// [`HandshakeOutcome::Abandoned`] is returned without touching the store.
#[derive(uniffi::Object)]
pub struct ConnectCoordinator {
    store: Arc<dyn ConnectionStore>,
    client: Arc<dyn SigningClient>,
    network: Arc<dyn NetworkMonitor>,
    config: ScaKitConfig,
    inner: Mutex<CoordinatorInner>,
}

impl std::fmt::Debug for ConnectCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectCoordinator")
            .field("config", &self.config)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct CoordinatorInner {
    /// Bumped by every `start` and `cancel`; stale completions compare against it.
    generation: u64,
    state: HandshakeState,
    session: Option<HandshakeSession>,
}

#[uniffi::export(async_runtime = "tokio")]
impl ConnectCoordinator {
    /// Creates an idle coordinator.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(
        store: Arc<dyn ConnectionStore>,
        client: Arc<dyn SigningClient>,
        network: Arc<dyn NetworkMonitor>,
        config: ScaKitConfig,
    ) -> Self {
        Self {
            store,
            client,
            network,
            config,
            inner: Mutex::new(CoordinatorInner::default()),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.lock().state.clone()
    }

    /// Mode of the running session, if any.
    #[must_use]
    pub fn session_mode(&self) -> Option<HandshakeMode> {
        self.lock().session.as_ref().map(|session| session.mode)
    }

    /// Starts a handshake.
    ///
    /// # Errors
    /// Returns `HandshakeInProgress` while another session is running. Handshake
    /// failures are reported as [`HandshakeOutcome::Failed`], not as errors.
    pub async fn start(&self, entry: HandshakeEntry) -> Result<HandshakeOutcome, ScaKitError> {
        let generation = self.begin()?;
        log::info!("handshake #{generation} started from {}", entry.label());

        let deep_links_need_network = self.config.require_connectivity_for_deep_links;
        let result = match entry {
            HandshakeEntry::Reconnect { connection_id } => {
                self.reconnect(generation, connection_id).await
            }
            HandshakeEntry::Connect { raw_code } => {
                self.from_code(generation, &raw_code, true, false).await
            }
            HandshakeEntry::DeepLink { url } => {
                self.from_code(generation, &url, deep_links_need_network, false)
                    .await
            }
            HandshakeEntry::FirstConnect { raw_metadata } => {
                self.from_code(generation, &raw_metadata, deep_links_need_network, true)
                    .await
            }
        };
        Ok(self.settle(generation, result))
    }

    /// Continues a disambiguation with the connection the user picked.
    ///
    /// # Errors
    /// Returns `InvalidState` when no choice is pending and `InvalidInput` when
    /// `connection_guid` is not one of the candidates.
    pub async fn select_connection(
        &self,
        connection_guid: String,
    ) -> Result<HandshakeOutcome, ScaKitError> {
        let (generation, connection, action) = {
            let inner = self.lock();
            let (HandshakeState::Disambiguating { .. }, Some(session)) =
                (&inner.state, &inner.session)
            else {
                return Err(invalid_state("no connection choice is pending"));
            };
            let connection = session
                .candidates
                .iter()
                .find(|c| c.guid == connection_guid)
                .cloned()
                .ok_or_else(|| ScaKitError::InvalidInput {
                    attribute: "connection_guid".to_string(),
                    reason: format!("{connection_guid} is not a candidate"),
                })?;
            let action = session
                .action
                .clone()
                .ok_or_else(|| invalid_state("disambiguation without an action"))?;
            (inner.generation, connection, action)
        };

        let result = self.submit_action(generation, connection, action).await;
        Ok(self.settle(generation, result))
    }

    /// The embedded web flow issued an access token.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the session is awaiting a redirect.
    pub fn confirm_redirect(&self, access_token: String) -> Result<HandshakeOutcome, ScaKitError> {
        let (generation, connection) = self.awaiting_redirect()?;
        let result = self.finalize(generation, connection, access_token);
        Ok(self.settle(generation, result))
    }

    /// The embedded web flow reported an error.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the session is awaiting a redirect.
    pub fn fail_redirect(&self, error: String) -> Result<HandshakeOutcome, ScaKitError> {
        let (generation, _) = self.awaiting_redirect()?;
        Ok(self.settle(
            generation,
            Err(ScaKitError::ConnectionCreationFailed { error }),
        ))
    }

    /// Handles the URL the web flow finished on, see [`RedirectCallback`].
    ///
    /// # Errors
    /// Returns `MalformedCode` if the URL is not a final redirect, otherwise as
    /// [`confirm_redirect`](Self::confirm_redirect) / [`fail_redirect`](Self::fail_redirect).
    pub fn handle_redirect_callback(&self, url: String) -> Result<HandshakeOutcome, ScaKitError> {
        match RedirectCallback::parse(&url)? {
            RedirectCallback::Token(access_token) => self.confirm_redirect(access_token),
            RedirectCallback::Error { class, message } => {
                let error = match message {
                    Some(message) => format!("{class}: {message}"),
                    None => class,
                };
                self.fail_redirect(error)
            }
        }
    }

    /// Abandons the running session. Pending collaborator results are dropped.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Some(session) = inner.session.take() {
            log::info!("handshake session {} cancelled", session.id);
        }
        inner.state = HandshakeState::Idle;
    }
}

impl ConnectCoordinator {
    fn lock(&self) -> MutexGuard<'_, CoordinatorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<u64, ScaKitError> {
        let mut inner = self.lock();
        if inner.state.is_in_flight() {
            return Err(ScaKitError::HandshakeInProgress);
        }
        inner.generation += 1;
        inner.state = HandshakeState::ResolvingCode;
        inner.session = None;
        Ok(inner.generation)
    }

    /// Applies `f` if `generation` is still the current session.
    fn advance(&self, generation: u64, f: impl FnOnce(&mut CoordinatorInner)) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        f(&mut inner);
        true
    }

    /// Turns a step result into the outcome handed to the caller, moving the
    /// state machine to its terminal state when the step ended the session.
    fn settle(
        &self,
        generation: u64,
        result: Result<HandshakeOutcome, ScaKitError>,
    ) -> HandshakeOutcome {
        let mut inner = self.lock();
        if inner.generation != generation {
            log::debug!("dropping result of abandoned handshake #{generation}");
            return HandshakeOutcome::Abandoned;
        }

        let outcome = match result {
            Ok(
                outcome @ (HandshakeOutcome::SelectConnection { .. }
                | HandshakeOutcome::Redirect { .. }
                | HandshakeOutcome::Abandoned),
            ) => return outcome,
            Ok(HandshakeOutcome::Dismissed) => {
                inner.state = HandshakeState::Idle;
                HandshakeOutcome::Dismissed
            }
            Ok(outcome) => {
                inner.state = HandshakeState::Succeeded;
                outcome
            }
            Err(ScaKitError::MalformedCode { reason }) => {
                log::info!("ignoring scanned code: {reason}");
                inner.state = HandshakeState::Idle;
                HandshakeOutcome::Dismissed
            }
            Err(error) => {
                log::warn!("handshake #{generation} failed: {error}");
                let (failure, detail) = HandshakeFailure::classify(&error);
                inner.state = HandshakeState::Failed { failure };
                HandshakeOutcome::failed(failure, detail)
            }
        };

        if let Some(session) = inner.session.take() {
            log::debug!("handshake session {} ({:?}) ended", session.id, session.mode);
        }
        outcome
    }

    fn ensure_reachable(&self) -> Result<(), ScaKitError> {
        if self.network.is_reachable() {
            Ok(())
        } else {
            Err(ScaKitError::NoInternetConnection)
        }
    }

    async fn from_code(
        &self,
        generation: u64,
        raw: &str,
        needs_network: bool,
        new_connection_only: bool,
    ) -> Result<HandshakeOutcome, ScaKitError> {
        if needs_network {
            self.ensure_reachable()?;
        }
        let code = ScannedCode::parse(raw)?;

        if new_connection_only {
            let Some(configuration_url) = code.configuration_url().map(str::to_string) else {
                return Err(ScaKitError::MalformedCode {
                    reason: "onboarding codes must carry a configuration".to_string(),
                });
            };
            let connect_query = code.connect_query().map(str::to_string);
            return self
                .create_connection(generation, configuration_url, connect_query)
                .await;
        }

        match code {
            ScannedCode::Action { action } => self.resolve_action(generation, action).await,
            ScannedCode::NewConnection {
                configuration_url,
                connect_query,
            } => {
                self.create_connection(generation, configuration_url, connect_query)
                    .await
            }
        }
    }

    async fn resolve_action(
        &self,
        generation: u64,
        action: ConnectAction,
    ) -> Result<HandshakeOutcome, ScaKitError> {
        let active = self.store.active_connections()?.len();
        let matching = if active == 0 {
            Vec::new()
        } else {
            self.store
                .active_connections_by_base_url(action.connect_url.clone())?
        };

        match resolve_candidates(active, matching) {
            Resolution::NoActiveConnection => Err(ScaKitError::NoActiveConnection),
            Resolution::NoSuitableConnection => Err(ScaKitError::NoSuitableConnection {
                connect_url: action.connect_url,
            }),
            Resolution::Single(connection) => {
                self.submit_action(generation, connection, action).await
            }
            Resolution::Ambiguous(candidates) => {
                let presented = candidates.clone();
                let advanced = self.advance(generation, |inner| {
                    let mut session = HandshakeSession::new(HandshakeMode::Action);
                    session.action = Some(action);
                    session.candidates = candidates.clone();
                    inner.session = Some(session);
                    inner.state = HandshakeState::Disambiguating { candidates };
                });
                Ok(if advanced {
                    HandshakeOutcome::SelectConnection {
                        candidates: presented,
                    }
                } else {
                    HandshakeOutcome::Abandoned
                })
            }
        }
    }

    async fn submit_action(
        &self,
        generation: u64,
        connection: Connection,
        action: ConnectAction,
    ) -> Result<HandshakeOutcome, ScaKitError> {
        let request = ActionRequest::for_connection(
            &connection,
            &action.connect_url,
            &self.config.language,
            &action.action_guid,
        )?;
        let connection_guid = connection.guid.clone();
        let advanced = self.advance(generation, |inner| {
            let session = inner
                .session
                .get_or_insert_with(|| HandshakeSession::new(HandshakeMode::Action));
            session.action = Some(action.clone());
            session.selected_connection = Some(connection);
            inner.state = HandshakeState::SubmittingAction {
                connection_guid: connection_guid.clone(),
            };
        });
        if !advanced {
            return Ok(HandshakeOutcome::Abandoned);
        }

        log::info!(
            "submitting action {} with connection {connection_guid}",
            action.action_guid
        );
        let response = self.client.submit_action(request).await.map_err(|e| {
            ScaKitError::ActionSubmissionFailed {
                error: e.to_string(),
            }
        })?;

        if let Some((connection_id, authorization_id)) = response.created_authorization() {
            return Ok(HandshakeOutcome::OpenAuthorization {
                connection_id: connection_id.to_string(),
                authorization_id: authorization_id.to_string(),
            });
        }
        Ok(action
            .return_to_url
            .map_or(HandshakeOutcome::Complete, |url| {
                HandshakeOutcome::OpenExternalUrl { url }
            }))
    }

    async fn create_connection(
        &self,
        generation: u64,
        configuration_url: String,
        connect_query: Option<String>,
    ) -> Result<HandshakeOutcome, ScaKitError> {
        let advanced = self.advance(generation, |inner| {
            inner.session = Some(HandshakeSession::new(HandshakeMode::NewConnection));
            inner.state = HandshakeState::CreatingConnection;
        });
        if !advanced {
            return Ok(HandshakeOutcome::Abandoned);
        }

        log::info!("creating connection from {configuration_url}");
        let result = self
            .client
            .create_connection(configuration_url, connect_query)
            .await?;
        self.on_connection_result(generation, result)
    }

    async fn reconnect(
        &self,
        generation: u64,
        connection_id: String,
    ) -> Result<HandshakeOutcome, ScaKitError> {
        self.ensure_reachable()?;
        let Some(connection) = self.store.by_id(connection_id.clone())? else {
            log::info!("reconnect requested for unknown connection {connection_id}");
            return Ok(HandshakeOutcome::Dismissed);
        };

        let connection_guid = connection.guid.clone();
        let selected = connection.clone();
        let advanced = self.advance(generation, |inner| {
            let mut session = HandshakeSession::new(HandshakeMode::Reconnect);
            session.selected_connection = Some(selected);
            inner.session = Some(session);
            inner.state = HandshakeState::ReconnectingConnection { connection_guid };
        });
        if !advanced {
            return Ok(HandshakeOutcome::Abandoned);
        }

        let result = self.client.reconnect(connection).await?;
        self.on_connection_result(generation, result)
    }

    fn on_connection_result(
        &self,
        generation: u64,
        result: ConnectionResult,
    ) -> Result<HandshakeOutcome, ScaKitError> {
        match result {
            ConnectionResult::Success {
                connection,
                access_token,
            } => self.finalize(generation, connection, access_token),
            ConnectionResult::Redirect {
                connection,
                redirect_url,
            } => {
                let url = redirect_url.clone();
                let advanced = self.advance(generation, |inner| {
                    if let Some(session) = inner.session.as_mut() {
                        session.selected_connection = Some(connection);
                        session.pending_redirect_url = Some(redirect_url.clone());
                    }
                    inner.state = HandshakeState::AwaitingRedirect { redirect_url };
                });
                Ok(if advanced {
                    HandshakeOutcome::Redirect { url }
                } else {
                    HandshakeOutcome::Abandoned
                })
            }
            ConnectionResult::Failure { error } => {
                Err(ScaKitError::ConnectionCreationFailed { error })
            }
        }
    }

    fn awaiting_redirect(&self) -> Result<(u64, Connection), ScaKitError> {
        let inner = self.lock();
        let (HandshakeState::AwaitingRedirect { .. }, Some(session)) =
            (&inner.state, &inner.session)
        else {
            return Err(invalid_state("no redirect is pending"));
        };
        let connection = session
            .selected_connection
            .clone()
            .ok_or_else(|| invalid_state("redirect without a connection"))?;
        log::debug!(
            "session {} leaving redirect {}",
            session.id,
            session.pending_redirect_url.as_deref().unwrap_or_default()
        );
        Ok((inner.generation, connection))
    }

    /// Stores the token: the single ConnectionStore write of a handshake.
    fn finalize(
        &self,
        generation: u64,
        connection: Connection,
        access_token: String,
    ) -> Result<HandshakeOutcome, ScaKitError> {
        let mut inner = self.lock();
        if inner.generation != generation {
            return Ok(HandshakeOutcome::Abandoned);
        }
        if !matches!(
            inner.state,
            HandshakeState::AwaitingRedirect { .. }
                | HandshakeState::CreatingConnection
                | HandshakeState::ReconnectingConnection { .. }
        ) {
            log::debug!("handshake #{generation} already left the token step");
            return Ok(HandshakeOutcome::Abandoned);
        }
        inner.state = HandshakeState::Finalizing;
        self.store
            .set_access_token_and_activate(connection.clone(), access_token.clone())?;
        inner.state = HandshakeState::Succeeded;
        log::info!("connection {} activated", connection.guid);

        Ok(HandshakeOutcome::Connected {
            connection: Connection {
                access_token: Some(access_token),
                status: ConnectionStatus::Active,
                ..connection
            },
        })
    }
}

fn invalid_state(reason: &str) -> ScaKitError {
    ScaKitError::InvalidState {
        reason: reason.to_string(),
    }
}
