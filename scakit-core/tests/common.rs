#![allow(dead_code, missing_docs)]

//! Common test utilities shared across integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scakit_core::{
    ActionRequest, ActionResponse, CollaboratorError, CollaboratorResult,
    ConfirmAuthorizationRequest, ConfirmAuthorizationResponse, ConfirmationStatus, Connection,
    ConnectionResult, ConnectionStatus, ConnectionStore, InMemoryConnectionStore, NetworkMonitor,
    SigningClient,
};
use tokio::sync::Notify;

pub const BANK_URL: &str = "https://bank.example/api";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn connection(guid: &str, base_url: &str, created_at: u64) -> Connection {
    Connection {
        guid: guid.to_string(),
        id: format!("id-{guid}"),
        base_url: base_url.to_string(),
        access_token: Some(format!("token-{guid}")),
        name: guid.to_uppercase(),
        status: ConnectionStatus::Active,
        created_at,
    }
}

pub fn inactive(mut connection: Connection) -> Connection {
    connection.status = ConnectionStatus::Inactive;
    connection.access_token = None;
    connection
}

/// [`InMemoryConnectionStore`] that records every activation.
#[derive(Debug, Default)]
pub struct RecordingConnectionStore {
    inner: InMemoryConnectionStore,
    activations: Mutex<Vec<(String, String)>>,
    fail_writes: bool,
}

impl RecordingConnectionStore {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            inner: InMemoryConnectionStore::new(connections),
            ..Self::default()
        }
    }

    pub fn failing_writes(connections: Vec<Connection>) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(connections)
        }
    }

    /// `(guid, access_token)` of every `set_access_token_and_activate` call.
    pub fn activations(&self) -> Vec<(String, String)> {
        self.activations.lock().unwrap().clone()
    }

    pub fn all(&self) -> Vec<Connection> {
        self.inner.all().unwrap()
    }
}

impl ConnectionStore for RecordingConnectionStore {
    fn active_connections(&self) -> CollaboratorResult<Vec<Connection>> {
        self.inner.active_connections()
    }

    fn active_connections_by_base_url(
        &self,
        base_url: String,
    ) -> CollaboratorResult<Vec<Connection>> {
        self.inner.active_connections_by_base_url(base_url)
    }

    fn by_id(&self, id: String) -> CollaboratorResult<Option<Connection>> {
        self.inner.by_id(id)
    }

    fn save(&self, connection: Connection) -> CollaboratorResult<()> {
        self.inner.save(connection)
    }

    fn set_access_token_and_activate(
        &self,
        connection: Connection,
        access_token: String,
    ) -> CollaboratorResult<()> {
        self.activations
            .lock()
            .unwrap()
            .push((connection.guid.clone(), access_token.clone()));
        if self.fail_writes {
            return Err(CollaboratorError::Storage("disk full".to_string()));
        }
        self.inner
            .set_access_token_and_activate(connection, access_token)
    }
}

/// Signing client answering from a script.
///
/// With [`ScriptedSigningClient::gated`], connection calls park until
/// [`Gate::release`] so tests can interleave `cancel`.
#[derive(Debug)]
pub struct ScriptedSigningClient {
    action_response: CollaboratorResult<ActionResponse>,
    connection_result: CollaboratorResult<ConnectionResult>,
    confirm_response: CollaboratorResult<ConfirmAuthorizationResponse>,
    submitted: Mutex<Vec<ActionRequest>>,
    confirmations: Mutex<Vec<ConfirmAuthorizationRequest>>,
    created: Mutex<Vec<(String, Option<String>)>>,
    reconnected: Mutex<Vec<String>>,
    gate: Option<Arc<Gate>>,
}

impl Default for ScriptedSigningClient {
    fn default() -> Self {
        Self {
            action_response: Ok(ActionResponse::default()),
            connection_result: Ok(ConnectionResult::Failure {
                error: "not scripted".to_string(),
            }),
            confirm_response: Err(CollaboratorError::Network("not scripted".to_string())),
            submitted: Mutex::default(),
            confirmations: Mutex::default(),
            created: Mutex::default(),
            reconnected: Mutex::default(),
            gate: None,
        }
    }
}

impl ScriptedSigningClient {
    pub fn with_action_response(mut self, response: CollaboratorResult<ActionResponse>) -> Self {
        self.action_response = response;
        self
    }

    pub fn with_connection_result(mut self, result: CollaboratorResult<ConnectionResult>) -> Self {
        self.connection_result = result;
        self
    }

    pub fn with_confirm_status(mut self, id: &str, status: ConfirmationStatus) -> Self {
        self.confirm_response = Ok(ConfirmAuthorizationResponse {
            id: id.to_string(),
            status,
        });
        self
    }

    pub fn with_confirm_error(mut self, error: CollaboratorError) -> Self {
        self.confirm_response = Err(error);
        self
    }

    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn submitted(&self) -> Vec<ActionRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn confirmations(&self) -> Vec<ConfirmAuthorizationRequest> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(String, Option<String>)> {
        self.created.lock().unwrap().clone()
    }

    pub fn reconnected(&self) -> Vec<String> {
        self.reconnected.lock().unwrap().clone()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }
}

#[async_trait]
impl SigningClient for ScriptedSigningClient {
    async fn submit_action(&self, request: ActionRequest) -> CollaboratorResult<ActionResponse> {
        self.submitted.lock().unwrap().push(request);
        self.pass_gate().await;
        self.action_response.clone()
    }

    async fn confirm_authorization(
        &self,
        request: ConfirmAuthorizationRequest,
    ) -> CollaboratorResult<ConfirmAuthorizationResponse> {
        self.confirmations.lock().unwrap().push(request);
        self.confirm_response.clone()
    }

    async fn create_connection(
        &self,
        configuration_url: String,
        connect_query: Option<String>,
    ) -> CollaboratorResult<ConnectionResult> {
        self.created
            .lock()
            .unwrap()
            .push((configuration_url, connect_query));
        self.pass_gate().await;
        self.connection_result.clone()
    }

    async fn reconnect(&self, connection: Connection) -> CollaboratorResult<ConnectionResult> {
        self.reconnected.lock().unwrap().push(connection.guid);
        self.pass_gate().await;
        self.connection_result.clone()
    }
}

/// Pair of signals parking a scripted call.
#[derive(Debug, Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Waits until a call reached the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the parked call continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StaticNetwork(pub bool);

impl NetworkMonitor for StaticNetwork {
    fn is_reachable(&self) -> bool {
        self.0
    }
}
