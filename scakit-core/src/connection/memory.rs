use std::sync::{Mutex, MutexGuard};

use super::{Connection, ConnectionStatus, ConnectionStore};
use crate::error::{CollaboratorError, CollaboratorResult, ScaKitError};

/// Process-local [`ConnectionStore`] keeping connections in insertion order.
///
/// Used by the CLI and by tests; mobile hosts provide their own persistent store.
#[derive(Debug, Default)]
pub struct InMemoryConnectionStore {
    connections: Mutex<Vec<Connection>>,
}

impl InMemoryConnectionStore {
    /// Creates a store seeded with `connections`.
    #[must_use]
    pub const fn new(connections: Vec<Connection>) -> Self {
        Self {
            connections: Mutex::new(connections),
        }
    }

    /// Creates a store from a JSON array of connections.
    ///
    /// # Errors
    /// Returns `SerializationError` if the JSON is not an array of connections.
    pub fn from_json(json: &str) -> Result<Self, ScaKitError> {
        let connections: Vec<Connection> =
            serde_json::from_str(json).map_err(|e| ScaKitError::SerializationError {
                error: format!("invalid connections json: {e}"),
            })?;
        Ok(Self::new(connections))
    }

    /// Returns a copy of every stored connection, active or not.
    ///
    /// # Errors
    /// Returns an error if the store mutex is poisoned.
    pub fn all(&self) -> CollaboratorResult<Vec<Connection>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> CollaboratorResult<MutexGuard<'_, Vec<Connection>>> {
        self.connections
            .lock()
            .map_err(|_| CollaboratorError::Storage("mutex poisoned".to_string()))
    }
}

impl ConnectionStore for InMemoryConnectionStore {
    fn active_connections(&self) -> CollaboratorResult<Vec<Connection>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|c| c.is_active())
            .cloned()
            .collect())
    }

    fn active_connections_by_base_url(
        &self,
        base_url: String,
    ) -> CollaboratorResult<Vec<Connection>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|c| c.is_active() && c.serves(&base_url))
            .cloned()
            .collect())
    }

    fn by_id(&self, id: String) -> CollaboratorResult<Option<Connection>> {
        Ok(self.lock()?.iter().find(|c| c.id == id).cloned())
    }

    fn save(&self, connection: Connection) -> CollaboratorResult<()> {
        let mut connections = self.lock()?;
        match connections.iter_mut().find(|c| c.guid == connection.guid) {
            Some(existing) => *existing = connection,
            None => connections.push(connection),
        }
        Ok(())
    }

    fn set_access_token_and_activate(
        &self,
        connection: Connection,
        access_token: String,
    ) -> CollaboratorResult<()> {
        let mut connections = self.lock()?;
        let updated = Connection {
            access_token: Some(access_token),
            status: ConnectionStatus::Active,
            ..connection
        };
        match connections.iter_mut().find(|c| c.guid == updated.guid) {
            Some(existing) => *existing = updated,
            None => connections.push(updated),
        }
        Ok(())
    }
}
