use super::Connection;
use crate::error::CollaboratorResult;

/// Durable table of [`Connection`] records, implemented by the host.
///
/// The handshake coordinator is the only component that writes through
/// [`ConnectionStore::set_access_token_and_activate`]; everything else only reads.
#[uniffi::export(with_foreign)]
pub trait ConnectionStore: Send + Sync {
    /// Returns every active connection, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn active_connections(&self) -> CollaboratorResult<Vec<Connection>>;

    /// Returns the active connections whose base URL matches `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn active_connections_by_base_url(
        &self,
        base_url: String,
    ) -> CollaboratorResult<Vec<Connection>>;

    /// Looks a connection up by its backend id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn by_id(&self, id: String) -> CollaboratorResult<Option<Connection>>;

    /// Inserts or replaces a connection, keyed by guid.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn save(&self, connection: Connection) -> CollaboratorResult<()>;

    /// Stores `access_token` on the connection and marks it active.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set_access_token_and_activate(
        &self,
        connection: Connection,
        access_token: String,
    ) -> CollaboratorResult<()>;
}
