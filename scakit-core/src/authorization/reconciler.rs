use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::view::AuthorizationView;
use super::{AuthorizationRecord, AuthorizationStatus};
use crate::config::ScaKitConfig;
use crate::connection::ConnectionStore;
use crate::error::ScaKitError;
use crate::requests::{
    ConfirmAuthorizationRequest, ConfirmAuthorizationResponse, Geolocation, UnlockMethod,
};

/// Keeps the ordered set of authorizations shown to the user.
///
/// Server snapshots arrive through [`update`](Self::update) on every poll tick
/// and a separate timer drives [`evict_expired`](Self::evict_expired). Writes
/// must be serialized by the caller; reads may happen at any time.
#[derive(uniffi::Object)]
pub struct AuthorizationReconciler {
    view: Mutex<AuthorizationView>,
    store: Arc<dyn ConnectionStore>,
    language: String,
}

impl std::fmt::Debug for AuthorizationReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationReconciler")
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

#[uniffi::export]
impl AuthorizationReconciler {
    /// Creates an empty reconciler reading connections from `store`.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(store: Arc<dyn ConnectionStore>, config: ScaKitConfig) -> Self {
        Self {
            view: Mutex::new(AuthorizationView::new(config.final_retention_secs)),
            store,
            language: config.language,
        }
    }

    /// Merges a server snapshot taken at `now` (unix seconds).
    ///
    /// Returns whether the visible projection changed.
    pub fn update(&self, snapshot: Vec<AuthorizationRecord>, now: u64) -> bool {
        let count = snapshot.len();
        let changed = self.view().update(snapshot, now);
        if changed {
            log::debug!("authorization projection changed after snapshot of {count} records");
        }
        changed
    }

    /// Runs the retention sweep at `now`. Returns whether the projection changed.
    pub fn evict_expired(&self, now: u64) -> bool {
        self.view().evict_expired(now)
    }

    /// Records a local confirm/deny ahead of the server.
    pub fn mark_acted(
        &self,
        connection_id: &str,
        authorization_id: &str,
        status: AuthorizationStatus,
        now: u64,
    ) -> bool {
        self.view()
            .mark_acted(connection_id, authorization_id, status, now)
    }

    /// Applies the server's answer to a confirmation.
    ///
    /// Non-final statuses (pending, processing, errors) leave the record untouched.
    pub fn apply_confirm_response(
        &self,
        connection_id: &str,
        response: ConfirmAuthorizationResponse,
        now: u64,
    ) -> bool {
        match response.status.settled_status() {
            Some(status) => self.mark_acted(connection_id, &response.id, status, now),
            None => {
                log::info!(
                    "authorization {} reported {}; keeping local state",
                    response.id,
                    response.status
                );
                false
            }
        }
    }

    /// Number of visible records.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.view().records().len() as u64
    }

    /// Record at `index` in display order.
    #[must_use]
    pub fn record_at(&self, index: u64) -> Option<AuthorizationRecord> {
        let index = usize::try_from(index).ok()?;
        self.view().records().get(index).cloned()
    }

    /// Record identified by connection and authorization id.
    #[must_use]
    pub fn record(
        &self,
        connection_id: &str,
        authorization_id: &str,
    ) -> Option<AuthorizationRecord> {
        self.view().find(connection_id, authorization_id).cloned()
    }

    /// First record carrying `authorization_id`, on any connection.
    #[must_use]
    pub fn record_by_authorization_id(
        &self,
        authorization_id: &str,
    ) -> Option<AuthorizationRecord> {
        self.view()
            .records()
            .iter()
            .find(|r| r.authorization_id == authorization_id)
            .cloned()
    }

    /// Display index of a record.
    #[must_use]
    pub fn index_of(&self, connection_id: &str, authorization_id: &str) -> Option<u64> {
        self.view()
            .position(connection_id, authorization_id)
            .map(|index| index as u64)
    }

    /// The full projection in display order.
    #[must_use]
    pub fn records(&self) -> Vec<AuthorizationRecord> {
        self.view().records().to_vec()
    }

    /// Whether anything is visible.
    #[must_use]
    pub fn has_visible_records(&self) -> bool {
        !self.view().records().is_empty()
    }

    /// Whether at least one active connection exists.
    ///
    /// # Errors
    /// Returns an error if the connection store cannot be read.
    pub fn has_any_connections(&self) -> Result<bool, ScaKitError> {
        Ok(!self.store.active_connections()?.is_empty())
    }

    /// Builds the confirmation descriptor for a visible authorization.
    ///
    /// Returns `None` when the record is not visible, its connection is gone,
    /// or the connection has no access token.
    ///
    /// # Errors
    /// Returns an error if the connection store cannot be read.
    pub fn confirmation_request(
        &self,
        connection_id: &str,
        authorization_id: &str,
        confirm: bool,
        unlock_method: UnlockMethod,
        geolocation: Option<Geolocation>,
    ) -> Result<Option<ConfirmAuthorizationRequest>, ScaKitError> {
        let Some(record) = self.record(connection_id, authorization_id) else {
            return Ok(None);
        };
        let Some(connection) = self.store.by_id(record.connection_id.clone())? else {
            return Ok(None);
        };
        let Some(access_token) = connection.access_token else {
            return Ok(None);
        };

        Ok(Some(ConfirmAuthorizationRequest {
            url: connection.base_url,
            connection_guid: connection.guid,
            access_token,
            language: self.language.clone(),
            authorization_id: record.authorization_id,
            authorization_code: record.authorization_code,
            geolocation: geolocation.map(|g| g.header_value()),
            authorization_type: unlock_method.to_string(),
            confirm,
        }))
    }

    /// Drops every record and the snapshot cache.
    pub fn clear_all(&self) {
        self.view().clear();
    }
}

impl AuthorizationReconciler {
    pub(crate) fn revert(&self, connection_id: &str, authorization_id: &str) -> bool {
        self.view().revert(connection_id, authorization_id)
    }

    // The view is replaced wholesale by every write, so a poisoned lock still
    // guards a consistent value.
    fn view(&self) -> MutexGuard<'_, AuthorizationView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
