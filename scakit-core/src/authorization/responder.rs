use std::sync::Arc;

use super::{AuthorizationReconciler, AuthorizationStatus};
use crate::client::SigningClient;
use crate::error::ScaKitError;
use crate::requests::{Geolocation, UnlockMethod};

/// Sends the user's confirm/deny decision for a visible authorization.
///
/// The record is settled locally before the request goes out, so the list
/// reflects the decision immediately; a failed request puts it back to `base`.
#[derive(uniffi::Object)]
pub struct AuthorizationResponder {
    reconciler: Arc<AuthorizationReconciler>,
    client: Arc<dyn SigningClient>,
}

impl std::fmt::Debug for AuthorizationResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationResponder")
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl AuthorizationResponder {
    /// Creates a responder acting on `reconciler`'s records.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(reconciler: Arc<AuthorizationReconciler>, client: Arc<dyn SigningClient>) -> Self {
        Self { reconciler, client }
    }

    /// Confirms (`confirm = true`) or denies an authorization at `now`.
    ///
    /// Returns the status the record ended up with.
    ///
    /// # Errors
    /// - `InvalidState` if the authorization is not visible or its connection
    ///   has no access token.
    /// - `Collaborator` if the request failed; the record is reverted.
    pub async fn respond(
        &self,
        connection_id: String,
        authorization_id: String,
        confirm: bool,
        unlock_method: UnlockMethod,
        geolocation: Option<Geolocation>,
        now: u64,
    ) -> Result<AuthorizationStatus, ScaKitError> {
        let request = self
            .reconciler
            .confirmation_request(
                &connection_id,
                &authorization_id,
                confirm,
                unlock_method,
                geolocation,
            )?
            .ok_or_else(|| ScaKitError::InvalidState {
                reason: format!("authorization {authorization_id} cannot be confirmed"),
            })?;

        let decided = if confirm {
            AuthorizationStatus::Confirmed
        } else {
            AuthorizationStatus::Denied
        };
        let marked = self
            .reconciler
            .mark_acted(&connection_id, &authorization_id, decided, now);

        match self.client.confirm_authorization(request).await {
            Ok(response) => {
                self.reconciler
                    .apply_confirm_response(&connection_id, response, now);
            }
            Err(error) => {
                log::warn!("confirmation of {authorization_id} failed: {error}");
                // A decision settled by an earlier call is not ours to undo.
                if marked {
                    self.reconciler.revert(&connection_id, &authorization_id);
                }
                return Err(error.into());
            }
        }

        Ok(self
            .reconciler
            .record(&connection_id, &authorization_id)
            .map_or(decided, |record| record.status))
    }
}
