//! The reconciled, ordered projection of authorizations.
//!
//! Everything in here is pure: no I/O, time is passed in explicitly.

use std::collections::HashSet;

use super::{AuthorizationRecord, AuthorizationStatus};

/// Projection of authorizations visible to the user, plus the last applied snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationView {
    last_snapshot: Option<Vec<AuthorizationRecord>>,
    records: Vec<AuthorizationRecord>,
    final_retention_secs: u64,
}

impl AuthorizationView {
    /// Creates an empty view evicting final records after `final_retention_secs`.
    #[must_use]
    pub const fn new(final_retention_secs: u64) -> Self {
        Self {
            last_snapshot: None,
            records: Vec::new(),
            final_retention_secs,
        }
    }

    /// The ordered projection.
    #[must_use]
    pub fn records(&self) -> &[AuthorizationRecord] {
        &self.records
    }

    /// Merges a server snapshot into the projection. Returns whether the
    /// projection changed.
    ///
    /// An unchanged snapshot only runs the eviction sweep.
    pub fn update(&mut self, snapshot: Vec<AuthorizationRecord>, now: u64) -> bool {
        if self.last_snapshot.as_ref() == Some(&snapshot) {
            return self.evict_expired(now);
        }

        let merged = merge(&snapshot, &self.records, now);
        self.last_snapshot = Some(snapshot);
        self.replace(merged)
    }

    /// Flags on-screen records whose expiry passed and drops records whose
    /// retention window elapsed. Returns whether the projection changed.
    pub fn evict_expired(&mut self, now: u64) -> bool {
        let swept = evict(&self.records, now, self.final_retention_secs);
        self.replace(swept)
    }

    /// Applies a local confirm/deny before the server reflects it.
    ///
    /// Returns `false` when the record is unknown, `status` is `base`, or the
    /// record already carries `status`.
    pub fn mark_acted(
        &mut self,
        connection_id: &str,
        authorization_id: &str,
        status: AuthorizationStatus,
        now: u64,
    ) -> bool {
        if status == AuthorizationStatus::Base {
            return false;
        }
        match self
            .records
            .iter_mut()
            .find(|r| r.is(connection_id, authorization_id))
        {
            Some(record) if record.status != status => {
                record.status = status;
                record.action_time = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Puts an acted record back to `base`, e.g. after the server rejected
    /// the confirmation. Returns `false` for unknown or `base` records.
    pub fn revert(&mut self, connection_id: &str, authorization_id: &str) -> bool {
        match self
            .records
            .iter_mut()
            .find(|r| r.is(connection_id, authorization_id))
        {
            Some(record) if record.is_settled() => {
                record.status = AuthorizationStatus::Base;
                record.action_time = None;
                true
            }
            _ => false,
        }
    }

    /// Finds a record by its identity.
    #[must_use]
    pub fn find(
        &self,
        connection_id: &str,
        authorization_id: &str,
    ) -> Option<&AuthorizationRecord> {
        self.records
            .iter()
            .find(|r| r.is(connection_id, authorization_id))
    }

    /// Position of a record in the projection.
    #[must_use]
    pub fn position(&self, connection_id: &str, authorization_id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.is(connection_id, authorization_id))
    }

    /// Drops the projection and the snapshot cache.
    pub fn clear(&mut self) {
        self.last_snapshot = None;
        self.records.clear();
    }

    fn replace(&mut self, records: Vec<AuthorizationRecord>) -> bool {
        if records == self.records {
            return false;
        }
        self.records = records;
        true
    }
}

/// Merges `incoming` server records with the `previous` projection.
///
/// Incoming records past their expiry are dropped. Terminal records from the
/// previous projection survive unless the server now reports the same pair, in
/// which case the server record wins. The result is sorted by `created_at`.
#[must_use]
pub fn merge(
    incoming: &[AuthorizationRecord],
    previous: &[AuthorizationRecord],
    now: u64,
) -> Vec<AuthorizationRecord> {
    let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(incoming.len());
    let mut merged: Vec<AuthorizationRecord> = Vec::with_capacity(incoming.len());

    for record in incoming {
        if record.is_past_expiry(now) || !seen.insert(record.key()) {
            continue;
        }
        merged.push(record.clone());
    }

    // Only surviving incoming records replace a terminal one; a pair the
    // server still lists past its expiry keeps the local copy.
    merged.extend(
        previous
            .iter()
            .filter(|r| r.is_terminal() && !seen.contains(&r.key()))
            .cloned(),
    );

    merged.sort_by_key(|r| r.created_at);
    merged
}

/// Sweeps `records`: flags expired ones and drops those whose retention
/// window elapsed.
#[must_use]
pub fn evict(
    records: &[AuthorizationRecord],
    now: u64,
    final_retention_secs: u64,
) -> Vec<AuthorizationRecord> {
    records
        .iter()
        .filter_map(|record| {
            let mut record = record.clone();
            if !record.is_settled() && !record.expired && record.is_past_expiry(now) {
                record.expired = true;
            }

            if record.is_settled() {
                let acted_at = record.action_time.unwrap_or(record.expires_at);
                if now.saturating_sub(acted_at) >= final_retention_secs {
                    return None;
                }
            }
            if record.expired && now.saturating_sub(record.expires_at) >= final_retention_secs {
                return None;
            }
            Some(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETENTION: u64 = 4;

    fn record(
        connection_id: &str,
        authorization_id: &str,
        created_at: u64,
        expires_at: u64,
    ) -> AuthorizationRecord {
        AuthorizationRecord {
            authorization_id: authorization_id.to_string(),
            connection_id: connection_id.to_string(),
            created_at,
            expires_at,
            status: AuthorizationStatus::Base,
            authorization_code: None,
            action_time: None,
            expired: false,
        }
    }

    fn ids(view: &AuthorizationView) -> Vec<&str> {
        view.records()
            .iter()
            .map(|r| r.authorization_id.as_str())
            .collect()
    }

    #[test]
    fn same_snapshot_twice_is_not_a_change() {
        let mut view = AuthorizationView::new(RETENTION);
        let snapshot = vec![record("1", "a", 10, 500), record("1", "b", 20, 500)];

        assert!(view.update(snapshot.clone(), 100));
        assert!(!view.update(snapshot, 101));
    }

    #[test]
    fn expired_incoming_records_are_never_shown() {
        let mut view = AuthorizationView::new(RETENTION);
        let snapshot = vec![record("1", "old", 10, 99), record("1", "fresh", 20, 500)];

        view.update(snapshot, 100);

        assert_eq!(ids(&view), vec!["fresh"]);
    }

    #[test]
    fn projection_is_sorted_by_creation_time() {
        let mut view = AuthorizationView::new(RETENTION);
        let snapshot = vec![
            record("2", "c", 30, 500),
            record("1", "a", 10, 500),
            record("1", "b", 20, 500),
        ];

        view.update(snapshot, 100);

        assert_eq!(ids(&view), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_pairs_in_a_snapshot_are_collapsed() {
        let mut view = AuthorizationView::new(RETENTION);
        let snapshot = vec![record("1", "a", 10, 500), record("1", "a", 10, 500)];

        view.update(snapshot, 100);

        assert_eq!(view.records().len(), 1);
    }

    #[test]
    fn same_authorization_id_on_different_connections_is_distinct() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 500), record("2", "a", 11, 500)], 100);
        assert!(view.mark_acted("1", "a", AuthorizationStatus::Confirmed, 101));

        // Server drops ("1", "a") but still lists ("2", "a").
        view.update(vec![record("2", "a", 11, 500)], 102);

        assert_eq!(view.records().len(), 2);
        assert_eq!(
            view.find("1", "a").map(|r| r.status),
            Some(AuthorizationStatus::Confirmed)
        );
    }

    #[test]
    fn acted_record_survives_until_retention_elapses() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 500)], 100);
        assert!(view.mark_acted("1", "a", AuthorizationStatus::Confirmed, 100));

        // The next poll no longer lists the authorization.
        assert!(!view.update(Vec::new(), 101));
        assert_eq!(ids(&view), vec!["a"]);

        assert!(!view.evict_expired(103));
        assert!(view.evict_expired(104));
        assert!(view.records().is_empty());
    }

    #[test]
    fn server_record_wins_when_present() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 500)], 100);
        view.mark_acted("1", "a", AuthorizationStatus::Confirmed, 100);

        let mut denied = record("1", "a", 10, 500);
        denied.status = AuthorizationStatus::Denied;
        denied.action_time = Some(101);
        assert!(view.update(vec![denied], 101));

        assert_eq!(view.records().len(), 1);
        assert_eq!(view.records()[0].status, AuthorizationStatus::Denied);
    }

    #[test]
    fn expiry_on_screen_is_flagged_then_evicted() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 200)], 100);

        assert!(view.evict_expired(201));
        assert!(view.records()[0].expired);

        // Flagged records are carried over snapshots that omit them.
        view.update(Vec::new(), 202);
        assert_eq!(ids(&view), vec!["a"]);

        assert!(view.evict_expired(204));
        assert!(view.records().is_empty());
    }

    #[test]
    fn acted_record_listed_past_expiry_keeps_local_copy() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 105)], 100);
        assert!(view.mark_acted("1", "a", AuthorizationStatus::Confirmed, 104));

        // The lagging server still lists "a", now past its expiry.
        view.update(vec![record("1", "a", 10, 105), record("1", "b", 20, 500)], 106);

        assert_eq!(ids(&view), vec!["a", "b"]);
        assert_eq!(
            view.find("1", "a").map(|r| r.status),
            Some(AuthorizationStatus::Confirmed)
        );
        assert!(!view.evict_expired(107));
        assert!(view.evict_expired(108));
        assert_eq!(ids(&view), vec!["b"]);
    }

    #[test]
    fn flagged_record_listed_past_expiry_keeps_local_copy() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 200)], 100);
        assert!(view.evict_expired(201));

        view.update(vec![record("1", "a", 10, 200), record("1", "b", 20, 500)], 202);

        assert_eq!(ids(&view), vec!["a", "b"]);
        assert!(view.find("1", "a").is_some_and(|r| r.expired));
        assert!(view.evict_expired(204));
        assert_eq!(ids(&view), vec!["b"]);
    }

    #[test]
    fn base_record_omitted_by_server_disappears() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 500)], 100);

        assert!(view.update(Vec::new(), 101));
        assert!(view.records().is_empty());
    }

    #[test]
    fn revert_restores_base() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 500)], 100);

        assert!(!view.revert("1", "a"));
        assert!(view.mark_acted("1", "a", AuthorizationStatus::Confirmed, 101));
        assert!(view.revert("1", "a"));

        let record = view.find("1", "a").unwrap();
        assert_eq!(record.status, AuthorizationStatus::Base);
        assert!(record.action_time.is_none());
    }

    #[test]
    fn mark_acted_ignores_unknown_and_base() {
        let mut view = AuthorizationView::new(RETENTION);
        view.update(vec![record("1", "a", 10, 500)], 100);

        assert!(!view.mark_acted("1", "missing", AuthorizationStatus::Denied, 100));
        assert!(!view.mark_acted("1", "a", AuthorizationStatus::Base, 100));
        assert!(view.mark_acted("1", "a", AuthorizationStatus::Denied, 100));
        assert!(!view.mark_acted("1", "a", AuthorizationStatus::Denied, 101));
        assert_eq!(view.find("1", "a").and_then(|r| r.action_time), Some(100));
    }

    #[test]
    fn clear_resets_snapshot_cache() {
        let mut view = AuthorizationView::new(RETENTION);
        let snapshot = vec![record("1", "a", 10, 500)];
        view.update(snapshot.clone(), 100);
        view.clear();

        assert!(view.records().is_empty());
        assert!(view.update(snapshot, 101));
    }
}
