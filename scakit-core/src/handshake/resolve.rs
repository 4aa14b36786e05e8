use std::collections::HashSet;

use crate::connection::Connection;

/// Which connection(s) an action code resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The device has no active connection.
    NoActiveConnection,
    /// No active connection serves the code's connect URL.
    NoSuitableConnection,
    /// Exactly one candidate; submit directly.
    Single(Connection),
    /// Several candidates, in creation order; the user picks one.
    Ambiguous(Vec<Connection>),
}

/// Resolves an action code given the number of active connections and the
/// connections the store matched against its connect URL.
///
/// Inactive and duplicate (same guid) matches are discarded; the rest is
/// ordered by creation time, ties keeping the store's order.
#[must_use]
pub fn resolve_candidates(active_connections: usize, matching: Vec<Connection>) -> Resolution {
    if active_connections == 0 {
        return Resolution::NoActiveConnection;
    }

    let mut seen = HashSet::new();
    let mut candidates: Vec<Connection> = matching
        .into_iter()
        .filter(|c| c.is_active() && seen.insert(c.guid.clone()))
        .collect();
    candidates.sort_by_key(|c| c.created_at);

    match candidates.len() {
        0 => Resolution::NoSuitableConnection,
        1 => candidates
            .pop()
            .map_or(Resolution::NoSuitableConnection, Resolution::Single),
        _ => Resolution::Ambiguous(candidates),
    }
}
