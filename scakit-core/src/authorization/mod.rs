//! Authorization records and their reconciliation against server snapshots.

mod reconciler;
mod record;
mod responder;
pub mod view;

pub use reconciler::AuthorizationReconciler;
pub use record::{AuthorizationRecord, AuthorizationStatus};
pub use responder::AuthorizationResponder;
pub use view::AuthorizationView;
