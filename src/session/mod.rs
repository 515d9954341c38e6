/// Session Module Index
///
/// Client-side half of the authentication gate: the session store every UI
/// consumer reads, the rehydrator that fills it from the Identity Service, and the
/// watcher that sends a logged-out user back to the login page.

/// Session state, actions and the injectable store.
pub mod state;

/// The Identity Service contract, its HTTP client and a test double.
pub mod identity;

/// The once-per-load authoritative session check, plus login and logout flows.
pub mod rehydrator;

/// Redirect-to-login watcher over the store.
pub mod watcher;

pub use identity::{HttpIdentityService, IdentityService, IdentityState, MockIdentityService};
pub use rehydrator::{CheckOutcome, Rehydrator, SkipReason};
pub use state::{AuthAction, AuthStore, GateView, SessionState};
pub use watcher::{AuthStatusWatcher, Navigator, login_redirect};
