use tokio::sync::watch;

use crate::session::state::SessionState;

pub const LOGIN_PATH: &str = "/login";

/// Navigator
///
/// Client-side navigation as seen by the watcher: where the user is, and how to move
/// them somewhere else without a full reload.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn push(&self, path: &str);
}

/// login_redirect
///
/// Where to send the user for this state, if anywhere. Only a completed check that
/// came back logged out triggers a redirect, and never from the login page itself.
pub fn login_redirect(state: &SessionState, current_path: &str) -> Option<&'static str> {
    if state.has_checked_auth && !state.is_logged_in && current_path != LOGIN_PATH {
        Some(LOGIN_PATH)
    } else {
        None
    }
}

/// AuthStatusWatcher
///
/// Second, client-only guard layered over the edge guard: it follows the session
/// store and pushes the user to the login page once the session is known to be gone
/// (for example a stale cookie that the edge still accepted).
pub struct AuthStatusWatcher<N> {
    navigator: N,
}

impl<N: Navigator> AuthStatusWatcher<N> {
    pub fn new(navigator: N) -> Self {
        Self { navigator }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Evaluates one state against the current location and navigates if needed.
    pub fn observe(&self, state: &SessionState) -> bool {
        match login_redirect(state, &self.navigator.current_path()) {
            Some(target) => {
                tracing::info!(to = target, "session gone, navigating to login");
                self.navigator.push(target);
                true
            }
            None => false,
        }
    }

    /// run
    ///
    /// Observes the current state and then every change until every `AuthStore`
    /// handle is dropped. Take the receiver from `AuthStore::subscribe`.
    pub async fn run(&self, mut rx: watch::Receiver<SessionState>) {
        loop {
            let state = rx.borrow_and_update().clone();
            self.observe(&state);
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}
