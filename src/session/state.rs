use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use ts_rs::TS;

use crate::models::{UserSummary, UserType};

/// SessionState
///
/// The client-held record of who is logged in. Created fresh on every application
/// load and never persisted. It is the single source of truth for rendering
/// decisions; the edge guard's verdict is a separate pre-filter and may disagree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionState {
    pub user: Option<UserSummary>,
    pub is_logged_in: bool,
    pub has_checked_auth: bool,
    pub is_logging_out: bool,
}

/// AuthAction
///
/// The closed set of mutations the store accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    /// Explicit login succeeded. Leaves `has_checked_auth` false so the next
    /// rehydration pass re-confirms against the Identity Service.
    SetCredentials { user: UserSummary },
    /// Result of an authoritative session check.
    SetAuthStatus {
        is_logged_in: bool,
        user: Option<UserSummary>,
    },
    /// Raised before the logout request goes out so no check races it.
    StartLogout,
    /// Local session cleared.
    Logout,
}

/// GateView
///
/// What the application shell renders for a given session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateView {
    /// Blocking "Checking authentication..." screen. No protected content yet.
    CheckingAuthentication,
    Ready,
}

impl SessionState {
    /// apply
    ///
    /// The reducer. Every state transition in the store goes through here.
    pub fn apply(&mut self, action: AuthAction) {
        match action {
            AuthAction::SetCredentials { user } => {
                self.user = Some(user);
                self.is_logged_in = true;
                self.has_checked_auth = false;
            }
            AuthAction::SetAuthStatus { is_logged_in, user } => {
                self.is_logged_in = is_logged_in;
                self.user = user;
                self.has_checked_auth = true;
            }
            AuthAction::StartLogout => {
                self.is_logging_out = true;
            }
            AuthAction::Logout => {
                self.user = None;
                self.is_logged_in = false;
                self.has_checked_auth = true;
                self.is_logging_out = false;
            }
        }
    }

    pub fn user_type(&self) -> Option<UserType> {
        self.user.as_ref().map(|u| u.user_type)
    }

    /// True iff the current user is ADMIN or SUPERADMIN. Always false when logged out.
    pub fn is_admin(&self) -> bool {
        self.is_logged_in && self.user_type().is_some_and(UserType::is_admin)
    }

    pub fn view(&self) -> GateView {
        if !self.has_checked_auth && !self.is_logging_out {
            GateView::CheckingAuthentication
        } else {
            GateView::Ready
        }
    }
}

/// AuthStore
///
/// Injectable container for the session state. Cheap to clone; every clone shares
/// the same state. Consumers read through the selectors or `subscribe()` to be told
/// about changes; mutation only happens through `dispatch`.
#[derive(Clone, Debug)]
pub struct AuthStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new(SessionState::default())
    }
}

impl AuthStore {
    pub fn new(initial: SessionState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Applies `action`, notifying subscribers only if the state actually changed.
    pub fn dispatch(&self, action: AuthAction) {
        tracing::debug!(?action, "auth store dispatch");
        self.tx.send_if_modified(|state| {
            let before = state.clone();
            state.apply(action);
            *state != before
        });
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    // --- Selectors ---

    pub fn is_logged_in(&self) -> bool {
        self.tx.borrow().is_logged_in
    }

    pub fn current_user(&self) -> Option<UserSummary> {
        self.tx.borrow().user.clone()
    }

    pub fn user_email(&self) -> Option<String> {
        self.tx.borrow().user.as_ref().map(|u| u.email.clone())
    }

    pub fn user_type(&self) -> Option<UserType> {
        self.tx.borrow().user_type()
    }

    pub fn has_checked_auth(&self) -> bool {
        self.tx.borrow().has_checked_auth
    }

    pub fn is_logging_out(&self) -> bool {
        self.tx.borrow().is_logging_out
    }

    pub fn is_admin(&self) -> bool {
        self.tx.borrow().is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(user_type: UserType) -> UserSummary {
        UserSummary {
            id: 7,
            email: "maker@example.com".to_string(),
            user_type,
            ..Default::default()
        }
    }

    #[test]
    fn initial_state_is_logged_out_and_unchecked() {
        let store = AuthStore::default();
        assert!(!store.is_logged_in());
        assert!(!store.has_checked_auth());
        assert!(!store.is_logging_out());
        assert_eq!(store.current_user(), None);
        assert_eq!(store.snapshot().view(), GateView::CheckingAuthentication);
    }

    #[test]
    fn set_auth_status_marks_checked() {
        let store = AuthStore::default();
        store.dispatch(AuthAction::SetAuthStatus {
            is_logged_in: true,
            user: Some(user(UserType::Normal)),
        });
        let state = store.snapshot();
        assert!(state.is_logged_in);
        assert!(state.has_checked_auth);
        assert_eq!(state.view(), GateView::Ready);
        assert_eq!(store.user_email().as_deref(), Some("maker@example.com"));
    }

    #[test]
    fn set_credentials_requires_a_recheck() {
        let store = AuthStore::default();
        store.dispatch(AuthAction::SetCredentials {
            user: user(UserType::Instructor),
        });
        assert!(store.is_logged_in());
        assert!(!store.has_checked_auth());
        assert_eq!(store.user_type(), Some(UserType::Instructor));
    }

    #[test]
    fn logout_clears_user_and_flag() {
        let store = AuthStore::default();
        store.dispatch(AuthAction::SetAuthStatus {
            is_logged_in: true,
            user: Some(user(UserType::Admin)),
        });
        store.dispatch(AuthAction::StartLogout);
        assert!(store.is_logging_out());
        assert_eq!(store.snapshot().view(), GateView::Ready);

        store.dispatch(AuthAction::Logout);
        let state = store.snapshot();
        assert_eq!(state.user, None);
        assert!(!state.is_logged_in);
        assert!(state.has_checked_auth);
        assert!(!state.is_logging_out);
    }

    #[test]
    fn is_admin_only_for_elevated_user_types() {
        for (user_type, expected) in [
            (UserType::Normal, false),
            (UserType::Instructor, false),
            (UserType::Admin, true),
            (UserType::Superadmin, true),
        ] {
            let store = AuthStore::default();
            store.dispatch(AuthAction::SetAuthStatus {
                is_logged_in: true,
                user: Some(user(user_type)),
            });
            assert_eq!(store.is_admin(), expected, "{user_type}");
        }
        assert!(!AuthStore::default().is_admin());
    }

    #[tokio::test]
    async fn subscribers_see_changes_but_not_no_ops() {
        let store = AuthStore::default();
        let mut rx = store.subscribe();

        store.dispatch(AuthAction::StartLogout);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_logging_out);

        store.dispatch(AuthAction::StartLogout);
        assert!(!rx.has_changed().unwrap());
    }
}
