use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    error::IdentityError,
    models::{LoginRequest, UserSummary},
    session::{
        identity::IdentityState,
        state::{AuthAction, AuthStore},
    },
};

/// CheckOutcome
///
/// What a call to `Rehydrator::check` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The Identity Service confirmed a session.
    LoggedIn,
    /// Non-OK response or network failure; published as logged out.
    LoggedOut,
    /// No request was made, or its answer was discarded.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    LoggingOut,
    AlreadyChecked,
    InFlight,
    /// A logout started or finished while the request was out; its answer is dropped.
    Superseded,
}

/// Rehydrator
///
/// Establishes the authoritative session state once per application load by asking
/// the Identity Service, and owns the explicit login and logout flows so every
/// mutation of the store is serialised through one place.
pub struct Rehydrator {
    store: AuthStore,
    identity: IdentityState,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the check finishes or its future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Rehydrator {
    pub fn new(store: AuthStore, identity: IdentityState) -> Self {
        Self {
            store,
            identity,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    /// check
    ///
    /// Runs the session check unless a logout is in progress, the check already
    /// completed, or another check is pending. Issues at most one request and never
    /// retries. Failures are logged and published as logged out; they are never
    /// returned to the caller.
    pub async fn check(&self) -> CheckOutcome {
        let state = self.store.snapshot();
        if state.is_logging_out {
            return CheckOutcome::Skipped(SkipReason::LoggingOut);
        }
        if state.has_checked_auth {
            return CheckOutcome::Skipped(SkipReason::AlreadyChecked);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return CheckOutcome::Skipped(SkipReason::InFlight);
        }
        let _in_flight = InFlight(&self.in_flight);

        tracing::debug!("checking session with identity service");
        let result = self.identity.current_session().await;

        // A logout that began (or completed) meanwhile takes precedence.
        let state = self.store.snapshot();
        if state.is_logging_out || state.has_checked_auth {
            tracing::debug!("session check superseded by logout");
            return CheckOutcome::Skipped(SkipReason::Superseded);
        }

        match result {
            Ok(user) => {
                tracing::info!(email = %user.email, user_type = %user.user_type, "session confirmed");
                self.store.dispatch(AuthAction::SetAuthStatus {
                    is_logged_in: true,
                    user: Some(user),
                });
                CheckOutcome::LoggedIn
            }
            Err(e) => {
                tracing::warn!(error = %e, "auth check failed, treating as logged out");
                self.store.dispatch(AuthAction::SetAuthStatus {
                    is_logged_in: false,
                    user: None,
                });
                CheckOutcome::LoggedOut
            }
        }
    }

    /// login
    ///
    /// Explicit login. The user is stored on success; the error is returned as-is on
    /// failure and the store is left untouched.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<UserSummary, IdentityError> {
        match self.identity.login(credentials).await {
            Ok(user) => {
                tracing::info!(email = %user.email, "login successful");
                self.store
                    .dispatch(AuthAction::SetCredentials { user: user.clone() });
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                Err(e)
            }
        }
    }

    /// logout
    ///
    /// Raises the logging-out flag first so no session check starts, asks the backend
    /// to clear its cookie, and clears the local session whether or not that worked.
    pub async fn logout(&self) {
        self.store.dispatch(AuthAction::StartLogout);

        match self.identity.logout().await {
            Ok(()) => tracing::info!("logout successful"),
            Err(e) => tracing::warn!(error = %e, "logout request failed, clearing local session anyway"),
        }

        self.store.dispatch(AuthAction::Logout);
    }
}
