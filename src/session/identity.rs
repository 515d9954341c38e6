use async_trait::async_trait;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Notify;

use crate::{
    error::IdentityError,
    models::{AuthenticationResponse, LoginRequest, RegisterRequest, UserSummary},
};

// 1. IdentityService Contract
/// IdentityService
///
/// The endpoint group of the backend that issues and validates sessions. The session
/// layer only depends on this trait, so tests swap in `MockIdentityService` without
/// touching the network.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// `GET /api/auth/me`. The authoritative "who am I" check.
    async fn current_session(&self) -> Result<UserSummary, IdentityError>;

    /// `POST /api/auth/login`. On success the backend also sets the token cookie.
    async fn login(&self, credentials: &LoginRequest) -> Result<UserSummary, IdentityError>;

    /// `POST /api/auth/logout`. The backend expires the token cookie.
    async fn logout(&self) -> Result<(), IdentityError>;

    /// `POST /api/auth/register`.
    async fn register(&self, request: &RegisterRequest) -> Result<(), IdentityError>;
}

/// IdentityState
///
/// The shared handle the rehydrator holds.
pub type IdentityState = Arc<dyn IdentityService>;

// 2. The Real Implementation (reqwest)
/// HttpIdentityService
///
/// Talks to the backend over HTTP. The client keeps a cookie store, so the session
/// cookie set by `login` rides along on every later call.
#[derive(Clone)]
pub struct HttpIdentityService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityService {
    pub fn new(base_url: &str) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Uses a caller-built client, e.g. one sharing a cookie jar with other requests.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/auth/{}", self.base_url, path)
    }

    async fn user_from(response: reqwest::Response) -> Result<UserSummary, IdentityError> {
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status(status.as_u16()));
        }
        let body: AuthenticationResponse = response.json().await?;
        body.user
            .ok_or_else(|| IdentityError::Decode("response carries no user".to_string()))
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn current_session(&self) -> Result<UserSummary, IdentityError> {
        let response = self.client.get(self.url("me")).send().await?;
        Self::user_from(response).await
    }

    async fn login(&self, credentials: &LoginRequest) -> Result<UserSummary, IdentityError> {
        let response = self
            .client
            .post(self.url("login"))
            .json(credentials)
            .send()
            .await?;
        Self::user_from(response).await
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        let response = self.client.post(self.url("logout")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status(status.as_u16()));
        }
        Ok(())
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.url("register"))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status(status.as_u16()));
        }
        Ok(())
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockIdentityService
///
/// Scripted stand-in for the Identity Service. `me` answers with the configured user,
/// or with the configured failure status when no user is set. Every call is counted.
#[derive(Default)]
pub struct MockIdentityService {
    /// Returned by `current_session` and `login`; `None` means "fail".
    pub user: Mutex<Option<UserSummary>>,
    /// Status used when failing. `0` simulates a transport error.
    pub failure_status: u16,
    /// Whether `logout` fails.
    pub logout_fails: bool,
    /// When set, `current_session` waits on this before answering.
    pub hold: Option<Arc<Notify>>,
    pub me_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
}

impl MockIdentityService {
    pub fn logged_in(user: UserSummary) -> Self {
        Self {
            user: Mutex::new(Some(user)),
            ..Default::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            failure_status: status,
            ..Default::default()
        }
    }

    pub fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    fn answer(&self) -> Result<UserSummary, IdentityError> {
        let user = self.user.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match (user, self.failure_status) {
            (Some(user), _) => Ok(user),
            (None, 0) => Err(IdentityError::Transport("connection refused".to_string())),
            (None, status) => Err(IdentityError::Status(status)),
        }
    }
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn current_session(&self) -> Result<UserSummary, IdentityError> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.answer()
    }

    async fn login(&self, _credentials: &LoginRequest) -> Result<UserSummary, IdentityError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.answer()
    }

    async fn logout(&self) -> Result<(), IdentityError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_fails {
            return Err(IdentityError::Status(500));
        }
        Ok(())
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<(), IdentityError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
