//! Access-token lifecycle.
//!
//! A [`SessionGuard`] is created with the auth context and shared via `Arc`
//! with every pipeline that needs a token. It is the only place the session
//! is mutated.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, info, warn};

use congregate_types::api::{Claims, RefreshRequest, RefreshResponse, TokenPair};

use crate::ui::{Navigator, Route};

pub const REFRESH_PATH: &str = "/api/v2/auth/refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Valid,
    Refreshing,
    Expired,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh rejected with status {0}")]
    Rejected(u16),
    #[error("refresh request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Exchanges a refresh token for a new token pair.
pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<TokenPair, RefreshError>>;
}

/// Refreshes tokens against the backend's refresh endpoint.
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTokenRefresher {
    pub fn new(client: reqwest::Client, api_base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", api_base_url.trim_end_matches('/'), REFRESH_PATH),
            api_key: api_key.to_string(),
        }
    }
}

impl TokenRefresher for HttpTokenRefresher {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, Result<TokenPair, RefreshError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .header(crate::pipeline::API_KEY_HEADER, &self.api_key)
                .json(&RefreshRequest {
                    refresh_token: refresh_token.to_string(),
                })
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(RefreshError::Rejected(status.as_u16()));
            }
            let body: RefreshResponse = response.json().await?;
            Ok(body.data)
        })
    }
}

#[derive(Debug, Default)]
struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

struct Inner {
    state: SessionState,
    session: Session,
    /// Set once the login redirect for the current lifecycle has been sent.
    redirected: bool,
}

impl Inner {
    fn check(&self, now: DateTime<Utc>, skew: chrono::Duration) -> Check {
        match self.state {
            SessionState::NoSession | SessionState::Expired => Check::Dead,
            SessionState::Valid | SessionState::Refreshing => {
                let Some(token) = self.session.access_token.clone() else {
                    return Check::Dead;
                };
                match self.session.expires_at {
                    Some(expires_at) if now + skew >= expires_at => Check::NeedsRefresh,
                    _ => Check::Ready(token),
                }
            }
        }
    }

    fn expire(&mut self) {
        self.state = SessionState::Expired;
        self.session.access_token = None;
        self.session.expires_at = None;
    }

    /// Applies a finished refresh. A session torn down or replaced while the
    /// refresh was in flight is left alone.
    fn settle(&mut self, outcome: Result<TokenPair, RefreshError>) -> Option<String> {
        if self.state != SessionState::Refreshing {
            debug!("Session changed during refresh, dropping result");
            return None;
        }
        match outcome {
            Ok(tokens) => {
                let expires_at = token_expiry(&tokens.access_token);
                self.session.access_token = Some(tokens.access_token.clone());
                if tokens.refresh_token.is_some() {
                    self.session.refresh_token = tokens.refresh_token;
                }
                self.session.expires_at = expires_at;
                self.state = SessionState::Valid;
                info!(expires_at = ?expires_at, "Access token refreshed");
                Some(tokens.access_token)
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                self.expire();
                None
            }
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Check {
    Ready(String),
    NeedsRefresh,
    Dead,
}

pub struct SessionGuard {
    inner: Arc<Mutex<Inner>>,
    /// Held by the refresh task for the whole duration of a refresh.
    refresh_gate: Arc<tokio::sync::Mutex<()>>,
    refresher: Arc<dyn TokenRefresher>,
    navigator: Arc<dyn Navigator>,
    refresh_skew: chrono::Duration,
}

impl SessionGuard {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        navigator: Arc<dyn Navigator>,
        refresh_skew: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::NoSession,
                session: Session::default(),
                redirected: false,
            })),
            refresh_gate: Arc::new(tokio::sync::Mutex::new(())),
            refresher,
            navigator,
            refresh_skew: chrono::Duration::from_std(refresh_skew).unwrap_or(chrono::Duration::zero()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }

    pub fn state(&self) -> SessionState {
        self.inner().state
    }

    /// Installs a freshly issued token pair, replacing any previous session.
    pub fn establish(&self, tokens: TokenPair) {
        let expires_at = token_expiry(&tokens.access_token);
        let mut inner = self.inner();
        inner.session = Session {
            access_token: Some(tokens.access_token),
            refresh_token: tokens.refresh_token,
            expires_at,
        };
        inner.state = SessionState::Valid;
        inner.redirected = false;
        info!(expires_at = ?expires_at, "Session established");
    }

    /// Tears the session down without redirecting.
    pub fn logout(&self) {
        let mut inner = self.inner();
        inner.session = Session::default();
        inner.state = SessionState::NoSession;
        inner.redirected = false;
        info!("Session closed");
    }

    fn check(&self) -> Check {
        self.inner().check(Utc::now(), self.refresh_skew)
    }

    /// Returns a usable access token, refreshing it first when it is at or
    /// near expiry. `None` means the session is gone; this never errors.
    ///
    /// The refresh runs on its own task, so a caller that is dropped midway
    /// does not abort it. Callers that arrive while a refresh is running wait
    /// for it and see its result instead of starting another one.
    pub async fn get_valid_access_token(&self) -> Option<String> {
        match self.check() {
            Check::Ready(token) => return Some(token),
            Check::Dead => return None,
            Check::NeedsRefresh => {}
        }

        let gate = self.refresh_gate.clone().lock_owned().await;

        // Whoever held the gate before us may already have settled it.
        match self.check() {
            Check::Ready(token) => return Some(token),
            Check::Dead => return None,
            Check::NeedsRefresh => {}
        }

        let refresh_token = {
            let mut inner = self.inner();
            inner.state = SessionState::Refreshing;
            inner.session.refresh_token.clone()
        };
        let Some(refresh_token) = refresh_token else {
            warn!("Access token expired and no refresh token is held");
            self.inner().expire();
            return None;
        };

        debug!("Refreshing access token");
        let inner = self.inner.clone();
        let refresher = self.refresher.clone();
        let task = tokio::spawn(async move {
            let outcome = refresher.refresh(&refresh_token).await;
            let token = lock(&inner).settle(outcome);
            drop(gate);
            token
        });

        match task.await {
            Ok(token) => token,
            Err(e) => {
                warn!("Refresh task failed: {}", e);
                let mut inner = self.inner();
                if inner.state == SessionState::Refreshing {
                    inner.expire();
                }
                None
            }
        }
    }

    /// Drops the session and sends the user to the login screen. Repeated
    /// calls within one session lifecycle redirect only once.
    pub fn handle_expired_token(&self) {
        let redirect = {
            let mut inner = self.inner();
            inner.session = Session::default();
            inner.state = SessionState::NoSession;
            !std::mem::replace(&mut inner.redirected, true)
        };
        if redirect {
            info!("Session expired, redirecting to login");
            self.navigator.redirect(Route::Login);
        }
    }
}

/// Reads the `exp` claim of a JWT without verifying its signature. Opaque or
/// claim-less tokens have no known expiry.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::from_timestamp(data.claims.exp as i64, 0)
}
