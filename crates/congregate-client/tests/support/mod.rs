#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use futures_util::future::BoxFuture;
use jsonwebtoken::{EncodingKey, Header, encode};

use congregate_client::pipeline::RequestPipeline;
use congregate_client::session::{RefreshError, SessionGuard, TokenRefresher};
use congregate_client::ui::{Navigator, Notification, Notifier, Route};
use congregate_client::ClientConfig;
use congregate_types::api::{Claims, TokenPair};

pub const API_KEY: &str = "test-api-key";

/// Access token expiring `secs_from_now` seconds from now.
pub fn jwt(secs_from_now: i64) -> String {
    let claims = Claims {
        sub: Some("user-1".into()),
        exp: (Utc::now().timestamp() + secs_from_now) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"backend-secret")).unwrap()
}

pub fn tokens(access: String, refresh: Option<&str>) -> TokenPair {
    TokenPair {
        access_token: access,
        refresh_token: refresh.map(str::to_string),
    }
}

/// Serves `app` on an ephemeral loopback port and returns its base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A base URL nothing is listening on.
pub async fn dead_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Notified(Notification),
    Redirected(Route),
}

/// Records notifications and redirects in the order they happened.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<UiEvent>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn redirects(&self) -> Vec<Route> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Redirected(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Notified(n) => Some(n),
                _ => None,
            })
            .collect()
    }
}

impl Navigator for Recorder {
    fn redirect(&self, route: Route) {
        self.events.lock().unwrap().push(UiEvent::Redirected(route));
    }
}

impl Notifier for Recorder {
    fn notify(&self, notification: Notification) {
        self.events.lock().unwrap().push(UiEvent::Notified(notification));
    }
}

/// Refresher that counts calls, waits `delay`, then returns `result`
/// (`None` means the refresh is rejected).
pub struct CountingRefresher {
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub result: Option<TokenPair>,
}

impl CountingRefresher {
    pub fn new(delay: Duration, result: Option<TokenPair>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            result,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenRefresher for CountingRefresher {
    fn refresh<'a>(&'a self, _refresh_token: &'a str) -> BoxFuture<'a, Result<TokenPair, RefreshError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.result.clone().ok_or(RefreshError::Rejected(401))
        })
    }
}

pub struct Harness {
    pub recorder: Arc<Recorder>,
    pub refresher: Arc<CountingRefresher>,
    pub session: Arc<SessionGuard>,
    pub pipeline: Arc<RequestPipeline>,
}

pub fn harness(base_url: &str, refresher: CountingRefresher) -> Harness {
    let recorder = Arc::new(Recorder::default());
    let refresher = Arc::new(refresher);
    let session = Arc::new(SessionGuard::new(
        refresher.clone(),
        recorder.clone(),
        Duration::from_secs(60),
    ));
    let mut config = ClientConfig::new(base_url, API_KEY);
    config.redirect_delay = Duration::ZERO;
    let pipeline = Arc::new(RequestPipeline::new(
        reqwest::Client::new(),
        config,
        session.clone(),
    ));
    Harness {
        recorder,
        refresher,
        session,
        pipeline,
    }
}

pub fn no_refresh() -> CountingRefresher {
    CountingRefresher::new(Duration::ZERO, None)
}
