mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::{Value, json};

use tokio_util::sync::CancellationToken;

use congregate_client::SessionState;
use congregate_client::error::RequestError;
use congregate_client::pipeline::cancellable;
use congregate_client::session::{HttpTokenRefresher, REFRESH_PATH, RefreshError, TokenRefresher};
use congregate_client::ui::Route;

use support::{CountingRefresher, harness, jwt, no_refresh, tokens};

#[tokio::test]
async fn valid_token_is_returned_without_refresh() {
    let h = harness("http://unused", no_refresh());
    let token = jwt(3600);
    h.session.establish(tokens(token.clone(), Some("r1")));

    assert_eq!(h.session.get_valid_access_token().await, Some(token));
    assert_eq!(h.refresher.calls(), 0);
    assert_eq!(h.session.state(), SessionState::Valid);
}

#[tokio::test]
async fn opaque_token_is_treated_as_valid() {
    let h = harness("http://unused", no_refresh());
    h.session.establish(tokens("opaque".into(), None));
    assert_eq!(h.session.get_valid_access_token().await.as_deref(), Some("opaque"));
}

#[tokio::test]
async fn no_session_yields_none() {
    let h = harness("http://unused", no_refresh());
    assert_eq!(h.session.state(), SessionState::NoSession);
    assert_eq!(h.session.get_valid_access_token().await, None);
    assert_eq!(h.refresher.calls(), 0);
}

#[tokio::test]
async fn near_expiry_token_is_refreshed() {
    let fresh = jwt(3600);
    let h = harness(
        "http://unused",
        CountingRefresher::new(Duration::ZERO, Some(tokens(fresh.clone(), Some("r2")))),
    );
    // inside the 60s refresh window
    h.session.establish(tokens(jwt(30), Some("r1")));

    assert_eq!(h.session.get_valid_access_token().await, Some(fresh.clone()));
    assert_eq!(h.refresher.calls(), 1);
    assert_eq!(h.session.state(), SessionState::Valid);

    // the refreshed token is reused
    assert_eq!(h.session.get_valid_access_token().await, Some(fresh));
    assert_eq!(h.refresher.calls(), 1);
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let fresh = jwt(3600);
    let h = harness(
        "http://unused",
        CountingRefresher::new(Duration::from_millis(100), Some(tokens(fresh.clone(), None))),
    );
    h.session.establish(tokens(jwt(-10), Some("r1")));

    let (a, b) = tokio::join!(
        h.session.get_valid_access_token(),
        h.session.get_valid_access_token()
    );

    assert_eq!(a, Some(fresh));
    assert_eq!(a, b);
    assert_eq!(h.refresher.calls(), 1);
}

#[tokio::test]
async fn cancelled_caller_does_not_abort_shared_refresh() {
    let fresh = jwt(3600);
    let h = harness(
        "http://unused",
        CountingRefresher::new(Duration::from_millis(100), Some(tokens(fresh.clone(), None))),
    );
    h.session.establish(tokens(jwt(-10), Some("r1")));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let (first, second, _) = tokio::join!(
        cancellable(&cancel, async { Ok(h.session.get_valid_access_token().await) }),
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            h.session.get_valid_access_token().await
        },
        async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        }
    );

    assert!(matches!(first, Err(RequestError::Cancelled)));
    assert_eq!(second, Some(fresh));
    assert_eq!(h.refresher.calls(), 1);
    assert_eq!(h.session.state(), SessionState::Valid);
}

#[tokio::test]
async fn failed_refresh_expires_session_for_all_waiters() {
    let h = harness(
        "http://unused",
        CountingRefresher::new(Duration::from_millis(50), None),
    );
    h.session.establish(tokens(jwt(-10), Some("r1")));

    let (a, b, c) = tokio::join!(
        h.session.get_valid_access_token(),
        h.session.get_valid_access_token(),
        h.session.get_valid_access_token()
    );

    assert_eq!((a, b, c), (None, None, None));
    assert_eq!(h.refresher.calls(), 1);
    assert_eq!(h.session.state(), SessionState::Expired);
    // no redirect until the expiry is handled
    assert!(h.recorder.redirects().is_empty());
}

#[tokio::test]
async fn expired_without_refresh_token() {
    let h = harness("http://unused", no_refresh());
    h.session.establish(tokens(jwt(-10), None));

    assert_eq!(h.session.get_valid_access_token().await, None);
    assert_eq!(h.refresher.calls(), 0);
    assert_eq!(h.session.state(), SessionState::Expired);
}

#[tokio::test]
async fn handle_expired_token_is_idempotent() {
    let h = harness("http://unused", no_refresh());
    h.session.establish(tokens(jwt(3600), Some("r1")));

    h.session.handle_expired_token();
    h.session.handle_expired_token();

    assert_eq!(h.session.state(), SessionState::NoSession);
    assert_eq!(h.session.get_valid_access_token().await, None);
    assert_eq!(h.recorder.redirects(), vec![Route::Login]);

    // a new session gets its own redirect
    h.session.establish(tokens(jwt(3600), None));
    h.session.handle_expired_token();
    assert_eq!(h.recorder.redirects(), vec![Route::Login, Route::Login]);
}

#[tokio::test]
async fn logout_does_not_redirect() {
    let h = harness("http://unused", no_refresh());
    h.session.establish(tokens(jwt(3600), None));
    h.session.logout();

    assert_eq!(h.session.state(), SessionState::NoSession);
    assert!(h.recorder.redirects().is_empty());
}

#[tokio::test]
async fn teardown_during_refresh_discards_result() {
    let h = harness(
        "http://unused",
        CountingRefresher::new(Duration::from_millis(100), Some(tokens(jwt(3600), None))),
    );
    h.session.establish(tokens(jwt(-10), Some("r1")));

    let session = h.session.clone();
    let (token, _) = tokio::join!(h.session.get_valid_access_token(), async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(session.state(), SessionState::Refreshing);
        session.handle_expired_token();
    });

    assert_eq!(token, None);
    assert_eq!(h.session.state(), SessionState::NoSession);
}

async fn refresh_endpoint(Json(body): Json<Value>) -> impl IntoResponse {
    if body["refreshToken"] == "r1" {
        (
            StatusCode::OK,
            Json(json!({ "data": { "accessToken": "new-access", "refreshToken": "r2" } })),
        )
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "bad refresh token" })))
    }
}

#[tokio::test]
async fn http_refresher_exchanges_tokens() {
    let base = support::spawn_backend(Router::new().route(REFRESH_PATH, post(refresh_endpoint))).await;
    let refresher = Arc::new(HttpTokenRefresher::new(reqwest::Client::new(), &base, support::API_KEY));

    let pair = refresher.refresh("r1").await.unwrap();
    assert_eq!(pair.access_token, "new-access");
    assert_eq!(pair.refresh_token.as_deref(), Some("r2"));

    let err = refresher.refresh("stale").await.unwrap_err();
    assert!(matches!(err, RefreshError::Rejected(401)));
}
