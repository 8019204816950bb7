use std::sync::Arc;

use reqwest::{Method, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use congregate_types::api::ErrorBody;

use crate::config::ClientConfig;
use crate::error::RequestError;
use crate::session::SessionGuard;

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Issues HTTP calls against the backend, attaching the session's token and
/// reporting expired sessions back to the [`SessionGuard`].
pub struct RequestPipeline {
    client: reqwest::Client,
    config: ClientConfig,
    session: Arc<SessionGuard>,
}

impl RequestPipeline {
    pub fn new(client: reqwest::Client, config: ClientConfig, session: Arc<SessionGuard>) -> Self {
        Self {
            client,
            config,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authenticated call. Without a usable token the session is expired and
    /// no request is sent.
    pub async fn call<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let Some(token) = self.session.get_valid_access_token().await else {
            warn!(path = %path, "No valid access token, request not sent");
            self.session.handle_expired_token();
            return Err(RequestError::Auth);
        };
        let response = self.send(method, path, body, Some(&token)).await?;
        self.finish(path, response).await
    }

    /// Public write whose success body is never read. Any 2xx counts as
    /// success, whatever it carries.
    pub async fn send_public<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<(), RequestError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body, None).await?;
        self.check(path, response, false).await?;
        Ok(())
    }

    /// [`call`](Self::call) that resolves to [`RequestError::Cancelled`] as
    /// soon as `cancel` fires, dropping any late response.
    pub async fn call_cancellable<T, B>(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        cancellable(cancel, self.call(method, path, body)).await
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<Response, RequestError>
    where
        B: Serialize + ?Sized,
    {
        debug!(method = %method, path = %path, "Sending request");
        let mut request = self
            .client
            .request(method, self.config.url(path))
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        request.send().await.map_err(|e| {
            warn!(path = %path, "Request failed before a response: {}", e);
            RequestError::Network(e)
        })
    }

    async fn finish<T: DeserializeOwned>(&self, path: &str, response: Response) -> Result<T, RequestError> {
        let response = self.check(path, response, true).await?;
        let bytes = response.bytes().await?;

        // An empty success body decodes as JSON null.
        let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Maps non-2xx responses to errors and hands 2xx responses back unread.
    /// Only an authenticated 401 concerns the session; on a public call it is
    /// an ordinary rejection.
    async fn check(&self, path: &str, response: Response, authenticated: bool) -> Result<Response, RequestError> {
        let status = response.status();
        debug!(path = %path, status = %status, "Response received");

        if status == StatusCode::UNAUTHORIZED && authenticated {
            warn!(path = %path, "Unauthorized, token expired or invalid");
            self.session.handle_expired_token();
            return Err(RequestError::Auth);
        }
        if status.is_success() {
            return Ok(response);
        }

        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<ErrorBody>(&bytes).ok();
        if let Some(body) = body.as_ref().filter(|b| b.is_already_exists()) {
            return Err(RequestError::Conflict {
                message: body.message.clone(),
            });
        }
        warn!(path = %path, status = %status, "Request rejected");
        Err(RequestError::Server {
            status: status.as_u16(),
            body,
        })
    }
}

/// Races `request` against `cancel`.
pub async fn cancellable<T, F>(cancel: &CancellationToken, request: F) -> Result<T, RequestError>
where
    F: Future<Output = Result<T, RequestError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RequestError::Cancelled),
        result = request => result,
    }
}
