//! `reqwest`-backed [`ChatGateway`] for the SEED backend.
//!
//! The backend authenticates with a session cookie. The client keeps a cookie
//! jar, optionally seeded from configuration; signing in happens in a browser.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use seed_core::{
    ChatError, ChatGateway, ChatReply, ChatRequest, ChatResult, LoadedSession, SaveRequest,
    SessionCheck, SessionSummary,
};

/// Cookie name used when the configured value is a bare token.
pub const DEFAULT_COOKIE_NAME: &str = "session";

#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: Url,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration, session_cookie: Option<&str>) -> ChatResult<Self> {
        // keep any path prefix: API paths are joined relative to it
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| ChatError::network(format!("invalid base url '{}': {}", base_url, e)))?;

        let jar = Arc::new(Jar::default());
        if let Some(cookie) = session_cookie.map(str::trim).filter(|c| !c.is_empty()) {
            let cookie = if cookie.contains('=') {
                cookie.to_string()
            } else {
                format!("{}={}", DEFAULT_COOKIE_NAME, cookie)
            };
            jar.add_cookie_str(&cookie, &base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .cookie_provider(jar)
            .build()
            .map_err(|e| ChatError::network(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    fn url(&self, path: &str) -> ChatResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ChatError::network(format!("invalid path '{}': {}", path, e)))
    }

    /// Non-2xx responses become [`ChatError::Api`], using the backend's
    /// `{"error": ...}` body when present.
    async fn check(response: Response) -> ChatResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.error)
            .unwrap_or(text);
        Err(ChatError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> ChatResult<T> {
        let bytes = response.bytes().await.map_err(transport)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn transport(e: reqwest::Error) -> ChatError {
    ChatError::network(e.to_string())
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send(&self, request: &ChatRequest) -> ChatResult<ChatReply> {
        debug!(
            "POST /api/chat ({} chars, {} history)",
            request.message.chars().count(),
            request.history.len()
        );
        let response = self
            .client
            .post(self.url("/api/chat")?)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check(response).await?;
        Self::json(response).await
    }

    async fn save(&self, request: &SaveRequest) -> ChatResult<()> {
        debug!("POST /api/save {} ({} messages)", request.sid, request.chat.len());
        let response = self
            .client
            .post(self.url("/api/save")?)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_sessions(&self) -> ChatResult<Vec<SessionSummary>> {
        let response = self
            .client
            .get(self.url("/api/sessions")?)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check(response).await?;
        let mut sessions: Vec<SessionSummary> = Self::json(response).await?;
        sessions.sort_by(|a, b| b.updated.cmp(&a.updated));
        Ok(sessions)
    }

    async fn load_session(&self, sid: &str) -> ChatResult<LoadedSession> {
        let mut url = self.url("/api/load")?;
        url.query_pairs_mut().append_pair("sid", sid);
        let response = self.client.get(url).send().await.map_err(transport)?;
        let response = Self::check(response).await?;
        Self::json(response).await
    }

    async fn session_check(&self) -> ChatResult<bool> {
        let response = self
            .client
            .get(self.url("/api/session-check")?)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::check(response).await?;
        let check: SessionCheck = Self::json(response).await?;
        Ok(check.logged_in)
    }

    async fn logout(&self) -> ChatResult<()> {
        let response = self
            .client
            .post(self.url("/api/logout")?)
            .send()
            .await
            .map_err(transport)?;
        if let Err(e) = Self::check(response).await {
            warn!("Logout request failed: {}", e);
            return Err(e);
        }
        Ok(())
    }
}
