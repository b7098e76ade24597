use async_trait::async_trait;
use chrono::Utc;
use common::error::{AppError, Res};
use log::{debug, warn};
use reqwest::{Client, Method, StatusCode, header};

use crate::models::session::AuthSession;

/// Request relayed verbatim to the auth service.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: String,
    /// Path plus query string, e.g. `/api/auth/sign-in/email`.
    pub path: String,
    pub cookie: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub set_cookies: Vec<String>,
    pub body: Vec<u8>,
}

/// Source of truth for who is signed in.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolves the session carried by the request cookies, if any.
    async fn get_session(&self, cookie: Option<&str>) -> Res<Option<AuthSession>>;

    async fn forward(&self, req: ForwardRequest) -> Res<ForwardResponse>;
}

/// HTTP client for the external session-cookie auth service.
pub struct AuthClient {
    client: Client,
    auth_service_url: String,
}

impl AuthClient {
    pub fn new(auth_service_url: String) -> Self {
        AuthClient {
            client: Client::new(),
            auth_service_url,
        }
    }
}

#[async_trait]
impl SessionProvider for AuthClient {
    async fn get_session(&self, cookie: Option<&str>) -> Res<Option<AuthSession>> {
        let Some(cookie) = cookie.filter(|c| !c.is_empty()) else {
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/api/auth/get-session", self.auth_service_url))
            .header(header::COOKIE, cookie)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| "Failed to fetch session".to_string());
            warn!("Session lookup failed with {}: {}", status, message);
            return Err(AppError::Internal(message));
        }

        // the auth service answers `null` when the cookie holds no live session
        let session = response.json::<Option<AuthSession>>().await?;
        Ok(session.filter(|s| {
            let expired = s.is_expired_at(Utc::now());
            if expired {
                debug!("Ignoring expired session {}", s.session.id);
            }
            !expired
        }))
    }

    async fn forward(&self, req: ForwardRequest) -> Res<ForwardResponse> {
        let method = Method::from_bytes(req.method.as_bytes())
            .map_err(|_| AppError::BadRequest(format!("Unsupported method {}", req.method)))?;

        let mut builder = self
            .client
            .request(method, format!("{}{}", self.auth_service_url, req.path));
        if let Some(cookie) = &req.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(content_type) = &req.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        debug!("Forwarding {} {} to auth service", req.method, req.path);
        let response = builder.body(req.body).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(ForwardResponse {
            status,
            content_type,
            set_cookies,
            body,
        })
    }
}
