use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer token of an authenticated admin, stored as a request extension by
/// [`require_admin`].
#[derive(Debug, Clone)]
pub struct AdminSession(pub String);

/// How long an admin session token stays valid after login.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Shared admin password check plus the live admin session tokens.
///
/// Only the SHA-256 digest of the password is kept. Without a password the
/// gate stays closed: every login attempt fails. Tokens expire
/// `session_ttl` after they were issued.
#[derive(Clone)]
pub struct AdminAuth {
    secret_digest: Option<[u8; 32]>,
    session_ttl: Duration,
    sessions: Arc<Mutex<HashMap<String, Instant>>>,
}

impl std::fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuth")
            .field("enabled", &self.enabled())
            .finish_non_exhaustive()
    }
}

impl AdminAuth {
    #[must_use]
    pub fn new(password: Option<&str>) -> Self {
        let secret_digest = password.filter(|p| !p.is_empty()).map(|p| {
            let mut digest = [0u8; 32];
            digest.copy_from_slice(&Sha256::digest(p.as_bytes()));
            digest
        });
        if secret_digest.is_none() {
            tracing::warn!("RACK_ADMIN_PASSWORD not set; admin login is disabled");
        }
        Self {
            secret_digest,
            session_ttl: DEFAULT_SESSION_TTL,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.secret_digest.is_some()
    }

    /// Compares `candidate` with the configured password in constant time.
    #[must_use]
    pub fn verify_password(&self, candidate: &str) -> bool {
        let Some(secret) = &self.secret_digest else {
            return false;
        };
        let digest = Sha256::digest(candidate.as_bytes());
        digest.as_slice().ct_eq(secret.as_slice()).into()
    }

    /// Creates and records a fresh session token, dropping expired ones.
    pub async fn issue_session(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, issued_at| issued_at.elapsed() < self.session_ttl);
        sessions.insert(token.clone(), Instant::now());
        token
    }

    /// Forgets `token`. Returns whether it was live.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().await.remove(token).is_some()
    }

    async fn allows(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        let Some(issued_at) = sessions.get(token).copied() else {
            return false;
        };
        if issued_at.elapsed() < self.session_ttl {
            return true;
        }
        sessions.remove(token);
        tracing::debug!("admin session expired");
        false
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every request passing through the layer.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Tags every request with an ID: the caller's `x-request-id` when present,
/// a fresh `UUIDv4` otherwise. Handlers read it as [`RequestId`]; the
/// response echoes it in `x-request-id`.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware admitting only requests that carry a live admin session token.
pub async fn require_admin(
    State(auth): State<AdminAuth>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = extract_bearer_token(req.headers().get(AUTHORIZATION)).map(str::to_owned);
    let allowed = match &token {
        Some(token) => auth.allows(token).await,
        None => false,
    };

    match token {
        Some(token) if allowed => {
            req.extensions_mut().insert(AdminSession(token));
            next.run(req).await
        }
        _ => ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid admin session token",
        )
        .into_response(),
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        drop(window);
        tracing::warn!(path = %req.uri().path(), "admin rate limit exceeded");
        return ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn verify_password_matches_only_the_secret() {
        let auth = AdminAuth::new(Some("letmein"));
        assert!(auth.enabled());
        assert!(auth.verify_password("letmein"));
        assert!(!auth.verify_password("letmein "));
        assert!(!auth.verify_password(""));
    }

    #[test]
    fn missing_password_keeps_gate_closed() {
        let auth = AdminAuth::new(None);
        assert!(!auth.enabled());
        assert!(!auth.verify_password(""));
        assert!(!AdminAuth::new(Some("")).verify_password(""));
    }

    #[test]
    fn debug_does_not_print_digest() {
        let printed = format!("{:?}", AdminAuth::new(Some("letmein")));
        assert_eq!(printed, "AdminAuth { enabled: true, .. }");
    }

    #[tokio::test]
    async fn sessions_can_be_revoked() {
        let auth = AdminAuth::new(Some("letmein"));
        let token = auth.issue_session().await;
        assert!(auth.allows(&token).await);
        assert!(auth.revoke(&token).await);
        assert!(!auth.allows(&token).await);
        assert!(!auth.revoke(&token).await);
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_dropped() {
        let auth = AdminAuth::new(Some("letmein")).with_session_ttl(Duration::ZERO);
        let token = auth.issue_session().await;
        assert!(!auth.allows(&token).await);
        assert!(auth.sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn login_prunes_expired_sessions() {
        let auth = AdminAuth::new(Some("letmein")).with_session_ttl(Duration::ZERO);
        auth.issue_session().await;
        auth.issue_session().await;
        assert_eq!(auth.sessions.lock().await.len(), 1);
    }
}
