use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::{ApiError, ErrorCode};

const API_KEYS_VAR: &str = "MURMUR_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID stored as a request extension and echoed in `x-request-id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Who is calling a protected route. Rate limits are counted per caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caller(pub String);

impl Caller {
    fn anonymous() -> Self {
        Self("anonymous".to_owned())
    }
}

/// Bearer tokens accepted on the protected routes, each mapped to a stable
/// caller label so tokens never end up in logs.
#[derive(Debug, Clone)]
pub struct AuthState {
    callers: Arc<HashMap<String, Caller>>,
}

impl AuthState {
    /// Reads comma-separated bearer tokens from `MURMUR_API_KEYS`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no keys are configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// An empty key list disables auth in development and is an error
    /// anywhere else.
    ///
    /// # Errors
    ///
    /// Fails when `raw` holds no keys and `is_development` is false.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut callers = HashMap::new();
        for token in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let label = Caller(format!("key-{}", callers.len() + 1));
            callers.entry(token.to_owned()).or_insert(label);
        }

        if callers.is_empty() {
            anyhow::ensure!(is_development, "{API_KEYS_VAR} is required outside development");
            tracing::warn!("{API_KEYS_VAR} not set; bearer auth disabled in development");
        }

        Ok(Self {
            callers: Arc::new(callers),
        })
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            callers: Arc::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.callers.is_empty()
    }

    fn caller_for(&self, token: &str) -> Option<&Caller> {
        self.callers.get(token)
    }
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    used: usize,
}

/// Fixed-window request budget, tracked separately for each caller.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    budget: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<Caller, Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: usize, window: Duration) -> Self {
        Self {
            budget,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spends one request from `caller`'s window. On refusal, returns how long
    /// until the window reopens.
    async fn spend(&self, caller: &Caller) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(caller.clone()).or_insert(Window {
            opened_at: now,
            used: 0,
        });

        let age = now.duration_since(window.opened_at);
        if age >= self.window {
            window.opened_at = now;
            window.used = 0;
        } else if window.used >= self.budget {
            return Err(self.window.saturating_sub(age));
        }

        window.used += 1;
        Ok(())
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |id| id.0.clone())
}

/// Uses the caller's `x-request-id` when present, otherwise a fresh UUID, and
/// runs the rest of the stack inside a span carrying it.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    let span = tracing::info_span!(
        "http_request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).instrument(span).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    res
}

/// Resolves the bearer token to a [`Caller`]. With auth disabled every request
/// is the anonymous caller.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = if auth.enabled() {
        let resolved = bearer_token(req.headers().get(AUTHORIZATION))
            .and_then(|token| auth.caller_for(token))
            .cloned();
        let Some(caller) = resolved else {
            tracing::debug!("rejected request without a valid bearer token");
            return ApiError::new(
                request_id_of(&req),
                ErrorCode::Unauthorized,
                "missing or invalid bearer token",
            )
            .into_response();
        };
        caller
    } else {
        Caller::anonymous()
    };

    req.extensions_mut().insert(caller);
    next.run(req).await
}

/// Must sit inside [`require_bearer_auth`] so the caller is known.
pub async fn enforce_rate_limit(
    State(limits): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let caller = req
        .extensions()
        .get::<Caller>()
        .cloned()
        .unwrap_or_else(Caller::anonymous);

    match limits.spend(&caller).await {
        Ok(()) => next.run(req).await,
        Err(retry_in) => {
            tracing::info!(caller = %caller.0, "rate limit exceeded");
            let mut res =
                ApiError::new(request_id_of(&req), ErrorCode::RateLimited, "rate limit exceeded")
                    .into_response();
            let secs = retry_in.as_secs().max(1);
            if let Ok(val) = HeaderValue::from_str(&secs.to_string()) {
                res.headers_mut().insert(RETRY_AFTER, val);
            }
            res
        }
    }
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
