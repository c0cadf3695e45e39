use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use storefront_core::{Actor, Role};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The user resolved from a valid bearer token, stored as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
        }
    }
}

impl From<storefront_db::UserRow> for CurrentUser {
    fn from(row: storefront_db::UserRow) -> Self {
        let role = row.role();
        Self {
            id: row.id,
            public_id: row.public_id,
            name: row.name,
            email: row.email,
            role,
        }
    }
}

/// Bearer-token identity settings used by middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    pool: PgPool,
    token_salt: Arc<str>,
}

impl AuthState {
    #[must_use]
    pub fn new(pool: PgPool, token_salt: &str) -> Self {
        Self {
            pool,
            token_salt: Arc::from(token_salt),
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

#[derive(Debug)]
struct RateLimitTable {
    windows: HashMap<IpAddr, RateLimitWindow>,
    last_sweep: Instant,
}

/// Fixed-window limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    trust_proxy: bool,
    state: Arc<Mutex<RateLimitTable>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            trust_proxy: false,
            state: Arc::new(Mutex::new(RateLimitTable {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Take the client address from the first `x-forwarded-for` hop.
    #[must_use]
    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    #[must_use]
    pub fn from_config(config: &storefront_core::AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
        .with_trust_proxy(config.trust_proxy)
    }

    fn client_ip(&self, req: &Request) -> IpAddr {
        if self.trust_proxy {
            if let Some(ip) = forwarded_for(req.headers()) {
                return ip;
            }
        }
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| {
                addr.ip()
            })
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

fn middleware_error(req: &Request, code: &str, message: &str) -> Response {
    ApiError::new(request_id_of(req), code, message).into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
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

/// Middleware resolving a bearer token to a [`CurrentUser`].
///
/// Requests without an `Authorization` header pass through anonymously;
/// route extractors decide whether identity is required. A header carrying
/// an unknown or malformed token is rejected with 401.
pub async fn resolve_user(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return next.run(req).await;
    };

    let Some(token) = extract_bearer_token(Some(header)) else {
        return middleware_error(&req, "unauthorized", "missing or invalid bearer token");
    };

    let token_hash = storefront_core::hash_token(&auth.token_salt, token);
    match storefront_db::get_user_by_token_hash(&auth.pool, &token_hash).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser::from(user));
            next.run(req).await
        }
        Ok(None) => middleware_error(&req, "unauthorized", "missing or invalid bearer token"),
        Err(e) => {
            tracing::error!(error = %e, "bearer token lookup failed");
            middleware_error(&req, "internal_error", "authentication lookup failed")
        }
    }
}

/// Middleware enforcing a fixed request-per-window limit per client address.
///
/// Expired windows are swept at most once per window length so the table
/// only holds clients seen recently.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = rate_limit.client_ip(&req);
    let now = Instant::now();

    let mut table = rate_limit.state.lock().await;
    if now.duration_since(table.last_sweep) >= rate_limit.window {
        let window = rate_limit.window;
        table
            .windows
            .retain(|_, w| now.duration_since(w.started_at) < window);
        table.last_sweep = now;
    }

    let entry = table.windows.entry(client).or_insert(RateLimitWindow {
        started_at: now,
        count: 0,
    });
    if now.duration_since(entry.started_at) >= rate_limit.window {
        entry.started_at = now;
        entry.count = 0;
    }

    if entry.count >= rate_limit.max_requests {
        drop(table);
        tracing::warn!(client = %client, "rate limit exceeded");
        return middleware_error(&req, "rate_limited", "rate limit exceeded");
    }

    entry.count += 1;
    drop(table);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
