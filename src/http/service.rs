//! Admission API handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ratelimit::{AdmissionBackend, Decision, PolicyKind, PolicySet};

/// Fallback identifier when neither a user id nor a forwarded address is
/// present.
const ANONYMOUS_IDENTIFIER: &str = "anonymous";

/// `Retry-After` value used when a rejection carries no retry hint.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Shared state for the admission API.
pub struct AppState<B> {
    /// The admission backend instance
    pub backend: Arc<B>,
    /// Resolved policies per endpoint category
    pub policies: PolicySet,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            policies: self.policies,
        }
    }
}

/// Body of `check`, `peek` and `reset` requests.
#[derive(Debug, Deserialize)]
pub struct AdmissionRequest {
    /// Named policy to apply: `auth`, `ai`, `general` or `payment`
    pub policy: String,
    /// Authenticated user id, when known
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RejectionBody {
    message: String,
    retry_after: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Build the admission API router.
pub fn admission_router<B: AdmissionBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/v1/check", post(check::<B>))
        .route("/v1/peek", post(peek::<B>))
        .route("/v1/reset", post(reset::<B>))
        .with_state(state)
}

/// Consume quota for the requester and report the decision.
///
/// Admitted requests get `200` with the decision body; rejected requests
/// get `429` with a retry hint. Both carry `X-RateLimit-*` headers.
async fn check<B: AdmissionBackend>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
    Json(req): Json<AdmissionRequest>,
) -> Response {
    let kind = match PolicyKind::parse(&req.policy) {
        Ok(kind) => kind,
        Err(e) => {
            warn!(policy = %req.policy, "Admission request named an unknown policy");
            return bad_request(e.to_string());
        }
    };

    let policy = state.policies.get(kind);
    let identifier = resolve_identifier(req.user_id.as_deref(), &headers);

    let decision = state.backend.check(&policy, &identifier).await;

    debug!(
        policy = %kind,
        identifier = %identifier,
        allowed = decision.allowed,
        remaining = decision.remaining,
        "Admission decision made"
    );

    if decision.allowed {
        decision_response(&decision)
    } else {
        rejection_response(&decision)
    }
}

/// Report the requester's current quota without consuming any of it.
async fn peek<B: AdmissionBackend>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
    Json(req): Json<AdmissionRequest>,
) -> Response {
    let kind = match PolicyKind::parse(&req.policy) {
        Ok(kind) => kind,
        Err(e) => return bad_request(e.to_string()),
    };

    let policy = state.policies.get(kind);
    let identifier = resolve_identifier(req.user_id.as_deref(), &headers);

    let decision = state.backend.peek(&policy, &identifier).await;
    decision_response(&decision)
}

/// Administrative override: delete the requester's window entry.
async fn reset<B: AdmissionBackend>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
    Json(req): Json<AdmissionRequest>,
) -> Response {
    let kind = match PolicyKind::parse(&req.policy) {
        Ok(kind) => kind,
        Err(e) => return bad_request(e.to_string()),
    };

    let policy = state.policies.get(kind);
    let identifier = resolve_identifier(req.user_id.as_deref(), &headers);

    state.backend.reset(&policy, &identifier).await;
    info!(policy = %kind, identifier = %identifier, "Admission window reset by override");

    StatusCode::NO_CONTENT.into_response()
}

/// Resolve the requester identifier.
///
/// Precedence: authenticated user id, then the first client-forwarded
/// address, then the anonymous sentinel. The limiter treats the result as
/// an opaque string.
fn resolve_identifier(user_id: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(user_id) = user_id {
        let user_id = user_id.trim();
        if !user_id.is_empty() {
            return format!("user:{user_id}");
        }
    }

    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        // The header may hold a proxy chain; the client is the first hop.
        if let Some(client) = forwarded.split(',').next() {
            let client = client.trim();
            if !client.is_empty() {
                return format!("ip:{client}");
            }
        }
    }

    ANONYMOUS_IDENTIFIER.to_string()
}

fn rate_limit_headers(decision: &Decision) -> [(HeaderName, String); 3] {
    [
        (
            HeaderName::from_static("x-ratelimit-limit"),
            decision.limit.to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-remaining"),
            decision.remaining.to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-reset"),
            (decision.reset_at_ms / 1000).to_string(),
        ),
    ]
}

fn decision_response(decision: &Decision) -> Response {
    (
        StatusCode::OK,
        rate_limit_headers(decision),
        Json(decision.clone()),
    )
        .into_response()
}

fn rejection_response(decision: &Decision) -> Response {
    let retry_after = decision
        .retry_after_secs
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

    (
        StatusCode::TOO_MANY_REQUESTS,
        rate_limit_headers(decision),
        [(header::RETRY_AFTER, retry_after.to_string())],
        Json(RejectionBody {
            message: "Too many requests. Please try again later.".to_string(),
            retry_after,
        }),
    )
        .into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message })).into_response()
}
