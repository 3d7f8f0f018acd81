use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{error::status_envelope, token::TokenService};

/// Cookie carrying `"Bearer <token>"` after sign-in or sign-up.
pub const ACCESS_COOKIE: &str = "AccessToken";
/// Cookie carrying the opaque refresh secret.
pub const REFRESH_COOKIE: &str = "RefreshToken";
/// The only credential scheme the guard accepts.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Role
///
/// The two caller classes. They are disjoint: an admin is not implicitly a client, so a route
/// that both may call lists both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Client,
    Admin,
}

/// No authentication required.
pub const PUBLIC: &[Role] = &[];
/// Any signed-in caller.
pub const MEMBERS: &[Role] = &[Role::Client, Role::Admin];
/// Administrators only.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Principal
///
/// The verified identity of a caller, as recovered from a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Principal {
    pub fn role(&self) -> Role {
        if self.is_admin { Role::Admin } else { Role::Client }
    }
}

/// Decision
///
/// Outcome of request admission. `Proceed` carries the verified caller when a credential was
/// required; public routes proceed without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed(Option<Principal>),
    Reject(StatusCode),
}

/// admit
///
/// Decides whether a request with `headers` may invoke an operation permitted for `required`.
/// Every failure is the same 403; the reason only reaches the logs.
pub fn admit(headers: &HeaderMap, required: &[Role], tokens: &TokenService) -> Decision {
    if required.is_empty() {
        return Decision::Proceed(None);
    }

    let Some(credential) = extract_credential(headers) else {
        tracing::info!("admission rejected: no credential presented");
        return Decision::Reject(StatusCode::FORBIDDEN);
    };

    let Some(token) = credential.strip_prefix(BEARER_PREFIX) else {
        tracing::info!("admission rejected: unsupported credential scheme");
        return Decision::Reject(StatusCode::FORBIDDEN);
    };

    let principal = match tokens.verify(token) {
        Ok(principal) => principal,
        Err(reason) => {
            tracing::warn!(%reason, "admission rejected: token failed verification");
            return Decision::Reject(StatusCode::FORBIDDEN);
        }
    };

    if !required.contains(&principal.role()) {
        tracing::warn!(
            subject_id = principal.user_id,
            role = ?principal.role(),
            "admission rejected: role not permitted"
        );
        return Decision::Reject(StatusCode::FORBIDDEN);
    }

    Decision::Proceed(Some(principal))
}

/// The session cookie wins; the Authorization header is accepted for non-browser clients.
fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// GuardPolicy
///
/// Per-route state for the `guard` middleware: the shared token service and the roles the
/// route declares.
#[derive(Clone)]
pub struct GuardPolicy {
    pub tokens: Arc<TokenService>,
    pub roles: &'static [Role],
}

/// guard
///
/// Route layer wrapping every entry of the route table. On admission the verified
/// `Principal` is attached to the request extensions for `AuthUser` to pick up.
pub async fn guard(
    State(policy): State<GuardPolicy>,
    mut request: Request,
    next: Next,
) -> Response {
    match admit(request.headers(), policy.roles, &policy.tokens) {
        Decision::Proceed(principal) => {
            if let Some(principal) = principal {
                request.extensions_mut().insert(principal);
            }
            next.run(request).await
        }
        Decision::Reject(status) => status_envelope(status),
    }
}

/// AuthUser
///
/// Extractor for handlers behind a non-public route. It never decodes tokens itself; it only
/// reads what `guard` has already admitted.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        status_envelope(StatusCode::FORBIDDEN)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(AuthUser)
            .ok_or(AuthRejection)
    }
}
