use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;

use crate::{
    AppState,
    auth::{ACCESS_COOKIE, BEARER_PREFIX, REFRESH_COOKIE},
    config::Env,
    error::ApiError,
    models::{Credentials, RefreshGrant, StatusBody},
    password,
    token::{REFRESH_TOKEN_TTL, TokenService},
};

/// sign_up
///
/// [Public Route] Creates a `Client` identity and signs it in. Administrators are never
/// created through this endpoint.
#[utoipa::path(
    post,
    path = "/api/auth/signUp",
    request_body = Credentials,
    responses(
        (status = 200, description = "Registered; session cookies set", body = StatusBody),
        (status = 400, description = "Malformed or empty credentials", body = StatusBody),
        (status = 409, description = "Login already taken", body = StatusBody)
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, Json<StatusBody>), ApiError> {
    let Json(credentials) = payload?;
    credentials.validate()?;

    let password_hash = password::hash(credentials.password).await?;
    let user_id = state
        .credentials
        .create_user(&credentials.login, &password_hash, false)
        .await?;

    // A login whose session could not be issued is released again.
    let jar = match issue_session(&state, jar, user_id, false).await {
        Ok(jar) => jar,
        Err(e) => {
            if let Err(cleanup) = state.credentials.delete_user(user_id).await {
                tracing::error!(
                    subject_id = user_id,
                    error = %cleanup,
                    "failed to release login"
                );
            }
            return Err(e);
        }
    };

    tracing::info!(subject_id = user_id, "identity created");
    Ok((jar, Json(StatusBody::ok())))
}

/// sign_in
///
/// [Public Route] Exchanges a login and password for session cookies. An unknown login and a
/// wrong password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/api/auth/signIn",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in; session cookies set", body = StatusBody),
        (status = 400, description = "Malformed or empty credentials", body = StatusBody),
        (status = 403, description = "Invalid credentials", body = StatusBody)
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, Json<StatusBody>), ApiError> {
    let Json(credentials) = payload?;
    credentials.validate()?;

    let Some(identity) = state.credentials.get_user_by_login(&credentials.login).await? else {
        password::verify_decoy(credentials.password).await?;
        tracing::info!("sign-in rejected: unknown login");
        return Err(ApiError::Forbidden);
    };

    if !password::verify(credentials.password, identity.password_hash).await? {
        tracing::info!(subject_id = identity.id, "sign-in rejected: wrong password");
        return Err(ApiError::Forbidden);
    }

    let jar = issue_session(&state, jar, identity.id, identity.is_admin).await?;
    Ok((jar, Json(StatusBody::ok())))
}

/// refresh
///
/// [Public Route] Trades the `RefreshToken` cookie for a new access token and a new refresh
/// secret. The presented secret is consumed whether or not it is still valid.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Session rotated", body = StatusBody),
        (status = 403, description = "Missing, unknown, used or expired refresh secret", body = StatusBody)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<StatusBody>), ApiError> {
    let Some(secret) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
        return Err(ApiError::Forbidden);
    };

    let digest = TokenService::refresh_digest(&secret);
    let Some(grant) = state.credentials.take_refresh_grant(&digest).await? else {
        tracing::warn!("refresh rejected: unknown or already used secret");
        return Err(ApiError::Forbidden);
    };

    if grant.expires_at <= Utc::now() {
        tracing::info!(subject_id = grant.user_id, "refresh rejected: grant expired");
        return Err(ApiError::Forbidden);
    }

    let Some(identity) = state.credentials.get_user(grant.user_id).await? else {
        return Err(ApiError::Forbidden);
    };

    let jar = issue_session(&state, jar, identity.id, identity.is_admin).await?;
    Ok((jar, Json(StatusBody::ok())))
}

/// logout
///
/// [Public Route] Clears both session cookies and revokes every refresh grant of the caller,
/// identified by either cookie. Always answers 200.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session cookies cleared", body = StatusBody))
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<StatusBody>), ApiError> {
    let mut subject = jar
        .get(ACCESS_COOKIE)
        .and_then(|c| c.value().strip_prefix(BEARER_PREFIX).map(str::to_string))
        .and_then(|token| state.tokens.verify(&token).ok())
        .map(|principal| principal.user_id);

    if let Some(secret) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) {
        let digest = TokenService::refresh_digest(&secret);
        if let Some(grant) = state.credentials.take_refresh_grant(&digest).await? {
            subject.get_or_insert(grant.user_id);
        }
    }

    if let Some(user_id) = subject {
        let revoked = state.credentials.revoke_refresh_grants(user_id).await?;
        tracing::info!(subject_id = user_id, revoked, "session ended");
    }

    let jar = jar
        .remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"));
    Ok((jar, Json(StatusBody::ok())))
}

/// issue_session
///
/// Mints an access token and a fresh refresh secret for `user_id`, persists the secret's
/// digest and sets both cookies.
async fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user_id: i64,
    is_admin: bool,
) -> Result<CookieJar, ApiError> {
    let token = state.tokens.issue(user_id, is_admin)?;
    let secret = TokenService::issue_opaque_secret()?;

    state
        .credentials
        .save_refresh_grant(RefreshGrant {
            digest: TokenService::refresh_digest(&secret),
            user_id,
            expires_at: Utc::now() + REFRESH_TOKEN_TTL,
        })
        .await?;

    let secure = state.config.env == Env::Production;
    Ok(jar
        .add(session_cookie(ACCESS_COOKIE, format!("{BEARER_PREFIX}{token}"), secure))
        .add(session_cookie(REFRESH_COOKIE, secret, secure)))
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}
