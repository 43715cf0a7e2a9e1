//! Authentication middleware for Axum
//!
//! A request is authenticated by a JWT taken from `Authorization: Bearer`
//! or, failing that, from the session cookie. The token must verify and
//! its session must still be live.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{debug, error};

use crate::application::UserService;
use crate::domain::{DomainError, UserRole};
use crate::infrastructure::crypto::verify_token;
use crate::interfaces::http::common::ApiResponse;

/// Authentication error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    SessionRejected(String),
    InsufficientPermissions,
    Internal,
}

/// Session cookie settings shared by the middleware and the auth handlers
#[derive(Clone, Debug)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
}

impl SessionCookie {
    pub fn issue(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    pub fn clear(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), "")).path("/").build()
    }
}

impl Default for SessionCookie {
    fn default() -> Self {
        Self {
            name: "notes_session".to_string(),
            secure: false,
        }
    }
}

/// Authentication state
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<UserService>,
    pub cookie: SessionCookie,
}

/// Caller identity, inserted into request extensions by [`auth_middleware`]
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
    pub session_id: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

fn extract_bearer(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

fn extract_cookie(request: &Request<Body>, name: &str) -> Option<String> {
    CookieJar::from_headers(request.headers())
        .get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Bearer / cookie authentication middleware
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = extract_bearer(&request).or_else(|| extract_cookie(&request, &auth_state.cookie.name));
    let Some(token) = token else {
        return auth_error_response(AuthError::MissingToken);
    };

    let claims = match verify_token(&token, auth_state.users.jwt_config()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Token rejected");
            return auth_error_response(AuthError::InvalidToken);
        }
    };

    match auth_state.users.authenticate(&claims).await {
        Ok(user) => {
            request.extensions_mut().insert(AuthenticatedUser {
                user_id: user.id,
                username: user.username,
                role: user.role,
                session_id: claims.sid,
            });
            next.run(request).await
        }
        Err(DomainError::Unauthorized(msg)) => auth_error_response(AuthError::SessionRejected(msg)),
        Err(e) => {
            error!(error = %e, "Session lookup failed");
            auth_error_response(AuthError::Internal)
        }
    }
}

/// Admin-only guard; must run inside [`auth_middleware`]
pub async fn admin_middleware(request: Request<Body>, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<AuthenticatedUser>()
        .is_some_and(AuthenticatedUser::is_admin);

    if !is_admin {
        return auth_error_response(AuthError::InsufficientPermissions);
    }
    next.run(request).await
}

fn auth_error_response(error: AuthError) -> Response {
    let (status, message) = match error {
        AuthError::MissingToken => (
            StatusCode::UNAUTHORIZED,
            "Missing authentication token".to_string(),
        ),
        AuthError::InvalidToken => (
            StatusCode::UNAUTHORIZED,
            "Invalid authentication token".to_string(),
        ),
        AuthError::SessionRejected(msg) => (StatusCode::UNAUTHORIZED, msg),
        AuthError::InsufficientPermissions => (
            StatusCode::FORBIDDEN,
            "Administrator role required".to_string(),
        ),
        AuthError::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal storage error".to_string(),
        ),
    };

    (status, Json(ApiResponse::<()>::error(message))).into_response()
}
