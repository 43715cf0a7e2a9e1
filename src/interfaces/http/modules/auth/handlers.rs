//! Authentication API handlers
//!
//! Login and registration answer with a token in the body and the same
//! token in an HttpOnly session cookie, so both bearer and cookie
//! clients work.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::CookieJar;

use super::dto::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest};
use crate::application::UserService;
use crate::interfaces::http::common::{domain_error, ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::{AuthenticatedUser, SessionCookie};
use crate::interfaces::http::modules::users::UserDto;

/// Auth state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub users: Arc<UserService>,
    pub cookie: SessionCookie,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ApiError> {
    let auth = state
        .users
        .login(&request.username, &request.password)
        .await
        .map_err(domain_error)?;

    let jar = jar.add(state.cookie.issue(auth.token.clone()));
    Ok((jar, Json(ApiResponse::success(auth.into()))))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created and signed in", body = ApiResponse<LoginResponse>),
        (status = 409, description = "Username or email already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<LoginResponse>>), ApiError> {
    let auth = state
        .users
        .register(&request.username, &request.email, &request.password)
        .await
        .map_err(domain_error)?;

    let jar = jar.add(state.cookie.issue(auth.token.clone()));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(ApiResponse::success(auth.into())),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session ended"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<()>>), ApiError> {
    state
        .users
        .logout(&user.session_id)
        .await
        .map_err(domain_error)?;

    Ok((jar.remove(state.cookie.clear()), Json(ApiResponse::success(()))))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserDto>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .users
        .current_user(&user.user_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    put,
    path = "/auth/profile",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserDto>),
        (status = 409, description = "Username or email already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_profile(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .users
        .update_profile(&user.user_id, request.into())
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    delete,
    path = "/auth/profile",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account and its notes deleted"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn delete_profile(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<()>>), ApiError> {
    state
        .users
        .delete_account(&user.user_id)
        .await
        .map_err(domain_error)?;

    Ok((jar.remove(state.cookie.clear()), Json(ApiResponse::success(()))))
}
