//! User management API handlers
//!
//! Admin-only CRUD endpoints for managing users.
//! Delegates to `UserService` from the application/identity layer.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{CreateUserRequest, ListUsersParams, UpdateUserRequest, UserDto};
use crate::application::{NewAccount, UserService};
use crate::domain::{GetUserDto, UserRole, UserSortField};
use crate::interfaces::http::common::{
    bad_request, domain_error, ApiError, ApiResponse, PaginatedResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct UserHandlerState {
    pub users: Arc<UserService>,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "User list", body = ApiResponse<PaginatedResponse<UserDto>>),
        (status = 400, description = "Unknown role or sort field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<UserDto>>>, ApiError> {
    let role = match params.role.as_deref().filter(|r| !r.is_empty()) {
        Some(raw) => Some(
            UserRole::parse(raw).ok_or_else(|| bad_request(format!("Unknown role '{}'", raw)))?,
        ),
        None => None,
    };
    let sort_by = match params.sort_by.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => UserSortField::parse(raw)
            .ok_or_else(|| bad_request(format!("Unknown sort field '{}'", raw)))?,
        None => UserSortField::default(),
    };

    let dto = GetUserDto {
        search: params.search,
        role,
        page: params.page,
        page_size: params.page_size,
        sort_by,
    };

    let page = state.users.list_users(dto).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(PaginatedResponse::from_result(
        page,
        UserDto::from,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.users.get_user(&id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserDto>),
        (status = 409, description = "Username or email already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_user(
    State(state): State<UserHandlerState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let account = NewAccount {
        username: request.username,
        email: request.email,
        password: request.password,
        role: UserRole::parse(&request.role).unwrap_or_default(),
    };

    let user = state.users.create_user(account).await.map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn update_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .users
        .update_user(&id, request.into())
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Cannot delete your own account"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_user(
    State(state): State<UserHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .users
        .delete_user(&actor.user_id, &id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(())))
}
