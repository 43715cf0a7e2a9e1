//! Note API handlers
//!
//! Every route acts on the authenticated caller's notes only.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{CreateNoteRequest, NoteCountDto, NoteDto, SearchNotesParams, UpdateNoteRequest};
use crate::application::NoteService;
use crate::domain::Note;
use crate::interfaces::http::common::{domain_error, ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct NoteHandlerState {
    pub notes: Arc<NoteService>,
}

fn to_dtos(notes: Vec<Note>) -> Vec<NoteDto> {
    notes.into_iter().map(NoteDto::from).collect()
}

#[utoipa::path(
    get,
    path = "/api/notes",
    tag = "Notes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's notes, newest first", body = ApiResponse<Vec<NoteDto>>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_notes(
    State(state): State<NoteHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<NoteDto>>>, ApiError> {
    let notes = state
        .notes
        .list_mine(&user.user_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(to_dtos(notes))))
}

#[utoipa::path(
    post,
    path = "/api/notes",
    tag = "Notes",
    security(("bearer_auth" = [])),
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = ApiResponse<NoteDto>),
        (status = 400, description = "Title and content are both empty")
    )
)]
pub async fn create_note(
    State(state): State<NoteHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateNoteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NoteDto>>), ApiError> {
    let note = state
        .notes
        .create(&user.user_id, request.into())
        .await
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(note.into()))))
}

#[utoipa::path(
    get,
    path = "/api/notes/search",
    tag = "Notes",
    security(("bearer_auth" = [])),
    params(SearchNotesParams),
    responses(
        (status = 200, description = "Matching notes, newest first", body = ApiResponse<Vec<NoteDto>>),
        (status = 400, description = "Empty query")
    )
)]
pub async fn search_notes(
    State(state): State<NoteHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(params): Query<SearchNotesParams>,
) -> Result<Json<ApiResponse<Vec<NoteDto>>>, ApiError> {
    let notes = state
        .notes
        .search(&user.user_id, &params.query)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(to_dtos(notes))))
}

#[utoipa::path(
    get,
    path = "/api/notes/count",
    tag = "Notes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Number of notes owned by the caller", body = ApiResponse<NoteCountDto>)
    )
)]
pub async fn count_notes(
    State(state): State<NoteHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<NoteCountDto>>, ApiError> {
    let count = state
        .notes
        .count(&user.user_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(NoteCountDto { count })))
}

#[utoipa::path(
    get,
    path = "/api/notes/{id}",
    tag = "Notes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note", body = ApiResponse<NoteDto>),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_note(
    State(state): State<NoteHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<NoteDto>>, ApiError> {
    let note = state
        .notes
        .get(&user.user_id, id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(note.into())))
}

#[utoipa::path(
    put,
    path = "/api/notes/{id}",
    tag = "Notes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Note ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated", body = ApiResponse<NoteDto>),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_note(
    State(state): State<NoteHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateNoteRequest>,
) -> Result<Json<ApiResponse<NoteDto>>, ApiError> {
    let note = state
        .notes
        .update(&user.user_id, id, request.into())
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(note.into())))
}

#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    tag = "Notes",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Note deleted"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_note(
    State(state): State<NoteHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .notes
        .delete(&user.user_id, id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(())))
}
