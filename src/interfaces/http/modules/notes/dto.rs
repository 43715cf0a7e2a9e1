//! Note DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::{NoteDraft, NoteEdit};
use crate::domain::Note;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoteDto {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteDto {
    fn from(n: Note) -> Self {
        Self {
            id: n.id,
            title: n.title,
            content: n.content,
            owner_id: n.owner_id,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

/// A blank title is stored as "Untitled"
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateNoteRequest {
    #[serde(default)]
    #[validate(length(max = 255, message = "title must be at most 255 characters"))]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl From<CreateNoteRequest> for NoteDraft {
    fn from(r: CreateNoteRequest) -> Self {
        Self {
            title: r.title,
            content: r.content,
        }
    }
}

/// Omitted fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateNoteRequest {
    #[validate(length(max = 255, message = "title must be at most 255 characters"))]
    pub title: Option<String>,
    pub content: Option<String>,
}

impl From<UpdateNoteRequest> for NoteEdit {
    fn from(r: UpdateNoteRequest) -> Self {
        Self {
            title: r.title,
            content: r.content,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchNotesParams {
    /// Matched case-insensitively against title and content
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoteCountDto {
    pub count: u64,
}
