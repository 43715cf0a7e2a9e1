//! Note repository interface

use async_trait::async_trait;

use super::{NewNote, Note, NoteChanges};
use crate::domain::DomainResult;

#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn create(&self, note: NewNote) -> DomainResult<Note>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Note>>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: &str) -> DomainResult<Vec<Note>>;

    /// Newest first. `query` is matched case-insensitively against title and content.
    async fn search_by_owner(&self, owner_id: &str, query: &str) -> DomainResult<Vec<Note>>;
    async fn count_by_owner(&self, owner_id: &str) -> DomainResult<u64>;

    async fn update(&self, id: i32, changes: NoteChanges) -> DomainResult<Option<Note>>;

    /// Returns `false` when no note had this id.
    async fn delete(&self, id: i32) -> DomainResult<bool>;
}
