//! Note service
//!
//! Every operation takes the authenticated owner's id; a note that
//! belongs to someone else is reported as `Forbidden`.

use std::sync::Arc;

use tracing::info;

use crate::domain::note::{normalize_title, NewNote, Note, NoteChanges};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// Fields of a new note
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

/// Edit of a note. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct NoteEdit {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub struct NoteService {
    repos: Arc<dyn RepositoryProvider>,
}

impl NoteService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Owner's notes, newest first.
    pub async fn list_mine(&self, owner_id: &str) -> DomainResult<Vec<Note>> {
        self.repos.notes().list_by_owner(owner_id).await
    }

    pub async fn create(&self, owner_id: &str, draft: NoteDraft) -> DomainResult<Note> {
        let title = draft.title.trim();
        let content = draft.content.trim();
        if title.is_empty() && content.is_empty() {
            return Err(DomainError::Validation(
                "Note must have a title or content".into(),
            ));
        }

        let note = self
            .repos
            .notes()
            .create(NewNote {
                owner_id: owner_id.to_string(),
                title: normalize_title(title),
                content: content.to_string(),
            })
            .await?;

        metrics::counter!("notes_created_total").increment(1);
        info!(note_id = note.id, owner_id, "Note created");
        Ok(note)
    }

    pub async fn get(&self, owner_id: &str, id: i32) -> DomainResult<Note> {
        self.owned(owner_id, id).await
    }

    pub async fn update(&self, owner_id: &str, id: i32, edit: NoteEdit) -> DomainResult<Note> {
        self.owned(owner_id, id).await?;

        let changes = NoteChanges {
            title: edit.title.as_deref().map(normalize_title),
            content: edit.content.map(|c| c.trim().to_string()),
        };

        let note = self
            .repos
            .notes()
            .update(id, changes)
            .await?
            .ok_or_else(|| DomainError::not_found("Note", "id", id))?;

        info!(note_id = id, owner_id, "Note updated");
        Ok(note)
    }

    pub async fn delete(&self, owner_id: &str, id: i32) -> DomainResult<()> {
        self.owned(owner_id, id).await?;

        if !self.repos.notes().delete(id).await? {
            return Err(DomainError::not_found("Note", "id", id));
        }

        info!(note_id = id, owner_id, "Note deleted");
        Ok(())
    }

    /// Case-insensitive search over title and content, newest first.
    pub async fn search(&self, owner_id: &str, query: &str) -> DomainResult<Vec<Note>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::Validation("Search query is required".into()));
        }
        self.repos.notes().search_by_owner(owner_id, query).await
    }

    pub async fn count(&self, owner_id: &str) -> DomainResult<u64> {
        self.repos.notes().count_by_owner(owner_id).await
    }

    async fn owned(&self, owner_id: &str, id: i32) -> DomainResult<Note> {
        let note = self
            .repos
            .notes()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Note", "id", id))?;

        if !note.is_owned_by(owner_id) {
            return Err(DomainError::Forbidden(
                "You can only modify your own notes".into(),
            ));
        }
        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryRepositoryProvider;

    fn service() -> NoteService {
        NoteService::new(Arc::new(InMemoryRepositoryProvider::new()))
    }

    fn draft(title: &str, content: &str) -> NoteDraft {
        NoteDraft {
            title: title.into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn empty_title_is_stored_as_untitled() {
        let svc = service();
        let note = svc.create("alice", draft("   ", "body")).await.unwrap();
        assert_eq!(note.title, "Untitled");
        assert_eq!(note.content, "body");
    }

    #[tokio::test]
    async fn fully_empty_note_is_rejected() {
        let svc = service();
        let err = svc.create("alice", draft("", "  ")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn cannot_delete_someone_elses_note() {
        let svc = service();
        let note = svc.create("alice", draft("Private", "")).await.unwrap();

        let err = svc.delete("bob", note.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(svc.get("alice", note.id).await.is_ok());
    }

    #[tokio::test]
    async fn cannot_edit_someone_elses_note() {
        let svc = service();
        let note = svc.create("alice", draft("Private", "")).await.unwrap();

        let err = svc
            .update(
                "bob",
                note.id,
                NoteEdit {
                    title: Some("Mine now".into()),
                    content: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_note_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.delete("alice", 999).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_keeps_absent_fields_and_defaults_blank_title() {
        let svc = service();
        let note = svc.create("alice", draft("Plan", "step 1")).await.unwrap();

        let edited = svc
            .update(
                "alice",
                note.id,
                NoteEdit {
                    title: None,
                    content: Some("step 2".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.title, "Plan");
        assert_eq!(edited.content, "step 2");

        let edited = svc
            .update(
                "alice",
                note.id,
                NoteEdit {
                    title: Some("".into()),
                    content: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.title, "Untitled");
    }

    #[tokio::test]
    async fn list_search_and_count_are_owner_scoped() {
        let svc = service();
        let first = svc.create("alice", draft("Groceries", "milk")).await.unwrap();
        let second = svc.create("alice", draft("Ideas", "")).await.unwrap();
        svc.create("bob", draft("Milk run", "")).await.unwrap();

        let mine = svc.list_mine("alice").await.unwrap();
        assert_eq!(
            mine.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let hits = svc.search("alice", "MILK").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, first.id);

        assert_eq!(svc.count("alice").await.unwrap(), 2);
        assert!(matches!(
            svc.search("alice", " ").await,
            Err(DomainError::Validation(_))
        ));
    }
}
