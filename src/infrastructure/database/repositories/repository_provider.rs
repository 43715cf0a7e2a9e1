//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::note::NoteRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::session::SessionRepository;
use crate::domain::user::UserRepository;

use super::note_repository::SeaOrmNoteRepository;
use super::session_repository::SeaOrmSessionRepository;
use super::user_repository::SeaOrmUserRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let user = repos.users().get_user_by_email("jean@example.com").await?;
/// let notes = repos.notes().list_by_owner(&user.id).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    users: SeaOrmUserRepository,
    notes: SeaOrmNoteRepository,
    sessions: SeaOrmSessionRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: SeaOrmUserRepository::new(db.clone()),
            notes: SeaOrmNoteRepository::new(db.clone()),
            sessions: SeaOrmSessionRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn notes(&self) -> &dyn NoteRepository {
        &self.notes
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }
}
