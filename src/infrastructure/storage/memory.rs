//! In-memory repositories for development and testing
//!
//! Data lives in `DashMap`s and is lost on restart. One struct implements
//! every repository trait so that deleting a user can cascade to their
//! notes and sessions.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::note::{NewNote, Note, NoteChanges, NoteRepository};
use crate::domain::session::{Session, SessionRepository};
use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, RepositoryProvider, UpdateUserDto, User,
    UserRepository, UserSortField,
};
use crate::shared::{page_offset, validate_pagination, PaginatedResult};

const DUPLICATE_USER: &str = "Username or email already exists";

pub struct InMemoryRepositoryProvider {
    users: DashMap<String, User>,
    /// email -> user id
    emails: DashMap<String, String>,
    /// username -> user id
    usernames: DashMap<String, String>,
    notes: DashMap<i32, Note>,
    sessions: DashMap<String, Session>,
    note_counter: AtomicI32,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            usernames: DashMap::new(),
            notes: DashMap::new(),
            sessions: DashMap::new(),
            note_counter: AtomicI32::new(1),
        }
    }

    /// Point `key` at `user_id` unless another user already holds it.
    fn claim(index: &DashMap<String, String>, key: &str, user_id: &str) -> DomainResult<()> {
        match index.entry(key.to_string()) {
            Entry::Occupied(e) if e.get() != user_id => {
                Err(DomainError::Conflict(DUPLICATE_USER.to_string()))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(e) => {
                e.insert(user_id.to_string());
                Ok(())
            }
        }
    }

    fn release(index: &DashMap<String, String>, key: &str, user_id: &str) {
        index.remove_if(key, |_, owner| owner == user_id);
    }

    fn notes_of(&self, owner_id: &str, filter: impl Fn(&Note) -> bool) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .notes
            .iter()
            .filter(|e| e.owner_id == owner_id && filter(e.value()))
            .map(|e| e.value().clone())
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        notes
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        self
    }

    fn notes(&self) -> &dyn NoteRepository {
        self
    }

    fn sessions(&self) -> &dyn SessionRepository {
        self
    }
}

// ── Users ───────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for InMemoryRepositoryProvider {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: dto.username,
            email: dto.email,
            password_hash: dto.password_hash,
            role: dto.role,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        Self::claim(&self.emails, &user.email, &user.id)?;
        if let Err(e) = Self::claim(&self.usernames, &user.username, &user.id) {
            Self::release(&self.emails, &user.email, &user.id);
            return Err(e);
        }

        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let (page, page_size) = validate_pagination(dto.page, dto.page_size);
        let search = dto
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|e| search.map_or(true, |s| e.matches_search(s)))
            .filter(|e| dto.role.map_or(true, |r| e.role == r))
            .map(|e| e.value().clone())
            .collect();

        match dto.sort_by {
            UserSortField::Username => users.sort_by(|a, b| a.username.cmp(&b.username)),
            UserSortField::Email => users.sort_by(|a, b| a.email.cmp(&b.email)),
            UserSortField::Role => users.sort_by(|a, b| {
                a.role
                    .as_str()
                    .cmp(b.role.as_str())
                    .then_with(|| a.username.cmp(&b.username))
            }),
            UserSortField::CreatedAt => users.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        let total = users.len() as u64;
        let items = users
            .into_iter()
            .skip(usize::try_from(page_offset(page, page_size)).unwrap_or(usize::MAX))
            .take(page_size as usize)
            .collect();

        Ok(PaginatedResult::new(items, total, page, page_size))
    }

    async fn count_users(&self) -> DomainResult<u64> {
        Ok(self.users.len() as u64)
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .usernames
            .get(username)
            .and_then(|id| self.users.get(id.value()).map(|u| u.clone())))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self
            .emails
            .get(email)
            .and_then(|id| self.users.get(id.value()).map(|u| u.clone())))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        let Some(current) = self.users.get(id).map(|u| u.clone()) else {
            return Ok(None);
        };

        if let Some(email) = dto.email.as_deref().filter(|e| *e != current.email) {
            Self::claim(&self.emails, email, id)?;
        }
        if let Some(username) = dto.username.as_deref().filter(|u| *u != current.username) {
            if let Err(e) = Self::claim(&self.usernames, username, id) {
                if let Some(email) = dto.email.as_deref().filter(|e| *e != current.email) {
                    Self::release(&self.emails, email, id);
                }
                return Err(e);
            }
        }

        let mut updated = current.clone();
        if let Some(username) = dto.username {
            updated.username = username;
        }
        if let Some(email) = dto.email {
            updated.email = email;
        }
        if let Some(password_hash) = dto.password_hash {
            updated.password_hash = password_hash;
        }
        if let Some(role) = dto.role {
            updated.role = role;
        }
        updated.updated_at = Utc::now();

        if updated.email != current.email {
            Self::release(&self.emails, &current.email, id);
        }
        if updated.username != current.username {
            Self::release(&self.usernames, &current.username, id);
        }

        self.users.insert(id.to_string(), updated.clone());
        Ok(Some(updated))
    }

    async fn touch_last_login(&self, id: &str) -> DomainResult<()> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("User", "id", id))?;
        user.last_login_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        let (_, user) = self
            .users
            .remove(id)
            .ok_or_else(|| DomainError::not_found("User", "id", id))?;

        Self::release(&self.emails, &user.email, id);
        Self::release(&self.usernames, &user.username, id);
        self.notes.retain(|_, n| n.owner_id != id);
        self.sessions.retain(|_, s| s.user_id != id);
        Ok(())
    }
}

// ── Notes ───────────────────────────────────────────────────────

#[async_trait]
impl NoteRepository for InMemoryRepositoryProvider {
    async fn create(&self, new: NewNote) -> DomainResult<Note> {
        let now = Utc::now();
        let note = Note {
            id: self.note_counter.fetch_add(1, Ordering::SeqCst),
            owner_id: new.owner_id,
            title: new.title,
            content: new.content,
            created_at: now,
            updated_at: now,
        };
        self.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Note>> {
        Ok(self.notes.get(&id).map(|n| n.clone()))
    }

    async fn list_by_owner(&self, owner_id: &str) -> DomainResult<Vec<Note>> {
        Ok(self.notes_of(owner_id, |_| true))
    }

    async fn search_by_owner(&self, owner_id: &str, query: &str) -> DomainResult<Vec<Note>> {
        let needle = query.to_lowercase();
        Ok(self.notes_of(owner_id, |n| n.matches(&needle)))
    }

    async fn count_by_owner(&self, owner_id: &str) -> DomainResult<u64> {
        Ok(self.notes.iter().filter(|e| e.owner_id == owner_id).count() as u64)
    }

    async fn update(&self, id: i32, changes: NoteChanges) -> DomainResult<Option<Note>> {
        Ok(self.notes.get_mut(&id).map(|mut note| {
            note.apply(&changes, Utc::now());
            note.clone()
        }))
    }

    async fn delete(&self, id: i32) -> DomainResult<bool> {
        Ok(self.notes.remove(&id).is_some())
    }
}

// ── Sessions ────────────────────────────────────────────────────

#[async_trait]
impl SessionRepository for InMemoryRepositoryProvider {
    async fn create(&self, session: Session) -> DomainResult<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Session>> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> DomainResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - self.sessions.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - self.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use chrono::Duration;

    fn new_user(username: &str, email: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: UserRole::User,
        }
    }

    fn new_note(owner: &str, title: &str) -> NewNote {
        NewNote {
            owner_id: owner.into(),
            title: title.into(),
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_or_username_is_rejected() {
        let repos = InMemoryRepositoryProvider::new();
        repos
            .users()
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let dup_email = repos
            .users()
            .create_user(new_user("alice2", "alice@example.com"))
            .await;
        assert!(matches!(dup_email, Err(DomainError::Conflict(_))));

        let dup_name = repos
            .users()
            .create_user(new_user("alice", "other@example.com"))
            .await;
        assert!(matches!(dup_name, Err(DomainError::Conflict(_))));

        // The failed attempt must not leave its email reserved
        repos
            .users()
            .create_user(new_user("carol", "other@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn huge_page_number_returns_an_empty_page() {
        let repos = InMemoryRepositoryProvider::new();
        repos
            .users()
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let page = repos
            .users()
            .list_users(GetUserDto {
                page: Some(50_000_000),
                page_size: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn email_change_frees_the_old_address() {
        let repos = InMemoryRepositoryProvider::new();
        let alice = repos
            .users()
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        repos
            .users()
            .update_user(
                &alice.id,
                UpdateUserDto {
                    email: Some("alice@new.example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert!(repos
            .users()
            .get_user_by_email("alice@example.com")
            .await
            .unwrap()
            .is_none());
        repos
            .users()
            .create_user(new_user("bob", "alice@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn notes_are_listed_newest_first() {
        let repos = InMemoryRepositoryProvider::new();
        let first = repos.notes().create(new_note("u1", "one")).await.unwrap();
        let second = repos.notes().create(new_note("u1", "two")).await.unwrap();
        repos.notes().create(new_note("u2", "other")).await.unwrap();

        let listed = repos.notes().list_by_owner("u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn deleting_user_cascades() {
        let repos = InMemoryRepositoryProvider::new();
        let alice = repos
            .users()
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        repos
            .notes()
            .create(new_note(&alice.id, "mine"))
            .await
            .unwrap();
        let session = Session::new(&alice.id, Duration::hours(1));
        repos.sessions().create(session.clone()).await.unwrap();

        repos.users().delete_user(&alice.id).await.unwrap();

        assert_eq!(repos.notes().count_by_owner(&alice.id).await.unwrap(), 0);
        assert!(repos
            .sessions()
            .find_by_id(&session.id)
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            repos.users().delete_user(&alice.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn purge_removes_only_expired_sessions() {
        let repos = InMemoryRepositoryProvider::new();
        let live = Session::new("u1", Duration::hours(1));
        let mut stale = Session::new("u1", Duration::hours(1));
        stale.expires_at = stale.created_at - Duration::seconds(1);
        repos.sessions().create(live.clone()).await.unwrap();
        repos.sessions().create(stale).await.unwrap();

        assert_eq!(repos.sessions().delete_expired(Utc::now()).await.unwrap(), 1);
        assert!(repos.sessions().find_by_id(&live.id).await.unwrap().is_some());
    }
}
