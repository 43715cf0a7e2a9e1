//! Domain layer: entities, DTOs and repository interfaces

pub mod note;
pub mod repositories;
pub mod session;
pub mod user;

pub use note::{Note, NoteRepository};
pub use repositories::{DomainResult, RepositoryProvider};
pub use session::{Session, SessionRepository};
pub use user::{CreateUserDto, GetUserDto, UpdateUserDto, User, UserRepository, UserRole, UserSortField};

pub use crate::shared::DomainError;
