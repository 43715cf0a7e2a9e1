//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod note_repository;
pub mod repository_provider;
pub mod session_repository;
pub mod user_repository;

pub use repository_provider::SeaOrmRepositoryProvider;

use crate::shared::DomainError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(format!("Database error: {}", e))
}

/// Map unique-constraint violations to `Conflict`, everything else to `Storage`.
pub(crate) fn write_err(e: sea_orm::DbErr, conflict_msg: &str) -> DomainError {
    let text = e.to_string();
    if text.contains("UNIQUE") || text.contains("duplicate") {
        DomainError::Conflict(conflict_msg.to_string())
    } else {
        db_err(e)
    }
}
