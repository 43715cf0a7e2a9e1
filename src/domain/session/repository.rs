use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Session;
use crate::domain::DomainResult;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: Session) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Session>>;
    async fn delete(&self, id: &str) -> DomainResult<()>;
    async fn delete_for_user(&self, user_id: &str) -> DomainResult<u64>;

    /// Returns the number of purged sessions.
    async fn delete_expired(&self, now: DateTime<Utc>) -> DomainResult<u64>;
}
