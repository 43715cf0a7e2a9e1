use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::db_err;
use crate::domain::session::{Session, SessionRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::session;

pub struct SeaOrmSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn session_model_to_domain(model: session::Model) -> Session {
    Session {
        id: model.id,
        user_id: model.user_id,
        created_at: model.created_at,
        expires_at: model.expires_at,
    }
}

#[async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn create(&self, s: Session) -> DomainResult<()> {
        session::ActiveModel {
            id: Set(s.id),
            user_id: Set(s.user_id),
            created_at: Set(s.created_at),
            expires_at: Set(s.expires_at),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Session>> {
        let model = session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(session_model_to_domain))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        session::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> DomainResult<u64> {
        let result = session::Entity::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
