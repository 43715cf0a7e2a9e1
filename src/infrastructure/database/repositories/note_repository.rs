use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};

use super::db_err;
use crate::domain::note::{NewNote, Note, NoteChanges, NoteRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::note;

pub struct SeaOrmNoteRepository {
    db: DatabaseConnection,
}

impl SeaOrmNoteRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn owned_by(owner_id: &str) -> Select<note::Entity> {
        note::Entity::find()
            .filter(note::Column::OwnerId.eq(owner_id))
            .order_by_desc(note::Column::CreatedAt)
            .order_by_desc(note::Column::Id)
    }
}

fn note_model_to_domain(model: note::Model) -> Note {
    Note {
        id: model.id,
        owner_id: model.owner_id,
        title: model.title,
        content: model.content,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl NoteRepository for SeaOrmNoteRepository {
    async fn create(&self, new: NewNote) -> DomainResult<Note> {
        let now = Utc::now();
        let model = note::ActiveModel {
            owner_id: Set(new.owner_id),
            title: Set(new.title),
            content: Set(new.content),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(note_model_to_domain(model))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Note>> {
        let model = note::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(note_model_to_domain))
    }

    async fn list_by_owner(&self, owner_id: &str) -> DomainResult<Vec<Note>> {
        let models = Self::owned_by(owner_id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models.into_iter().map(note_model_to_domain).collect())
    }

    async fn search_by_owner(&self, owner_id: &str, query: &str) -> DomainResult<Vec<Note>> {
        // LIKE treats `%` and `_` as wildcards and folds ASCII only
        let needle = query.to_lowercase();
        let models = Self::owned_by(owner_id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models
            .into_iter()
            .map(note_model_to_domain)
            .filter(|n| n.matches(&needle))
            .collect())
    }

    async fn count_by_owner(&self, owner_id: &str) -> DomainResult<u64> {
        note::Entity::find()
            .filter(note::Column::OwnerId.eq(owner_id))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn update(&self, id: i32, changes: NoteChanges) -> DomainResult<Option<Note>> {
        let existing = note::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: note::ActiveModel = existing.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(content) = changes.content {
            active.content = Set(content);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(db_err)?;
        Ok(Some(note_model_to_domain(updated)))
    }

    async fn delete(&self, id: i32) -> DomainResult<bool> {
        let result = note::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }
}
