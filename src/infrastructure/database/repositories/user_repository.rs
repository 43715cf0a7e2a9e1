use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{db_err, write_err};
use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, UpdateUserDto, User, UserRepository,
    UserRole, UserSortField,
};
use crate::infrastructure::database::entities::{note, session, user};
use crate::shared::{page_offset, validate_pagination, PaginatedResult};

const DUPLICATE_USER: &str = "Username or email already exists";

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::User => UserRole::User,
    }
}

fn domain_role_to_entity(role: UserRole) -> user::UserRole {
    match role {
        UserRole::Admin => user::UserRole::Admin,
        UserRole::User => user::UserRole::User,
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        role: entity_role_to_domain(model.role),
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    }
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let now = Utc::now();

        let new_user = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(dto.username),
            email: Set(dto.email),
            password_hash: Set(dto.password_hash),
            role: Set(domain_role_to_entity(dto.role)),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
        };

        let model = new_user
            .insert(&self.db)
            .await
            .map_err(|e| write_err(e, DUPLICATE_USER))?;

        Ok(user_model_to_domain(model))
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let (page, page_size) = validate_pagination(dto.page, dto.page_size);

        let mut query = user::Entity::find();

        if let Some(role) = dto.role {
            query = query.filter(user::Column::Role.eq(domain_role_to_entity(role)));
        }

        query = match dto.sort_by {
            UserSortField::Username => query.order_by_asc(user::Column::Username),
            UserSortField::Email => query.order_by_asc(user::Column::Email),
            UserSortField::Role => query
                .order_by_asc(user::Column::Role)
                .order_by_asc(user::Column::Username),
            UserSortField::CreatedAt => query.order_by_desc(user::Column::CreatedAt),
        };

        let offset = page_offset(page, page_size);

        // Search is matched in Rust: LIKE treats `%` and `_` as wildcards and folds ASCII only
        if let Some(search) = dto.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let matching: Vec<User> = query
                .all(&self.db)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(user_model_to_domain)
                .filter(|u| u.matches_search(search))
                .collect();

            let total = matching.len() as u64;
            let items = matching
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(page_size as usize)
                .collect();
            return Ok(PaginatedResult::new(items, total, page, page_size));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let models = query
            .offset(offset)
            .limit(u64::from(page_size))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let items = models.into_iter().map(user_model_to_domain).collect();

        Ok(PaginatedResult::new(items, total, page, page_size))
    }

    async fn count_users(&self) -> DomainResult<u64> {
        user::Entity::find().count(&self.db).await.map_err(db_err)
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = existing.into();

        if let Some(username) = dto.username {
            active.username = Set(username);
        }
        if let Some(email) = dto.email {
            active.email = Set(email);
        }
        if let Some(password_hash) = dto.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(role) = dto.role {
            active.role = Set(domain_role_to_entity(role));
        }

        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| write_err(e, DUPLICATE_USER))?;

        Ok(Some(user_model_to_domain(updated)))
    }

    async fn touch_last_login(&self, id: &str) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("User", "id", id))?;

        let mut active: user::ActiveModel = existing.into();
        active.last_login_at = Set(Some(Utc::now()));
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        note::Entity::delete_many()
            .filter(note::Column::OwnerId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        session::Entity::delete_many()
            .filter(session::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let result = user::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::not_found("User", "id", id));
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::test_support::migrated_db;

    fn new_user(username: &str, email: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$stub".to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (_dir, db) = migrated_db().await;
        let repo = SeaOrmUserRepository::new(db);

        repo.create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        let err = repo
            .create_user(new_user("alice2", "alice@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_without_password_keeps_hash() {
        let (_dir, db) = migrated_db().await;
        let repo = SeaOrmUserRepository::new(db);

        let created = repo
            .create_user(new_user("bob", "bob@example.com"))
            .await
            .unwrap();
        let updated = repo
            .update_user(
                &created.id,
                UpdateUserDto {
                    username: Some("bobby".into()),
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "bobby");
        assert_eq!(updated.role, UserRole::Admin);
        assert_eq!(updated.password_hash, created.password_hash);
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let (_dir, db) = migrated_db().await;
        let repo = SeaOrmUserRepository::new(db);

        for name in ["carol", "dave", "erin"] {
            repo.create_user(new_user(name, &format!("{}@example.com", name)))
                .await
                .unwrap();
        }

        let page = repo
            .list_users(GetUserDto {
                search: Some("DAVE".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].username, "dave");

        let page = repo
            .list_users(GetUserDto {
                page: Some(2),
                page_size: Some(2),
                sort_by: UserSortField::Username,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].username, "erin");
    }

    #[tokio::test]
    async fn search_is_literal_and_huge_pages_are_empty() {
        let (_dir, db) = migrated_db().await;
        let repo = SeaOrmUserRepository::new(db);

        repo.create_user(new_user("frank", "frank@example.com"))
            .await
            .unwrap();
        repo.create_user(new_user("Élodie", "elodie@example.com"))
            .await
            .unwrap();

        let search = |q: &str| GetUserDto {
            search: Some(q.into()),
            ..Default::default()
        };
        assert_eq!(repo.list_users(search("_")).await.unwrap().total, 0);
        assert_eq!(repo.list_users(search("%")).await.unwrap().total, 0);

        let accented = repo.list_users(search("élo")).await.unwrap();
        assert_eq!(accented.total, 1);
        assert_eq!(accented.items[0].username, "Élodie");

        let far = repo
            .list_users(GetUserDto {
                page: Some(50_000_000),
                page_size: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(far.total, 2);
        assert!(far.items.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let (_dir, db) = migrated_db().await;
        let repo = SeaOrmUserRepository::new(db);

        let err = repo.delete_user("nope").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
