//! User management service: application-layer orchestration
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use validator::ValidateEmail;

use super::commands::{AccountChanges, NewAccount};
use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, RepositoryProvider, Session,
    UpdateUserDto, User, UserRole,
};
use crate::infrastructure::crypto::{
    create_token, hash_password_with_cost, verify_password, JwtConfig, TokenClaims,
};
use crate::shared::{normalize_email, InfraError, PaginatedResult};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 128;

/// Authentication result returned after a successful login or registration
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub session_id: String,
    pub user: User,
}

/// User service: orchestrates all identity / user-management use-cases.
pub struct UserService {
    repos: Arc<dyn RepositoryProvider>,
    jwt_config: JwtConfig,
    hash_cost: u32,
}

impl UserService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, jwt_config: JwtConfig) -> Self {
        Self {
            repos,
            jwt_config,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Override the bcrypt work factor
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    // ── Authentication ──────────────────────────────────────────

    /// Create a user account with role `USER` and sign it in.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> DomainResult<AuthResult> {
        let username = check_username(username)?;
        let email = check_email(email)?;
        check_password(password)?;

        self.ensure_available(&username, &email, None).await?;

        let user = self
            .repos
            .users()
            .create_user(CreateUserDto {
                username,
                email,
                password_hash: self.hash(password)?,
                role: UserRole::User,
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "New user registered");
        self.open_session(user).await
    }

    /// Authenticate by username or email + password.
    pub async fn login(&self, username_or_email: &str, password: &str) -> DomainResult<AuthResult> {
        let identifier = username_or_email.trim();

        let users = self.repos.users();
        let user = if identifier.contains('@') {
            match users.get_user_by_email(&normalize_email(identifier)).await? {
                Some(user) => Some(user),
                None => users.get_user_by_username(identifier).await?,
            }
        } else {
            users.get_user_by_username(identifier).await?
        };

        let Some(user) = user else {
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        self.repos.users().touch_last_login(&user.id).await?;
        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, username = %user.username, "User logged in");

        self.open_session(user).await
    }

    /// End the session behind a token or cookie.
    pub async fn logout(&self, session_id: &str) -> DomainResult<()> {
        self.repos.sessions().delete(session_id).await?;
        info!(session_id, "Session closed");
        Ok(())
    }

    /// Resolve verified token claims to the current user.
    ///
    /// The session must still exist and be unexpired; the role is read
    /// from storage so that role changes apply to live tokens.
    pub async fn authenticate(&self, claims: &TokenClaims) -> DomainResult<User> {
        let session = self
            .repos
            .sessions()
            .find_by_id(&claims.sid)
            .await?
            .filter(|s| s.user_id == claims.sub)
            .ok_or_else(|| DomainError::Unauthorized("Session has ended".into()))?;

        if session.is_expired() {
            self.repos.sessions().delete(&session.id).await?;
            return Err(DomainError::Unauthorized("Session has expired".into()));
        }

        self.repos
            .users()
            .get_user_by_id(&claims.sub)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("Account no longer exists".into()))
    }

    pub async fn current_user(&self, user_id: &str) -> DomainResult<User> {
        self.get_user(user_id).await
    }

    // ── Profile ─────────────────────────────────────────────────

    /// Update the caller's own account. The role cannot be changed here.
    pub async fn update_profile(&self, user_id: &str, changes: AccountChanges) -> DomainResult<User> {
        let changes = AccountChanges {
            role: None,
            ..changes
        };
        let user = self.apply_changes(user_id, changes).await?;
        info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    pub async fn delete_account(&self, user_id: &str) -> DomainResult<()> {
        self.repos.users().delete_user(user_id).await?;
        info!(user_id, "Account deleted by owner");
        Ok(())
    }

    // ── Admin user management ───────────────────────────────────

    /// List users with search, filtering, sorting and pagination.
    pub async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        self.repos.users().list_users(dto).await
    }

    pub async fn get_user(&self, id: &str) -> DomainResult<User> {
        self.repos
            .users()
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", id))
    }

    pub async fn create_user(&self, account: NewAccount) -> DomainResult<User> {
        let username = check_username(&account.username)?;
        let email = check_email(&account.email)?;
        check_password(&account.password)?;

        self.ensure_available(&username, &email, None).await?;

        let user = self
            .repos
            .users()
            .create_user(CreateUserDto {
                username,
                email,
                password_hash: self.hash(&account.password)?,
                role: account.role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User created by admin");
        Ok(user)
    }

    pub async fn update_user(&self, id: &str, changes: AccountChanges) -> DomainResult<User> {
        let user = self.apply_changes(id, changes).await?;
        info!(user_id = %user.id, role = %user.role, "User updated by admin");
        Ok(user)
    }

    /// Delete another user's account. Administrators cannot remove themselves here.
    pub async fn delete_user(&self, actor_id: &str, id: &str) -> DomainResult<()> {
        if actor_id == id {
            return Err(DomainError::Forbidden(
                "You cannot delete your own account".into(),
            ));
        }

        self.repos.users().delete_user(id).await?;
        info!(user_id = id, actor_id, "User deleted by admin");
        Ok(())
    }

    // ── Maintenance ─────────────────────────────────────────────

    /// Create the bootstrap administrator when no account exists yet.
    pub async fn ensure_default_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> DomainResult<Option<User>> {
        if self.repos.users().count_users().await? > 0 {
            return Ok(None);
        }

        let admin = self
            .create_user(NewAccount {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: UserRole::Admin,
            })
            .await?;

        warn!(
            username = %admin.username,
            "Default admin account created, change its password"
        );
        Ok(Some(admin))
    }

    pub async fn purge_expired_sessions(&self) -> DomainResult<u64> {
        self.repos.sessions().delete_expired(Utc::now()).await
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn hash(&self, password: &str) -> DomainResult<String> {
        hash_password_with_cost(password, self.hash_cost)
            .map_err(|e| InfraError::Crypto(format!("Failed to hash password: {}", e)).into())
    }

    async fn open_session(&self, user: User) -> DomainResult<AuthResult> {
        let session = Session::new(&user.id, self.jwt_config.session_ttl());
        self.repos.sessions().create(session.clone()).await?;

        let token = create_token(&user, &session, &self.jwt_config)
            .map_err(|e| InfraError::Crypto(format!("Failed to create token: {}", e)))?;

        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expires_in_secs(),
            session_id: session.id,
            user,
        })
    }

    /// Fail with `Conflict` when the username or email belongs to someone
    /// other than `except_id`.
    async fn ensure_available(
        &self,
        username: &str,
        email: &str,
        except_id: Option<&str>,
    ) -> DomainResult<()> {
        let taken_by_other = |user: &Option<User>| {
            user.as_ref()
                .is_some_and(|u| Some(u.id.as_str()) != except_id)
        };

        if taken_by_other(&self.repos.users().get_user_by_email(email).await?) {
            return Err(DomainError::Conflict("Email already exists".into()));
        }
        if taken_by_other(&self.repos.users().get_user_by_username(username).await?) {
            return Err(DomainError::Conflict("Username already exists".into()));
        }
        Ok(())
    }

    async fn apply_changes(&self, id: &str, changes: AccountChanges) -> DomainResult<User> {
        let current = self.get_user(id).await?;

        let username = changes.username.as_deref().map(check_username).transpose()?;
        let email = changes.email.as_deref().map(check_email).transpose()?;
        let password_hash = match changes.new_password() {
            Some(password) => {
                check_password(password)?;
                Some(self.hash(password)?)
            }
            None => None,
        };

        self.ensure_available(
            username.as_deref().unwrap_or(&current.username),
            email.as_deref().unwrap_or(&current.email),
            Some(id),
        )
        .await?;

        let dto = UpdateUserDto {
            username,
            email,
            password_hash,
            role: changes.role,
        };
        if dto.is_empty() {
            return Ok(current);
        }

        self.repos
            .users()
            .update_user(id, dto)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", id))
    }
}

// ── Validation ──────────────────────────────────────────────────

fn check_username(raw: &str) -> DomainResult<String> {
    let username = raw.trim();
    let len = username.chars().count();
    if username.is_empty() {
        return Err(DomainError::Validation("Username is required".into()));
    }
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(DomainError::Validation(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    // `@` marks an email at login
    if username.contains('@') {
        return Err(DomainError::Validation("Username must not contain '@'".into()));
    }
    Ok(username.to_string())
}

fn check_email(raw: &str) -> DomainResult<String> {
    let email = normalize_email(raw);
    if email.is_empty() {
        return Err(DomainError::Validation("Email is required".into()));
    }
    if !email.validate_email() {
        return Err(DomainError::Validation("Invalid email address".into()));
    }
    Ok(email)
}

fn check_password(password: &str) -> DomainResult<()> {
    if password.is_empty() {
        return Err(DomainError::Validation("Password is required".into()));
    }
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(DomainError::Validation(format!(
            "Password must be {}-{} characters",
            PASSWORD_MIN, PASSWORD_MAX
        )));
    }
    Ok(())
}
