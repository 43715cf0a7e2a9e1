//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::application::AccountChanges;
use crate::domain::{User, UserRole};

/// User API representation. The password hash is never included.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    /// `USER` or `ADMIN`
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role.as_str().to_string(),
            created_at: u.created_at,
            updated_at: u.updated_at,
            last_login_at: u.last_login_at,
        }
    }
}

/// Surrounding whitespace is dropped before field validation runs.
pub(crate) fn trimmed<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(String::deserialize(d)?.trim().to_string())
}

pub(crate) fn trimmed_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.map(|s| s.trim().to_string()))
}

pub(crate) fn validate_role(role: &str) -> Result<(), ValidationError> {
    match UserRole::parse(role) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("role").with_message("role must be USER or ADMIN".into())),
    }
}

/// Blank means "keep the current password"
pub(crate) fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if password.is_empty() || (6..=128).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("length")
            .with_message("password must be 6-128 characters".into()))
    }
}

/// Create user request (admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "password must be 6-128 characters"))]
    pub password: String,
    #[serde(default = "default_role")]
    #[validate(custom(function = "validate_role"))]
    pub role: String,
}

fn default_role() -> String {
    UserRole::User.as_str().to_string()
}

/// Update user request (admin). Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    /// Empty or omitted keeps the current password
    #[validate(custom(function = "validate_new_password"))]
    pub password: Option<String>,
    #[validate(custom(function = "validate_role"))]
    pub role: Option<String>,
}

impl From<UpdateUserRequest> for AccountChanges {
    fn from(r: UpdateUserRequest) -> Self {
        Self {
            username: r.username,
            email: r.email,
            password: r.password,
            role: r.role.as_deref().and_then(UserRole::parse),
        }
    }
}

/// List users query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// Case-insensitive match on username or email
    pub search: Option<String>,
    /// Filter by role (USER, ADMIN)
    pub role: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Sort field (username, email, role, created_at)
    pub sort_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_checked_case_insensitively() {
        assert!(validate_role("admin").is_ok());
        assert!(validate_role("USER").is_ok());
        assert!(validate_role("root").is_err());
    }

    #[test]
    fn blank_password_passes_validation() {
        let req = UpdateUserRequest {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());

        let req = UpdateUserRequest {
            password: Some("abc".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn padded_email_is_trimmed_before_validation() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"username":" carol ","email":" Carol@Example.com ","password":"secret1"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.username, "carol");
        assert_eq!(req.email, "Carol@Example.com");

        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"email":"  dave@example.com\t"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.username.is_none());
    }

    #[test]
    fn user_dto_has_no_password_field() {
        let dto = UserDto::from(User {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$2b$04$secret".into(),
            role: UserRole::Admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        });
        let json = serde_json::to_string(&dto).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains(r#""role":"ADMIN""#));
    }
}
