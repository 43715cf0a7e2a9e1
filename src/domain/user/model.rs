//! User domain entity

use chrono::{DateTime, Utc};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    /// Case-insensitive parse of `USER` / `ADMIN`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered account
#[derive(Debug, Clone)]
pub struct User {
    /// UUID v4
    pub id: String,
    pub username: String,
    /// Stored lower-cased
    pub email: String,
    /// bcrypt hash, never leaves the server
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Case-insensitive substring match on username or email,
    /// as used by the admin user search.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.username.to_lowercase().contains(&needle) || self.email.contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "u-1".into(),
            username: "JeanDupont".into(),
            email: "jean@example.com".into(),
            password_hash: "$2b$04$hash".into(),
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(UserRole::parse("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse(" User "), Some(UserRole::User));
        assert_eq!(UserRole::parse("operator"), None);
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(UserRole::default(), UserRole::User);
        assert!(!sample_user().is_admin());
    }

    #[test]
    fn search_matches_username_or_email() {
        let user = sample_user();
        assert!(user.matches_search("dupont"));
        assert!(user.matches_search("EXAMPLE"));
        assert!(!user.matches_search("marie"));
    }
}
