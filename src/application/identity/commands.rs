//! Identity command inputs, carrying plain-text passwords up to the service

use crate::domain::UserRole;

/// Account created by an administrator
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// Edit of an existing account.
///
/// `None` keeps the stored value. An empty `password` also keeps the
/// stored hash, since edit forms send the field blank when untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

impl AccountChanges {
    /// The new password, if one was actually supplied.
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}
