use super::UserRole;

/// New account, password already hashed by the identity service
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}
