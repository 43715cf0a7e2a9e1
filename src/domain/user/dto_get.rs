use super::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    Username,
    Email,
    Role,
    /// Newest first
    #[default]
    CreatedAt,
}

impl UserSortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "username" => Some(Self::Username),
            "email" => Some(Self::Email),
            "role" => Some(Self::Role),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetUserDto {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: UserSortField,
}
