use chrono::{DateTime, Duration, Utc};

/// Login session. The JWT carries its id, so deleting the row
/// invalidates the token before it expires.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_live() {
        let session = Session::new("u-1", Duration::hours(1));
        assert!(!session.is_expired());
        assert_eq!(session.user_id, "u-1");
    }

    #[test]
    fn session_expires_after_ttl() {
        let session = Session::new("u-1", Duration::minutes(5));
        assert!(session.is_expired_at(session.created_at + Duration::minutes(5)));
        assert!(!session.is_expired_at(session.created_at + Duration::minutes(4)));
    }
}
