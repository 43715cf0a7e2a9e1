pub mod auth;
pub mod health;
pub mod metrics;
pub mod notes;
pub mod request_id;
pub mod users;
