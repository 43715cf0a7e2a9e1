//! # Notes service
//!
//! User accounts, personal notes and admin user management over a REST API.
//!
//! ## Architecture
//!
//! - **domain**: entities and repository traits
//! - **application**: account and notes use cases
//! - **infrastructure**: SQLite (SeaORM) and in-memory storage, tokens, hashing
//! - **interfaces**: HTTP API with Swagger documentation
//! - **server**: runtime wiring and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig};

pub use interfaces::http::create_api_router;
