//! Identity module: user management & authentication
//!
//! Contains the `UserService` which orchestrates all user-related
//! use-cases: registration, login and sessions, profile updates and
//! admin user management.

pub mod commands;
pub mod service;
pub mod session_cleanup;

pub use commands::{AccountChanges, NewAccount};
pub use service::{AuthResult, UserService};
pub use session_cleanup::start_session_cleanup_task;
