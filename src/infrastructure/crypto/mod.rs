//! Token signing, password hashing and secret generation

pub mod jwt;
pub mod password;
pub mod secret;

pub use jwt::{create_token, verify_token, JwtConfig, TokenClaims};
pub use password::{hash_password, hash_password_with_cost, verify_password};
pub use secret::generate_secret;
