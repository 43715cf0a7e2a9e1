//! Notes module: the caller's own notes

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
