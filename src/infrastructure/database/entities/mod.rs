//! Database entities module

pub mod note;
pub mod session;
pub mod user;

pub use note::Entity as Note;
pub use session::Entity as Session;
pub use user::Entity as User;
