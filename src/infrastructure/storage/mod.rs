//! Storage backends that live outside the database

mod memory;

pub use memory::InMemoryRepositoryProvider;
